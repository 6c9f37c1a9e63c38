//! Configuration module for the reeflab portal backend.
//!
//! This module provides structures and utilities for managing service
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required values are properly set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the portal service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this service instance.
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the external lab system client.
	pub benchling: BenchlingConfig,
	/// Configuration for the approval orchestrator's polling.
	#[serde(default)]
	pub approval: ApprovalConfig,
	/// Configuration for the HTTP API server.
	pub api: ApiConfig,
	/// Configuration for token authentication.
	pub auth: AuthConfig,
}

/// Configuration specific to this service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this service instance.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the external lab system client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BenchlingConfig {
	/// Which client implementation to use ("http" or "mock").
	pub provider: String,
	/// Base URL of the Benchling API.
	#[serde(default)]
	pub api_url: Option<String>,
	/// API key for bearer authentication.
	#[serde(default)]
	pub api_key: Option<String>,
	/// Schema identifier for portal sample entities.
	pub schema_id: String,
	/// Registry id prefix that qualifies entities for this portal.
	pub registry_prefix: String,
	/// Shared secret for webhook signature verification. Verification
	/// is skipped when absent.
	#[serde(default)]
	pub webhook_secret: Option<String>,
}

/// Configuration for the approval orchestrator's polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApprovalConfig {
	/// Seconds between provisioning task status polls.
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// Bound on the total wait for provisioning tasks within one
	/// approve request; exceeding it surfaces the not-ready failure.
	#[serde(default = "default_max_wait_secs")]
	pub max_wait_secs: u64,
}

impl Default for ApprovalConfig {
	fn default() -> Self {
		Self {
			poll_interval_secs: default_poll_interval_secs(),
			max_wait_secs: default_max_wait_secs(),
		}
	}
}

/// Returns the default poll interval in seconds.
fn default_poll_interval_secs() -> u64 {
	3
}

/// Returns the default bound on the total provisioning wait.
fn default_max_wait_secs() -> u64 {
	60
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	pub host: String,
	pub port: u16,
}

/// A configured bearer token mapped to a caller identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	/// User id the token resolves to.
	pub uid: String,
	/// Whether the token carries the administrator role.
	#[serde(default)]
	pub admin: bool,
}

/// Configuration for token authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
	/// Map of bearer token values to caller identities.
	pub tokens: HashMap<String, TokenConfig>,
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		let config: Config = toml::from_str(&content)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration values.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation(
				"service.id must not be empty".to_string(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"storage.primary must not be empty".to_string(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"storage.primary '{}' has no matching implementation section",
				self.storage.primary
			)));
		}
		if self.benchling.schema_id.is_empty() {
			return Err(ConfigError::Validation(
				"benchling.schema_id must not be empty".to_string(),
			));
		}
		if self.benchling.registry_prefix.is_empty() {
			return Err(ConfigError::Validation(
				"benchling.registry_prefix must not be empty".to_string(),
			));
		}
		if self.benchling.provider == "http" && self.benchling.api_url.is_none() {
			return Err(ConfigError::Validation(
				"benchling.api_url is required for the http provider".to_string(),
			));
		}
		if self.approval.poll_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"approval.poll_interval_secs must be greater than zero".to_string(),
			));
		}
		if self.approval.max_wait_secs < self.approval.poll_interval_secs {
			return Err(ConfigError::Validation(
				"approval.max_wait_secs must be at least the poll interval".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const VALID_CONFIG: &str = r#"
[service]
id = "reeflab-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[benchling]
provider = "mock"
schema_id = "ts_aqsample"
registry_prefix = "AQS"

[api]
host = "127.0.0.1"
port = 3100

[auth.tokens.test-admin-token]
uid = "admin-1"
admin = true

[auth.tokens.test-user-token]
uid = "user-1"
"#;

	#[test]
	fn test_load_valid_config() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(VALID_CONFIG.as_bytes()).unwrap();

		let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
		assert_eq!(config.service.id, "reeflab-test");
		assert_eq!(config.benchling.registry_prefix, "AQS");
		// Defaults apply when the approval section is absent
		assert_eq!(config.approval.poll_interval_secs, 3);
		assert_eq!(config.approval.max_wait_secs, 60);
		assert!(config.auth.tokens["test-admin-token"].admin);
		assert!(!config.auth.tokens["test-user-token"].admin);
	}

	#[test]
	fn test_http_provider_requires_api_url() {
		let content = VALID_CONFIG.replace("provider = \"mock\"", "provider = \"http\"");
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();

		let result = Config::from_file(file.path().to_str().unwrap());
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_primary_must_match_an_implementation() {
		let content = VALID_CONFIG.replace("primary = \"memory\"", "primary = \"file\"");
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();

		let result = Config::from_file(file.path().to_str().unwrap());
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}
}
