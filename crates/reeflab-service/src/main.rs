//! Main entry point for the reeflab portal service.
//!
//! This binary wires the configured storage backend and lab system
//! client into the core workflow services and serves the portal HTTP
//! API until interrupted.

use clap::Parser;
use reeflab_config::Config;
use reeflab_core::{ApprovalOrchestrator, OrderStateMachine, SampleSubmission, SyncEngine};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod apis;
mod auth;
mod server;

use auth::StaticTokenVerifier;
use server::AppState;

/// Command-line arguments for the portal service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started portal service");

	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path)?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let state = build_state(&config)?;
	let api_config = config.api.clone();

	server::start_server(api_config, state).await?;

	tracing::info!("Stopped portal service");
	Ok(())
}

/// Wires the configured implementations into the application state.
fn build_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
	// Storage backend selected by [storage].primary
	let storage_config = config
		.storage
		.implementations
		.get(&config.storage.primary)
		.ok_or("storage.primary has no matching implementation section")?;
	let storage_factory = reeflab_storage::get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == config.storage.primary)
		.map(|(_, factory)| factory)
		.ok_or_else(|| format!("unknown storage implementation: {}", config.storage.primary))?;
	let storage = Arc::new(reeflab_storage::StorageService::new(storage_factory(
		storage_config,
	)?));

	// Lab system client selected by [benchling].provider
	let benchling_config = benchling_provider_config(config);
	let benchling_factory = reeflab_benchling::get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == config.benchling.provider)
		.map(|(_, factory)| factory)
		.ok_or_else(|| format!("unknown benchling provider: {}", config.benchling.provider))?;
	let benchling = Arc::new(reeflab_benchling::BenchlingService::new(benchling_factory(
		&benchling_config,
	)?));

	let state_machine = Arc::new(OrderStateMachine::new(storage.clone()));
	let orchestrator = Arc::new(ApprovalOrchestrator::new(
		state_machine.clone(),
		benchling.clone(),
		config.benchling.schema_id.clone(),
		Duration::from_secs(config.approval.poll_interval_secs),
		Duration::from_secs(config.approval.max_wait_secs),
	));
	let sync = Arc::new(SyncEngine::new(
		storage,
		benchling,
		config.benchling.schema_id.clone(),
		config.benchling.registry_prefix.clone(),
	));
	let submission = Arc::new(SampleSubmission::new(state_machine.clone(), sync.clone()));
	let verifier = Arc::new(StaticTokenVerifier::from_config(&config.auth));

	Ok(AppState {
		state_machine,
		orchestrator,
		submission,
		sync,
		verifier,
		webhook_secret: config.benchling.webhook_secret.clone(),
	})
}

/// Builds the provider-specific config table for the client factory.
fn benchling_provider_config(config: &Config) -> toml::Value {
	let mut table = toml::map::Map::new();
	if let Some(api_url) = &config.benchling.api_url {
		table.insert("api_url".to_string(), toml::Value::String(api_url.clone()));
	}
	if let Some(api_key) = &config.benchling.api_key {
		table.insert("api_key".to_string(), toml::Value::String(api_key.clone()));
	}
	toml::Value::Table(table)
}

/// Current Unix time in seconds.
pub(crate) fn epoch_secs() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const TEST_CONFIG: &str = r#"
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
"#;

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_build_state_from_config() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(TEST_CONFIG.as_bytes()).unwrap();
		let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

		let state = build_state(&config).unwrap();
		assert!(state.webhook_secret.is_none());
	}

	#[test]
	fn test_build_state_rejects_unknown_provider() {
		let content = TEST_CONFIG.replace("provider = \"mock\"", "provider = \"carrier-pigeon\"");
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

		assert!(build_state(&config).is_err());
	}
}
