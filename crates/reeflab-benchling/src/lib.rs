//! External lab system client for the reeflab portal.
//!
//! This module handles communication with Benchling, the third-party
//! system of record for lab entities and provisioning tasks. It
//! provides an abstraction over the Benchling API with an HTTP
//! implementation and an in-memory mock for development and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Errors that can occur during lab system operations.
///
/// Failures are classified from the transport error or HTTP status so
/// callers can surface a tailored message per failure kind.
#[derive(Debug, Error)]
pub enum BenchlingError {
	/// Host could not be resolved or reached.
	#[error("Could not reach Benchling host: {0}")]
	Dns(String),
	/// Credentials were rejected.
	#[error("Benchling authentication failed: {0}")]
	Auth(String),
	/// Credentials lack permission for the operation.
	#[error("Benchling permission denied: {0}")]
	Permission(String),
	/// The referenced entity or task does not exist.
	#[error("Benchling entity not found: {0}")]
	NotFound(String),
	/// Any other API failure.
	#[error("Benchling API error: {0}")]
	Api(String),
}

impl BenchlingError {
	/// Classifies an HTTP response status into an error variant.
	pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
		let detail = detail.into();
		match status {
			401 => BenchlingError::Auth(detail),
			403 => BenchlingError::Permission(detail),
			404 => BenchlingError::NotFound(detail),
			_ => BenchlingError::Api(format!("status {}: {}", status, detail)),
		}
	}
}

/// Terminal and non-terminal states of a provisioning task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
	/// Task is still executing; poll again later.
	Running,
	/// Task finished and its entities are registered.
	Succeeded,
	/// Task finished without registering its entities.
	Failed,
}

/// Status snapshot of a provisioning task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
	pub state: TaskState,
	/// Failure detail when the task did not succeed.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Entities registered by a succeeded task.
	#[serde(default)]
	pub entities: Vec<BenchlingEntity>,
}

/// A registered entity in the external lab system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchlingEntity {
	/// Internal API identifier.
	pub id: String,
	/// Registry identifier (prefix-qualified).
	pub registry_id: String,
	pub name: String,
	pub schema_id: String,
	pub entity_type: String,
	/// RFC 3339 modification time.
	pub modified_at: String,
	#[serde(default)]
	pub fields: HashMap<String, String>,
}

/// Specification of a single entity to provision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
	pub name: String,
	#[serde(default)]
	pub fields: HashMap<String, String>,
}

/// Bulk entity provisioning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCreationSpec {
	pub schema_id: String,
	pub entities: Vec<EntitySpec>,
}

/// Trait defining the interface for lab system clients.
///
/// This trait must be implemented by any client that wants to integrate
/// with the portal. Provisioning is asynchronous on the Benchling side:
/// creation returns task ids that are polled until a terminal state.
#[async_trait]
pub trait BenchlingInterface: Send + Sync {
	/// Issues an asynchronous bulk entity creation request.
	///
	/// Returns the task ids tracking the provisioning work. The caller
	/// must persist these before polling so a retry can resume.
	async fn create_entities_async(
		&self,
		spec: EntityCreationSpec,
	) -> Result<Vec<String>, BenchlingError>;

	/// Retrieves the current status of a provisioning task.
	async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus, BenchlingError>;

	/// Lists every registered entity under the given schema.
	async fn list_entities(&self, schema_id: &str) -> Result<Vec<BenchlingEntity>, BenchlingError>;

	/// Updates fields of a registered entity.
	async fn update_entity(
		&self,
		id: &str,
		fields: HashMap<String, String>,
	) -> Result<(), BenchlingError>;

	/// Deletes a registered entity.
	async fn delete_entity(&self, id: &str) -> Result<(), BenchlingError>;
}

/// Type alias for client factory functions.
pub type BenchlingFactory =
	fn(&toml::Value) -> Result<Box<dyn BenchlingInterface>, BenchlingError>;

/// Get all registered client implementations.
///
/// Returns a vector of (name, factory) tuples for all available client
/// implementations, used when wiring the service from configuration.
pub fn get_all_implementations() -> Vec<(&'static str, BenchlingFactory)> {
	use implementations::{http, mock};

	vec![
		("http", http::create_client as BenchlingFactory),
		("mock", mock::create_client as BenchlingFactory),
	]
}

/// Service that manages lab system operations.
///
/// This struct provides a high-level interface over an underlying
/// client implementation selected by configuration.
pub struct BenchlingService {
	/// The underlying client implementation.
	implementation: Box<dyn BenchlingInterface>,
}

impl BenchlingService {
	/// Creates a new BenchlingService with the specified implementation.
	pub fn new(implementation: Box<dyn BenchlingInterface>) -> Self {
		Self { implementation }
	}

	/// Issues an asynchronous bulk entity creation request.
	pub async fn create_entities_async(
		&self,
		spec: EntityCreationSpec,
	) -> Result<Vec<String>, BenchlingError> {
		self.implementation.create_entities_async(spec).await
	}

	/// Retrieves the current status of a provisioning task.
	pub async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus, BenchlingError> {
		self.implementation.get_task_status(task_id).await
	}

	/// Lists every registered entity under the given schema.
	pub async fn list_entities(
		&self,
		schema_id: &str,
	) -> Result<Vec<BenchlingEntity>, BenchlingError> {
		self.implementation.list_entities(schema_id).await
	}

	/// Updates fields of a registered entity.
	pub async fn update_entity(
		&self,
		id: &str,
		fields: HashMap<String, String>,
	) -> Result<(), BenchlingError> {
		self.implementation.update_entity(id, fields).await
	}

	/// Deletes a registered entity.
	pub async fn delete_entity(&self, id: &str) -> Result<(), BenchlingError> {
		self.implementation.delete_entity(id).await
	}
}
