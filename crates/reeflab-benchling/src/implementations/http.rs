//! HTTP client implementation for the Benchling API.
//!
//! Talks to the Benchling v2 REST API with bearer authentication.
//! Transport failures and HTTP statuses are classified into the
//! BenchlingError taxonomy so callers can tailor their messages.

use crate::{
	BenchlingEntity, BenchlingError, BenchlingInterface, EntityCreationSpec, TaskState, TaskStatus,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the HTTP client.
#[derive(Debug, Deserialize)]
struct HttpClientConfig {
	/// Base URL of the Benchling API, without a trailing slash.
	api_url: String,
	/// API key sent as a bearer token.
	api_key: String,
	/// Request timeout in seconds.
	#[serde(default = "default_timeout_secs")]
	timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
	30
}

/// HTTP implementation of the lab system client.
pub struct HttpBenchling {
	client: reqwest::Client,
	api_url: String,
	api_key: String,
}

impl HttpBenchling {
	/// Creates a new client against the given API base URL.
	pub fn new(api_url: String, api_key: String, timeout: Duration) -> Result<Self, BenchlingError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| BenchlingError::Api(e.to_string()))?;
		Ok(Self {
			client,
			api_url: api_url.trim_end_matches('/').to_string(),
			api_key,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.api_url, path)
	}

	/// Maps a transport-level failure onto the error taxonomy.
	fn classify_transport(e: reqwest::Error) -> BenchlingError {
		if e.is_connect() || e.is_timeout() {
			BenchlingError::Dns(e.to_string())
		} else {
			BenchlingError::Api(e.to_string())
		}
	}

	/// Checks the response status, returning the body on success.
	async fn check(response: reqwest::Response) -> Result<reqwest::Response, BenchlingError> {
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}
		let detail = response.text().await.unwrap_or_default();
		Err(BenchlingError::from_status(status.as_u16(), detail))
	}
}

/// Response of a bulk creation request.
#[derive(Debug, Deserialize)]
struct BulkCreateResponse {
	#[serde(rename = "taskIds")]
	task_ids: Vec<String>,
}

/// Response of a task status lookup.
#[derive(Debug, Deserialize)]
struct TaskResponse {
	status: TaskState,
	message: Option<String>,
	#[serde(default)]
	response: Option<TaskResultPayload>,
}

#[derive(Debug, Deserialize)]
struct TaskResultPayload {
	#[serde(rename = "customEntities", default)]
	custom_entities: Vec<EntityPayload>,
}

/// One page of an entity listing.
#[derive(Debug, Deserialize)]
struct EntityListResponse {
	#[serde(rename = "customEntities", default)]
	custom_entities: Vec<EntityPayload>,
	#[serde(rename = "nextToken")]
	next_token: Option<String>,
}

/// Entity as the Benchling API reports it.
#[derive(Debug, Deserialize)]
struct EntityPayload {
	id: String,
	#[serde(rename = "entityRegistryId")]
	entity_registry_id: String,
	name: String,
	#[serde(rename = "schemaId")]
	schema_id: String,
	#[serde(rename = "entityType", default = "default_entity_type")]
	entity_type: String,
	#[serde(rename = "modifiedAt")]
	modified_at: String,
	#[serde(default)]
	fields: HashMap<String, String>,
}

fn default_entity_type() -> String {
	"CustomEntity".to_string()
}

impl From<EntityPayload> for BenchlingEntity {
	fn from(payload: EntityPayload) -> Self {
		BenchlingEntity {
			id: payload.id,
			registry_id: payload.entity_registry_id,
			name: payload.name,
			schema_id: payload.schema_id,
			entity_type: payload.entity_type,
			modified_at: payload.modified_at,
			fields: payload.fields,
		}
	}
}

#[async_trait]
impl BenchlingInterface for HttpBenchling {
	async fn create_entities_async(
		&self,
		spec: EntityCreationSpec,
	) -> Result<Vec<String>, BenchlingError> {
		let response = self
			.client
			.post(self.url("/api/v2/custom-entities:bulk-create"))
			.bearer_auth(&self.api_key)
			.json(&spec)
			.send()
			.await
			.map_err(Self::classify_transport)?;

		let body: BulkCreateResponse = Self::check(response)
			.await?
			.json()
			.await
			.map_err(|e| BenchlingError::Api(e.to_string()))?;
		Ok(body.task_ids)
	}

	async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus, BenchlingError> {
		let response = self
			.client
			.get(self.url(&format!("/api/v2/tasks/{}", task_id)))
			.bearer_auth(&self.api_key)
			.send()
			.await
			.map_err(Self::classify_transport)?;

		let body: TaskResponse = Self::check(response)
			.await?
			.json()
			.await
			.map_err(|e| BenchlingError::Api(e.to_string()))?;

		Ok(TaskStatus {
			state: body.status,
			message: body.message,
			entities: body
				.response
				.map(|r| r.custom_entities.into_iter().map(Into::into).collect())
				.unwrap_or_default(),
		})
	}

	async fn list_entities(&self, schema_id: &str) -> Result<Vec<BenchlingEntity>, BenchlingError> {
		let mut entities = Vec::new();
		let mut next_token: Option<String> = None;

		loop {
			let mut request = self
				.client
				.get(self.url("/api/v2/custom-entities"))
				.bearer_auth(&self.api_key)
				.query(&[("schemaId", schema_id)]);
			if let Some(token) = &next_token {
				request = request.query(&[("nextToken", token.as_str())]);
			}

			let response = request.send().await.map_err(Self::classify_transport)?;
			let page: EntityListResponse = Self::check(response)
				.await?
				.json()
				.await
				.map_err(|e| BenchlingError::Api(e.to_string()))?;

			entities.extend(page.custom_entities.into_iter().map(Into::into));
			match page.next_token {
				Some(token) if !token.is_empty() => next_token = Some(token),
				_ => break,
			}
		}

		Ok(entities)
	}

	async fn update_entity(
		&self,
		id: &str,
		fields: HashMap<String, String>,
	) -> Result<(), BenchlingError> {
		let response = self
			.client
			.patch(self.url(&format!("/api/v2/custom-entities/{}", id)))
			.bearer_auth(&self.api_key)
			.json(&serde_json::json!({ "fields": fields }))
			.send()
			.await
			.map_err(Self::classify_transport)?;

		Self::check(response).await?;
		Ok(())
	}

	async fn delete_entity(&self, id: &str) -> Result<(), BenchlingError> {
		let response = self
			.client
			.post(self.url("/api/v2/custom-entities:archive"))
			.bearer_auth(&self.api_key)
			.json(&serde_json::json!({ "entityIds": [id], "reason": "Retired" }))
			.send()
			.await
			.map_err(Self::classify_transport)?;

		Self::check(response).await?;
		Ok(())
	}
}

/// Factory function to create an HTTP client from configuration.
///
/// Configuration parameters:
/// - `api_url`: base URL of the Benchling API
/// - `api_key`: bearer token
/// - `timeout_secs`: request timeout (default 30)
pub fn create_client(
	config: &toml::Value,
) -> Result<Box<dyn BenchlingInterface>, BenchlingError> {
	let config: HttpClientConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| BenchlingError::Api(e.message().to_string()))?;
	let client = HttpBenchling::new(
		config.api_url,
		config.api_key,
		Duration::from_secs(config.timeout_secs),
	)?;
	Ok(Box::new(client))
}
