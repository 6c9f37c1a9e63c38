//! Types mirrored from or queued for the external lab system.
//!
//! The portal keeps a local mirror of Benchling sample entities. Local
//! edits are pushed out best-effort; pushes that cannot be confirmed
//! synchronously become durable queue entries drained by explicit
//! processing calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Local mirror of a Benchling sample entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncedSample {
	/// External registry identifier (prefix-qualified).
	pub sample_id: String,
	pub client_name: String,
	pub sample_type: String,
	pub sample_format: String,
	pub sample_date: String,
	pub sample_status: String,
	/// Back-reference to the owning order, lookup-only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	/// RFC 3339 modification time reported by the external system;
	/// drives last-write-wins conflict resolution for webhooks.
	pub modified_at: String,
}

impl SyncedSample {
	/// Parses the external modification time, if well-formed.
	pub fn modified_time(&self) -> Option<DateTime<Utc>> {
		DateTime::parse_from_rfc3339(&self.modified_at)
			.ok()
			.map(|t| t.with_timezone(&Utc))
	}

	/// Field map pushed to the external system on create/update.
	pub fn to_field_map(&self) -> HashMap<String, String> {
		let mut fields = HashMap::new();
		fields.insert("clientName".to_string(), self.client_name.clone());
		fields.insert("sampleType".to_string(), self.sample_type.clone());
		fields.insert("sampleFormat".to_string(), self.sample_format.clone());
		fields.insert("sampleDate".to_string(), self.sample_date.clone());
		fields.insert("sampleStatus".to_string(), self.sample_status.clone());
		if let Some(order_id) = &self.order_id {
			fields.insert("orderId".to_string(), order_id.clone());
		}
		fields
	}
}

/// Operation carried by a sync queue entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueOperation {
	Create,
	Update,
	Delete,
}

impl fmt::Display for QueueOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			QueueOperation::Create => write!(f, "create"),
			QueueOperation::Update => write!(f, "update"),
			QueueOperation::Delete => write!(f, "delete"),
		}
	}
}

/// Lifecycle status of a sync queue entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueEntryStatus {
	/// Not yet attempted.
	Pending,
	/// At least one attempt failed; retried on the next drain.
	Failed,
	/// Applied to the external system; kept until cleared by an admin.
	Done,
}

/// Durable record of a push that could not be confirmed synchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueEntry {
	/// Unique entry identifier.
	pub id: String,
	pub operation: QueueOperation,
	/// Registry id of the sample the operation targets.
	pub target_sample_id: String,
	/// Field map pushed for create/update operations.
	pub payload: serde_json::Value,
	pub status: QueueEntryStatus,
	/// Number of failed attempts so far.
	pub attempts: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
	pub created_at: u64,
}

/// Progress of a running or finished bulk import.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
	pub total: usize,
	pub processed: usize,
}

/// Maximum number of sync error messages retained in metadata.
const MAX_SYNC_ERRORS: usize = 50;

/// Singleton coordination document for the sync engine.
///
/// Persisted rather than held in memory because handlers are stateless
/// between invocations; `import_in_progress` is the sole concurrency
/// guard for bulk imports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
	pub import_in_progress: bool,
	pub import_progress: ImportProgress,
	#[serde(default)]
	pub sync_errors: Vec<String>,
	pub updated_at: u64,
}

impl SyncMetadata {
	/// Appends an error to the bounded history, dropping the oldest
	/// entry once the cap is reached.
	pub fn record_error(&mut self, error: impl Into<String>) {
		if self.sync_errors.len() >= MAX_SYNC_ERRORS {
			self.sync_errors.remove(0);
		}
		self.sync_errors.push(error.into());
	}
}

/// Result of a bulk import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
	pub total: usize,
	pub imported: usize,
	pub errors: Vec<String>,
}

/// Result of draining the sync queue.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
	pub processed: usize,
	pub succeeded: usize,
	pub failed: usize,
}

/// Entity snapshot carried by an inbound Benchling webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEntity {
	pub id: String,
	pub registry_id: String,
	pub schema_id: String,
	pub entity_type: String,
	pub modified_at: String,
	#[serde(default)]
	pub fields: HashMap<String, String>,
}

/// Inbound webhook event from the external lab system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
	pub event_type: String,
	pub entity: WebhookEntity,
}

/// Outcome of processing a webhook event.
///
/// Filtered-out and stale events are acknowledged as no-ops so the
/// upstream system never sees failures for irrelevant deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum WebhookOutcome {
	/// The event mutated the local sample mirror.
	Applied { sample_id: String },
	/// The event was acknowledged without touching local state.
	Ignored { reason: String },
}
