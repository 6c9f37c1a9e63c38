//! External synchronization engine.
//!
//! Keeps the local sample mirror and the external lab system eventually
//! consistent. Inbound changes arrive through bulk imports and webhook
//! events; outbound changes are pushed synchronously with a durable
//! retry queue for pushes that cannot be confirmed. Queue draining only
//! happens on explicit processing calls, never on a background timer.

use crate::{epoch_secs, CoreError};
use reeflab_benchling::{BenchlingEntity, BenchlingService};
use reeflab_storage::{StorageError, StorageService};
use reeflab_types::{
	ImportSummary, QueueEntryStatus, QueueOperation, QueueSummary, StoreCollection, SyncMetadata,
	SyncQueueEntry, SyncedSample, UpdateSampleRequest, WebhookEvent, WebhookOutcome,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Id of the singleton sync metadata document.
const META_ID: &str = "singleton";

/// Entity type accepted from webhook deliveries.
const CUSTOM_ENTITY: &str = "CustomEntity";

/// Synchronizes the local sample mirror with the external lab system.
pub struct SyncEngine {
	storage: Arc<StorageService>,
	benchling: Arc<BenchlingService>,
	schema_id: String,
	registry_prefix: String,
}

impl SyncEngine {
	pub fn new(
		storage: Arc<StorageService>,
		benchling: Arc<BenchlingService>,
		schema_id: String,
		registry_prefix: String,
	) -> Self {
		Self {
			storage,
			benchling,
			schema_id,
			registry_prefix,
		}
	}

	/// Loads the sync metadata document, defaulting when absent.
	async fn load_metadata(&self) -> Result<SyncMetadata, CoreError> {
		match self
			.storage
			.retrieve(StoreCollection::SyncMeta.as_str(), META_ID)
			.await
		{
			Ok(meta) => Ok(meta),
			Err(StorageError::NotFound) => Ok(SyncMetadata::default()),
			Err(e) => Err(e.into()),
		}
	}

	async fn store_metadata(&self, meta: &mut SyncMetadata) -> Result<(), CoreError> {
		meta.updated_at = epoch_secs();
		self.storage
			.store(StoreCollection::SyncMeta.as_str(), META_ID, meta)
			.await?;
		Ok(())
	}

	/// Current sync coordination state, for the admin status endpoint.
	pub async fn metadata(&self) -> Result<SyncMetadata, CoreError> {
		self.load_metadata().await
	}

	/// Imports every entity under the configured schema into the local
	/// mirror.
	///
	/// The persisted `import_in_progress` flag is the sole concurrency
	/// guard: a second import started while one is running is rejected
	/// with the current progress and performs no external reads. The
	/// flag is cleared on success and on failure alike so a crashed run
	/// never wedges future imports behind a manual reset.
	pub async fn import_from_benchling(&self) -> Result<ImportSummary, CoreError> {
		let mut meta = self.load_metadata().await?;
		if meta.import_in_progress {
			return Err(CoreError::ImportInProgress(meta.import_progress));
		}

		meta.import_in_progress = true;
		meta.import_progress = Default::default();
		self.store_metadata(&mut meta).await?;

		let result = self.run_import(&mut meta).await;

		meta.import_in_progress = false;
		match &result {
			Ok(summary) => {
				info!(
					total = summary.total,
					imported = summary.imported,
					errors = summary.errors.len(),
					"Sample import finished"
				);
			},
			Err(e) => {
				warn!(error = %e, "Sample import failed");
				meta.record_error(format!("import failed: {}", e));
			},
		}
		self.store_metadata(&mut meta).await?;
		result
	}

	async fn run_import(&self, meta: &mut SyncMetadata) -> Result<ImportSummary, CoreError> {
		let entities = self.benchling.list_entities(&self.schema_id).await?;
		meta.import_progress.total = entities.len();
		self.store_metadata(meta).await?;

		let mut imported = 0;
		let mut errors = Vec::new();
		for entity in &entities {
			match self.upsert_mirror_record(entity).await {
				Ok(()) => imported += 1,
				Err(e) => {
					let detail = format!("sample {}: {}", entity.registry_id, e);
					meta.record_error(detail.clone());
					errors.push(detail);
				},
			}
			meta.import_progress.processed += 1;
			self.store_metadata(meta).await?;
		}

		Ok(ImportSummary {
			total: entities.len(),
			imported,
			errors,
		})
	}

	async fn upsert_mirror_record(&self, entity: &BenchlingEntity) -> Result<(), CoreError> {
		let record = record_from_fields(&entity.registry_id, &entity.modified_at, &entity.fields);
		self.storage
			.store(
				StoreCollection::BenchlingSamples.as_str(),
				&record.sample_id,
				&record,
			)
			.await?;
		Ok(())
	}

	/// Processes an inbound webhook event.
	///
	/// Events for other schemas, other entity types, or registry ids
	/// outside the configured prefix are acknowledged without touching
	/// local state. Conflicts resolve last-write-wins on the external
	/// modification time: an event strictly older than the stored
	/// record is discarded.
	pub async fn handle_webhook(&self, event: &WebhookEvent) -> Result<WebhookOutcome, CoreError> {
		let entity = &event.entity;
		if entity.schema_id != self.schema_id {
			return Ok(WebhookOutcome::Ignored {
				reason: format!("schema {} is not tracked", entity.schema_id),
			});
		}
		if entity.entity_type != CUSTOM_ENTITY {
			return Ok(WebhookOutcome::Ignored {
				reason: format!("entity type {} is not tracked", entity.entity_type),
			});
		}
		if !entity.registry_id.starts_with(&self.registry_prefix) {
			return Ok(WebhookOutcome::Ignored {
				reason: format!("registry id {} is outside the prefix", entity.registry_id),
			});
		}

		let incoming = record_from_fields(&entity.registry_id, &entity.modified_at, &entity.fields);
		if let Ok(stored) = self
			.storage
			.retrieve::<SyncedSample>(
				StoreCollection::BenchlingSamples.as_str(),
				&entity.registry_id,
			)
			.await
		{
			if let (Some(stored_time), Some(incoming_time)) =
				(stored.modified_time(), incoming.modified_time())
			{
				if incoming_time < stored_time {
					return Ok(WebhookOutcome::Ignored {
						reason: "stale event".to_string(),
					});
				}
			}
		}

		self.storage
			.store(
				StoreCollection::BenchlingSamples.as_str(),
				&incoming.sample_id,
				&incoming,
			)
			.await?;
		info!(sample_id = %incoming.sample_id, event = %event.event_type, "Webhook applied");
		Ok(WebhookOutcome::Applied {
			sample_id: incoming.sample_id,
		})
	}

	/// Drains the sync queue, retrying pending and failed entries.
	///
	/// Entries that apply successfully are marked done and kept for
	/// audit until explicitly cleared; failures stay queued with their
	/// attempt count and last error.
	pub async fn process_sync_queue(&self) -> Result<QueueSummary, CoreError> {
		let entries: Vec<SyncQueueEntry> = self
			.storage
			.retrieve_all(StoreCollection::SyncQueue.as_str())
			.await?;

		let mut summary = QueueSummary::default();
		for mut entry in entries {
			if entry.status == QueueEntryStatus::Done {
				continue;
			}
			summary.processed += 1;

			match self.apply_queue_entry(&entry).await {
				Ok(()) => {
					entry.status = QueueEntryStatus::Done;
					entry.last_error = None;
					summary.succeeded += 1;
				},
				Err(e) => {
					warn!(
						entry_id = %entry.id,
						operation = %entry.operation,
						sample_id = %entry.target_sample_id,
						error = %e,
						"Queued sync operation failed"
					);
					entry.status = QueueEntryStatus::Failed;
					entry.attempts += 1;
					entry.last_error = Some(e.to_string());
					summary.failed += 1;
				},
			}
			self.storage
				.store(StoreCollection::SyncQueue.as_str(), &entry.id, &entry)
				.await?;
		}

		info!(
			processed = summary.processed,
			succeeded = summary.succeeded,
			failed = summary.failed,
			"Sync queue drained"
		);
		Ok(summary)
	}

	async fn apply_queue_entry(&self, entry: &SyncQueueEntry) -> Result<(), CoreError> {
		match entry.operation {
			// The external API registers unknown ids on update, so
			// queued creates replay as field updates
			QueueOperation::Create | QueueOperation::Update => {
				let fields: HashMap<String, String> =
					serde_json::from_value(entry.payload.clone())
						.map_err(|e| CoreError::Validation(format!("queue payload: {}", e)))?;
				self.benchling
					.update_entity(&entry.target_sample_id, fields)
					.await?;
			},
			QueueOperation::Delete => {
				self.benchling.delete_entity(&entry.target_sample_id).await?;
			},
		}
		Ok(())
	}

	/// Removes completed queue entries.
	pub async fn clear_done_queue_entries(&self) -> Result<usize, CoreError> {
		let entries: Vec<SyncQueueEntry> = self
			.storage
			.retrieve_all(StoreCollection::SyncQueue.as_str())
			.await?;
		let mut cleared = 0;
		for entry in entries {
			if entry.status == QueueEntryStatus::Done {
				self.storage
					.remove(StoreCollection::SyncQueue.as_str(), &entry.id)
					.await?;
				cleared += 1;
			}
		}
		Ok(cleared)
	}

	/// Lists every queue entry, for the admin status endpoint.
	pub async fn queue_entries(&self) -> Result<Vec<SyncQueueEntry>, CoreError> {
		Ok(self
			.storage
			.retrieve_all(StoreCollection::SyncQueue.as_str())
			.await?)
	}

	async fn enqueue(
		&self,
		operation: QueueOperation,
		target_sample_id: &str,
		payload: serde_json::Value,
	) -> Result<(), CoreError> {
		let entry = SyncQueueEntry {
			id: uuid::Uuid::new_v4().to_string(),
			operation,
			target_sample_id: target_sample_id.to_string(),
			payload,
			status: QueueEntryStatus::Pending,
			attempts: 0,
			last_error: None,
			created_at: epoch_secs(),
		};
		self.storage
			.store(StoreCollection::SyncQueue.as_str(), &entry.id, &entry)
			.await?;
		Ok(())
	}

	/// Lists every sample in the local mirror.
	pub async fn get_all_samples(&self) -> Result<Vec<SyncedSample>, CoreError> {
		Ok(self
			.storage
			.retrieve_all(StoreCollection::BenchlingSamples.as_str())
			.await?)
	}

	/// Loads one mirrored sample by registry id.
	pub async fn get_sample_by_id(&self, sample_id: &str) -> Result<SyncedSample, CoreError> {
		self.storage
			.retrieve(StoreCollection::BenchlingSamples.as_str(), sample_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					CoreError::NotFound(format!("Sample not found: {}", sample_id))
				},
				other => other.into(),
			})
	}

	/// Creates a sample locally and pushes it to the external system.
	///
	/// The local write commits first; a failed push is queued durably so
	/// the caller never loses the record.
	pub async fn create_sample(&self, record: SyncedSample) -> Result<SyncedSample, CoreError> {
		if !record.sample_id.starts_with(&self.registry_prefix) {
			return Err(CoreError::Validation(format!(
				"sample id {} must start with {}",
				record.sample_id, self.registry_prefix
			)));
		}
		if self
			.storage
			.exists(StoreCollection::BenchlingSamples.as_str(), &record.sample_id)
			.await?
		{
			return Err(CoreError::Validation(format!(
				"sample {} already exists",
				record.sample_id
			)));
		}

		self.storage
			.store(
				StoreCollection::BenchlingSamples.as_str(),
				&record.sample_id,
				&record,
			)
			.await?;

		if let Err(e) = self
			.benchling
			.update_entity(&record.sample_id, record.to_field_map())
			.await
		{
			warn!(sample_id = %record.sample_id, error = %e, "Create push failed, queueing");
			self.enqueue(
				QueueOperation::Create,
				&record.sample_id,
				serde_json::to_value(record.to_field_map())
					.map_err(|e| CoreError::Storage(e.to_string()))?,
			)
			.await?;
		}
		Ok(record)
	}

	/// Applies a partial update to a mirrored sample and pushes it out.
	pub async fn update_sample(
		&self,
		sample_id: &str,
		update: UpdateSampleRequest,
	) -> Result<SyncedSample, CoreError> {
		let mut record = self.get_sample_by_id(sample_id).await?;
		if let Some(client_name) = update.client_name {
			record.client_name = client_name;
		}
		if let Some(sample_type) = update.sample_type {
			record.sample_type = sample_type;
		}
		if let Some(sample_format) = update.sample_format {
			record.sample_format = sample_format;
		}
		if let Some(sample_date) = update.sample_date {
			record.sample_date = sample_date;
		}
		if let Some(sample_status) = update.sample_status {
			record.sample_status = sample_status;
		}
		if let Some(order_id) = update.order_id {
			record.order_id = Some(order_id);
		}
		record.modified_at = chrono::Utc::now().to_rfc3339();

		self.storage
			.store(StoreCollection::BenchlingSamples.as_str(), sample_id, &record)
			.await?;

		if let Err(e) = self
			.benchling
			.update_entity(sample_id, record.to_field_map())
			.await
		{
			warn!(sample_id = %sample_id, error = %e, "Update push failed, queueing");
			self.enqueue(
				QueueOperation::Update,
				sample_id,
				serde_json::to_value(record.to_field_map())
					.map_err(|e| CoreError::Storage(e.to_string()))?,
			)
			.await?;
		}
		Ok(record)
	}

	/// Deletes a mirrored sample locally and in the external system.
	pub async fn delete_sample(&self, sample_id: &str) -> Result<(), CoreError> {
		if !self
			.storage
			.exists(StoreCollection::BenchlingSamples.as_str(), sample_id)
			.await?
		{
			return Err(CoreError::NotFound(format!(
				"Sample not found: {}",
				sample_id
			)));
		}

		self.storage
			.remove(StoreCollection::BenchlingSamples.as_str(), sample_id)
			.await?;
		info!(sample_id = %sample_id, "Sample deleted locally");

		if let Err(e) = self.benchling.delete_entity(sample_id).await {
			warn!(sample_id = %sample_id, error = %e, "Delete push failed, queueing");
			self.enqueue(QueueOperation::Delete, sample_id, serde_json::Value::Null)
				.await?;
		}
		Ok(())
	}

	/// Pushes a submission status change for one sample.
	///
	/// Used by the sample submission flow before it commits the local
	/// order update. A failed push becomes a queue entry, which counts
	/// as success for the caller: the change is durable either way.
	pub async fn push_submission(
		&self,
		order_id: &str,
		sample_name: &str,
	) -> Result<(), CoreError> {
		let mut fields = HashMap::new();
		fields.insert("sampleStatus".to_string(), "sample-returned".to_string());
		fields.insert("orderId".to_string(), order_id.to_string());

		if let Err(e) = self.benchling.update_entity(sample_name, fields).await {
			warn!(
				sample_id = %sample_name,
				order_id = %order_id,
				error = %e,
				"Submission push failed, queueing"
			);
			let payload = serde_json::json!({
				"sampleStatus": "sample-returned",
				"orderId": order_id,
			});
			self.enqueue(QueueOperation::Update, sample_name, payload).await?;
		}
		Ok(())
	}
}

/// Builds a mirror record from an external field map.
fn record_from_fields(
	registry_id: &str,
	modified_at: &str,
	fields: &HashMap<String, String>,
) -> SyncedSample {
	let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
	SyncedSample {
		sample_id: registry_id.to_string(),
		client_name: field("clientName"),
		sample_type: field("sampleType"),
		sample_format: field("sampleFormat"),
		sample_date: field("sampleDate"),
		sample_status: field("sampleStatus"),
		order_id: fields.get("orderId").cloned().filter(|v| !v.is_empty()),
		modified_at: modified_at.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reeflab_benchling::implementations::mock::MockBenchling;
	use reeflab_storage::implementations::memory::MemoryStorage;
	use reeflab_types::WebhookEntity;

	const SCHEMA: &str = "ts_aqsample";
	const PREFIX: &str = "AQS-";

	fn engine() -> (MockBenchling, SyncEngine) {
		let mock = MockBenchling::new();
		let engine = SyncEngine::new(
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(BenchlingService::new(Box::new(mock.clone()))),
			SCHEMA.to_string(),
			PREFIX.to_string(),
		);
		(mock, engine)
	}

	fn external_entity(registry_id: &str, modified_at: &str) -> BenchlingEntity {
		let mut fields = HashMap::new();
		fields.insert("clientName".to_string(), "Coral Farm A".to_string());
		fields.insert("sampleType".to_string(), "water".to_string());
		fields.insert("sampleStatus".to_string(), "received".to_string());
		BenchlingEntity {
			id: format!("ent-{}", registry_id),
			registry_id: registry_id.to_string(),
			name: registry_id.to_string(),
			schema_id: SCHEMA.to_string(),
			entity_type: "CustomEntity".to_string(),
			modified_at: modified_at.to_string(),
			fields,
		}
	}

	fn webhook_event(registry_id: &str, modified_at: &str) -> WebhookEvent {
		let entity = external_entity(registry_id, modified_at);
		WebhookEvent {
			event_type: "v2.entity.updated".to_string(),
			entity: WebhookEntity {
				id: entity.id,
				registry_id: entity.registry_id,
				schema_id: entity.schema_id,
				entity_type: entity.entity_type,
				modified_at: entity.modified_at,
				fields: entity.fields,
			},
		}
	}

	fn local_record(sample_id: &str) -> SyncedSample {
		SyncedSample {
			sample_id: sample_id.to_string(),
			client_name: "Coral Farm B".to_string(),
			sample_type: "tissue".to_string(),
			sample_format: "vial".to_string(),
			sample_date: "2026-05-01".to_string(),
			sample_status: "received".to_string(),
			order_id: None,
			modified_at: "2026-05-01T00:00:00Z".to_string(),
		}
	}

	#[tokio::test]
	async fn test_import_mirrors_all_entities() {
		let (mock, engine) = engine();
		mock.insert_entity(external_entity("AQS-QPCR-0001", "2026-05-01T00:00:00Z"));
		mock.insert_entity(external_entity("AQS-MTG-0002", "2026-05-01T00:00:00Z"));

		let summary = engine.import_from_benchling().await.unwrap();
		assert_eq!(summary.total, 2);
		assert_eq!(summary.imported, 2);
		assert!(summary.errors.is_empty());

		let samples = engine.get_all_samples().await.unwrap();
		assert_eq!(samples.len(), 2);
		let meta = engine.metadata().await.unwrap();
		assert!(!meta.import_in_progress);
		assert_eq!(meta.import_progress.processed, 2);
	}

	#[tokio::test]
	async fn test_concurrent_import_rejected_without_external_reads() {
		let (mock, engine) = engine();
		let mut meta = SyncMetadata {
			import_in_progress: true,
			..Default::default()
		};
		meta.import_progress.total = 10;
		meta.import_progress.processed = 4;
		engine.store_metadata(&mut meta).await.unwrap();

		let result = engine.import_from_benchling().await;
		match result {
			Err(CoreError::ImportInProgress(progress)) => {
				assert_eq!(progress.total, 10);
				assert_eq!(progress.processed, 4);
			},
			other => panic!("expected import-in-progress, got {:?}", other.err()),
		}
		assert_eq!(mock.list_calls(), 0);
	}

	#[tokio::test]
	async fn test_import_can_run_again_after_finishing() {
		let (mock, engine) = engine();
		mock.insert_entity(external_entity("AQS-QPCR-0001", "2026-05-01T00:00:00Z"));

		engine.import_from_benchling().await.unwrap();
		let summary = engine.import_from_benchling().await.unwrap();
		assert_eq!(summary.imported, 1);
		assert_eq!(mock.list_calls(), 2);
	}

	#[tokio::test]
	async fn test_webhook_applies_matching_event() {
		let (_mock, engine) = engine();
		let outcome = engine
			.handle_webhook(&webhook_event("AQS-QPCR-0001", "2026-05-02T10:00:00Z"))
			.await
			.unwrap();
		assert_eq!(
			outcome,
			WebhookOutcome::Applied {
				sample_id: "AQS-QPCR-0001".to_string()
			}
		);
		let stored = engine.get_sample_by_id("AQS-QPCR-0001").await.unwrap();
		assert_eq!(stored.client_name, "Coral Farm A");
	}

	#[tokio::test]
	async fn test_webhook_filters() {
		let (_mock, engine) = engine();

		let mut foreign_schema = webhook_event("AQS-QPCR-0001", "2026-05-02T10:00:00Z");
		foreign_schema.entity.schema_id = "ts_other".to_string();
		assert!(matches!(
			engine.handle_webhook(&foreign_schema).await.unwrap(),
			WebhookOutcome::Ignored { .. }
		));

		let mut wrong_type = webhook_event("AQS-QPCR-0001", "2026-05-02T10:00:00Z");
		wrong_type.entity.entity_type = "DnaSequence".to_string();
		assert!(matches!(
			engine.handle_webhook(&wrong_type).await.unwrap(),
			WebhookOutcome::Ignored { .. }
		));

		let foreign_prefix = webhook_event("XYZ-QPCR-0001", "2026-05-02T10:00:00Z");
		assert!(matches!(
			engine.handle_webhook(&foreign_prefix).await.unwrap(),
			WebhookOutcome::Ignored { .. }
		));

		assert!(engine.get_all_samples().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_webhook_last_write_wins() {
		let (_mock, engine) = engine();
		engine
			.handle_webhook(&webhook_event("AQS-QPCR-0001", "2026-05-02T10:00:00Z"))
			.await
			.unwrap();

		// Strictly older event is discarded
		let mut stale = webhook_event("AQS-QPCR-0001", "2026-05-01T10:00:00Z");
		stale.entity.fields.insert(
			"clientName".to_string(),
			"Outdated Name".to_string(),
		);
		let outcome = engine.handle_webhook(&stale).await.unwrap();
		assert_eq!(
			outcome,
			WebhookOutcome::Ignored {
				reason: "stale event".to_string()
			}
		);
		let stored = engine.get_sample_by_id("AQS-QPCR-0001").await.unwrap();
		assert_eq!(stored.client_name, "Coral Farm A");

		// Equal timestamp applies
		let mut equal = webhook_event("AQS-QPCR-0001", "2026-05-02T10:00:00Z");
		equal
			.entity
			.fields
			.insert("clientName".to_string(), "Renamed Farm".to_string());
		assert!(matches!(
			engine.handle_webhook(&equal).await.unwrap(),
			WebhookOutcome::Applied { .. }
		));
		let stored = engine.get_sample_by_id("AQS-QPCR-0001").await.unwrap();
		assert_eq!(stored.client_name, "Renamed Farm");
	}

	#[tokio::test]
	async fn test_create_sample_pushes_or_queues() {
		let (mock, engine) = engine();

		let record = engine
			.create_sample(local_record("AQS-GS-0001"))
			.await
			.unwrap();
		assert!(mock.entity(&record.sample_id).is_some());
		assert!(engine.queue_entries().await.unwrap().is_empty());

		// Push failure still commits locally and queues the push
		mock.set_fail_pushes(true);
		engine
			.create_sample(local_record("AQS-GS-0002"))
			.await
			.unwrap();
		assert!(engine.get_sample_by_id("AQS-GS-0002").await.is_ok());
		let entries = engine.queue_entries().await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].operation, QueueOperation::Create);
		assert_eq!(entries[0].status, QueueEntryStatus::Pending);
	}

	#[tokio::test]
	async fn test_create_sample_validation() {
		let (_mock, engine) = engine();

		let result = engine.create_sample(local_record("XYZ-GS-0001")).await;
		assert!(matches!(result, Err(CoreError::Validation(_))));

		engine
			.create_sample(local_record("AQS-GS-0001"))
			.await
			.unwrap();
		let duplicate = engine.create_sample(local_record("AQS-GS-0001")).await;
		assert!(matches!(duplicate, Err(CoreError::Validation(_))));
	}

	#[tokio::test]
	async fn test_update_sample_merges_partial_fields() {
		let (mock, engine) = engine();
		engine
			.create_sample(local_record("AQS-GS-0001"))
			.await
			.unwrap();

		let update = UpdateSampleRequest {
			sample_status: Some("processing".to_string()),
			..Default::default()
		};
		let updated = engine.update_sample("AQS-GS-0001", update).await.unwrap();
		assert_eq!(updated.sample_status, "processing");
		// Untouched fields survive
		assert_eq!(updated.client_name, "Coral Farm B");
		assert!(updated.modified_time().is_some());

		let pushed = mock.entity("AQS-GS-0001").unwrap();
		assert_eq!(pushed.fields.get("sampleStatus").unwrap(), "processing");
	}

	#[tokio::test]
	async fn test_delete_sample_pushes_or_queues() {
		let (mock, engine) = engine();
		engine
			.create_sample(local_record("AQS-GS-0001"))
			.await
			.unwrap();

		engine.delete_sample("AQS-GS-0001").await.unwrap();
		assert!(mock.entity("AQS-GS-0001").is_none());
		assert!(matches!(
			engine.get_sample_by_id("AQS-GS-0001").await,
			Err(CoreError::NotFound(_))
		));

		let missing = engine.delete_sample("AQS-GS-0001").await;
		assert!(matches!(missing, Err(CoreError::NotFound(_))));

		engine
			.create_sample(local_record("AQS-GS-0002"))
			.await
			.unwrap();
		mock.set_fail_pushes(true);
		engine.delete_sample("AQS-GS-0002").await.unwrap();
		let entries = engine.queue_entries().await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].operation, QueueOperation::Delete);
	}

	#[tokio::test]
	async fn test_queue_drain_and_clear() {
		let (mock, engine) = engine();
		mock.set_fail_pushes(true);
		engine
			.create_sample(local_record("AQS-GS-0001"))
			.await
			.unwrap();

		// Drain while the external system is still failing
		let summary = engine.process_sync_queue().await.unwrap();
		assert_eq!(summary.processed, 1);
		assert_eq!(summary.failed, 1);
		let entries = engine.queue_entries().await.unwrap();
		assert_eq!(entries[0].status, QueueEntryStatus::Failed);
		assert_eq!(entries[0].attempts, 1);
		assert!(entries[0].last_error.is_some());

		// Drain again once it recovers
		mock.set_fail_pushes(false);
		let summary = engine.process_sync_queue().await.unwrap();
		assert_eq!(summary.succeeded, 1);
		assert!(mock.entity("AQS-GS-0001").is_some());
		let entries = engine.queue_entries().await.unwrap();
		assert_eq!(entries[0].status, QueueEntryStatus::Done);
		assert!(entries[0].last_error.is_none());

		// Done entries are skipped by later drains and removed on clear
		let summary = engine.process_sync_queue().await.unwrap();
		assert_eq!(summary.processed, 0);
		let cleared = engine.clear_done_queue_entries().await.unwrap();
		assert_eq!(cleared, 1);
		assert!(engine.queue_entries().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_push_submission_queues_on_failure() {
		let (mock, engine) = engine();

		engine
			.push_submission("ord-1", "AQS-QPCR-0001")
			.await
			.unwrap();
		let pushed = mock.entity("AQS-QPCR-0001").unwrap();
		assert_eq!(
			pushed.fields.get("sampleStatus").unwrap(),
			"sample-returned"
		);
		assert_eq!(pushed.fields.get("orderId").unwrap(), "ord-1");

		mock.set_fail_pushes(true);
		engine
			.push_submission("ord-1", "AQS-QPCR-0002")
			.await
			.unwrap();
		let entries = engine.queue_entries().await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].target_sample_id, "AQS-QPCR-0002");
	}
}
