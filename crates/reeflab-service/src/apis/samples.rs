//! Administrative sample endpoints: the Benchling mirror CRUD, bulk
//! import, and sync queue management.

use crate::apis::map_core_error;
use reeflab_core::SyncEngine;
use reeflab_types::{
	ApiError, AuthContext, CreateSampleRequest, ImportSummary, QueueSummary, SyncMetadata,
	SyncQueueEntry, SyncedSample, UpdateSampleRequest,
};

fn require_admin(caller: &AuthContext) -> Result<(), ApiError> {
	if caller.admin {
		Ok(())
	} else {
		Err(ApiError::Unauthorized {
			message: "this endpoint requires the administrator role".to_string(),
		})
	}
}

pub async fn list_samples(
	sync: &SyncEngine,
	caller: &AuthContext,
) -> Result<Vec<SyncedSample>, ApiError> {
	require_admin(caller)?;
	sync.get_all_samples().await.map_err(map_core_error)
}

pub async fn create_sample(
	sync: &SyncEngine,
	caller: &AuthContext,
	request: CreateSampleRequest,
) -> Result<SyncedSample, ApiError> {
	require_admin(caller)?;
	let record = SyncedSample {
		sample_id: request.sample_id,
		client_name: request.client_name,
		sample_type: request.sample_type,
		sample_format: request.sample_format,
		sample_date: request.sample_date,
		sample_status: request.sample_status,
		order_id: request.order_id,
		modified_at: chrono::Utc::now().to_rfc3339(),
	};
	sync.create_sample(record).await.map_err(map_core_error)
}

pub async fn update_sample(
	sync: &SyncEngine,
	caller: &AuthContext,
	sample_id: &str,
	request: UpdateSampleRequest,
) -> Result<SyncedSample, ApiError> {
	require_admin(caller)?;
	sync.update_sample(sample_id, request)
		.await
		.map_err(map_core_error)
}

pub async fn delete_sample(
	sync: &SyncEngine,
	caller: &AuthContext,
	sample_id: &str,
) -> Result<(), ApiError> {
	require_admin(caller)?;
	sync.delete_sample(sample_id).await.map_err(map_core_error)
}

/// Runs a bulk import from the external system.
pub async fn run_import(
	sync: &SyncEngine,
	caller: &AuthContext,
) -> Result<ImportSummary, ApiError> {
	require_admin(caller)?;
	sync.import_from_benchling().await.map_err(map_core_error)
}

/// Returns the sync coordination state, including import progress.
pub async fn import_status(
	sync: &SyncEngine,
	caller: &AuthContext,
) -> Result<SyncMetadata, ApiError> {
	require_admin(caller)?;
	sync.metadata().await.map_err(map_core_error)
}

/// Drains the sync queue and reports the outcome.
pub async fn drain_queue(
	sync: &SyncEngine,
	caller: &AuthContext,
) -> Result<QueueSummary, ApiError> {
	require_admin(caller)?;
	sync.process_sync_queue().await.map_err(map_core_error)
}

/// Removes completed queue entries; returns the remaining entries.
pub async fn clear_queue(
	sync: &SyncEngine,
	caller: &AuthContext,
) -> Result<Vec<SyncQueueEntry>, ApiError> {
	require_admin(caller)?;
	sync.clear_done_queue_entries()
		.await
		.map_err(map_core_error)?;
	sync.queue_entries().await.map_err(map_core_error)
}
