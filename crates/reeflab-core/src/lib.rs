//! Core workflow module for the reeflab portal.
//!
//! This module implements the order status workflow and its external
//! synchronization layer: the status transition guard, the order state
//! machine, the approval orchestrator that provisions lab entities, the
//! sample submission flow, and the sync engine that keeps local sample
//! records and the external lab system eventually consistent.

use reeflab_benchling::BenchlingError;
use reeflab_storage::StorageError;
use reeflab_types::ImportProgress;
use thiserror::Error;

/// Order approval orchestration against the external lab system.
pub mod approval;
/// Status transition table, guard, and order state machine.
pub mod state;
/// Customer sample submission flow.
pub mod submission;
/// External synchronization engine.
pub mod sync;

pub use approval::ApprovalOrchestrator;
pub use state::{allowed_transitions, is_transition_allowed, OrderStateMachine, TransitionRule};
pub use submission::SampleSubmission;
pub use sync::SyncEngine;

/// Errors that can occur in the core workflow.
///
/// Variants follow the failure taxonomy surfaced to API callers:
/// authorization and validation failures are rejected before any state
/// mutation, the not-ready failure is distinguished so clients can
/// retry approval later, and external failures carry their own
/// classification from the lab system client.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Caller lacks permission for the requested action.
	#[error("Not authorized: {0}")]
	Unauthorized(String),
	/// Malformed or missing required fields.
	#[error("Invalid request: {0}")]
	Validation(String),
	/// The referenced order or sample does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// External provisioning has not reached a terminal state yet;
	/// the caller should retry the whole request later.
	#[error("Benchling task is not yet fully setup, please wait 1 min")]
	NotReady,
	/// External provisioning reached a failed terminal state.
	#[error("Provisioning failed: {0}")]
	ProvisioningFailed(String),
	/// A bulk import is already running.
	#[error("Sample import already in progress")]
	ImportInProgress(ImportProgress),
	/// Failure reported by the external lab system.
	#[error("{0}")]
	External(#[from] BenchlingError),
	/// Failure in the persisted document store.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for CoreError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound => CoreError::NotFound("document not found".to_string()),
			other => CoreError::Storage(other.to_string()),
		}
	}
}

/// Current Unix time in seconds.
pub(crate) fn epoch_secs() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
