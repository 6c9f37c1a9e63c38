//! Request processing for the portal API endpoints.

pub mod orders;
pub mod samples;
pub mod webhook;

use reeflab_core::CoreError;
use reeflab_types::ApiError;

/// Seconds a caller should wait before retrying a not-ready approval.
const NOT_READY_RETRY_SECS: u64 = 60;

/// Maps core workflow failures to API errors with HTTP semantics.
pub fn map_core_error(err: CoreError) -> ApiError {
	match err {
		CoreError::Unauthorized(message) => ApiError::Unauthorized { message },
		CoreError::Validation(message) => ApiError::BadRequest {
			message,
			details: None,
		},
		CoreError::NotFound(message) => ApiError::NotFound { message },
		CoreError::NotReady => ApiError::InternalServerError {
			message: CoreError::NotReady.to_string(),
			retry_after: Some(NOT_READY_RETRY_SECS),
		},
		CoreError::ImportInProgress(progress) => ApiError::Conflict {
			message: "Sample import already in progress".to_string(),
			details: serde_json::to_value(progress).ok(),
		},
		CoreError::ProvisioningFailed(message) => ApiError::InternalServerError {
			message: format!("Provisioning failed: {}", message),
			retry_after: None,
		},
		CoreError::External(e) => ApiError::InternalServerError {
			message: e.to_string(),
			retry_after: None,
		},
		CoreError::Storage(message) => ApiError::InternalServerError {
			message,
			retry_after: None,
		},
	}
}
