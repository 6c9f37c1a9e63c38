//! API types for the reeflab portal HTTP API.
//!
//! This module defines the request and response types for the portal
//! endpoints along with the structured error type that maps failure
//! kinds to HTTP status codes.

use crate::order::{OrderStatus, OrderedSample};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body for `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
	/// Samples the customer wants tested; provisioned on approval.
	pub requested_samples: Vec<OrderedSample>,
}

/// Body for `PATCH /orders/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
	pub status: OrderStatus,
}

/// Body for `POST /orders/{id}/samples/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSamplesRequest {
	#[serde(rename = "sampleIds")]
	pub sample_ids: Vec<String>,
}

/// Body for `POST /admin/samples/benchling`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSampleRequest {
	/// Registry id; must carry the configured prefix.
	pub sample_id: String,
	pub client_name: String,
	pub sample_type: String,
	pub sample_format: String,
	pub sample_date: String,
	pub sample_status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
}

/// Partial update for `PATCH /admin/samples/benchling/{id}`.
///
/// Absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSampleRequest {
	pub client_name: Option<String>,
	pub sample_type: Option<String>,
	pub sample_format: Option<String>,
	pub sample_date: Option<String>,
	pub sample_status: Option<String>,
	pub order_id: Option<String>,
}

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Caller lacks permission for the requested action (401).
	Unauthorized { message: String },
	/// Malformed or missing required fields (400).
	BadRequest {
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Target resource does not exist (404).
	NotFound { message: String },
	/// Concurrent operation already running (409).
	Conflict {
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Unanticipated failure or retryable not-ready condition (500).
	InternalServerError {
		message: String,
		retry_after: Option<u64>,
	},
}

impl ApiError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::Unauthorized { .. } => 401,
			ApiError::BadRequest { .. } => 400,
			ApiError::NotFound { .. } => 404,
			ApiError::Conflict { .. } => 409,
			ApiError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			ApiError::Unauthorized { message } => ErrorResponse {
				error: "unauthorized".to_string(),
				message: message.clone(),
				details: None,
				retry_after: None,
			},
			ApiError::BadRequest { message, details } => ErrorResponse {
				error: "bad_request".to_string(),
				message: message.clone(),
				details: details.clone(),
				retry_after: None,
			},
			ApiError::NotFound { message } => ErrorResponse {
				error: "not_found".to_string(),
				message: message.clone(),
				details: None,
				retry_after: None,
			},
			ApiError::Conflict { message, details } => ErrorResponse {
				error: "conflict".to_string(),
				message: message.clone(),
				details: details.clone(),
				retry_after: None,
			},
			ApiError::InternalServerError {
				message,
				retry_after,
			} => ErrorResponse {
				error: "internal_server_error".to_string(),
				message: message.clone(),
				details: None,
				retry_after: *retry_after,
			},
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
			ApiError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			ApiError::NotFound { message } => write!(f, "Not Found: {}", message),
			ApiError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			ApiError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}
