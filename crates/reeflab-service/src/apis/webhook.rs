//! Inbound Benchling webhook endpoint.
//!
//! Webhook deliveries authenticate with an HMAC signature over the raw
//! body instead of a bearer token. When no secret is configured the
//! signature check is skipped, which is the development setup against
//! the mock client.

use crate::apis::map_core_error;
use crate::auth::verify_webhook_signature;
use axum::http::HeaderMap;
use reeflab_core::SyncEngine;
use reeflab_types::{ApiError, WebhookEvent, WebhookOutcome};

/// Verifies and processes one webhook delivery.
pub async fn process_webhook(
	sync: &SyncEngine,
	secret: Option<&str>,
	headers: &HeaderMap,
	body: &[u8],
) -> Result<WebhookOutcome, ApiError> {
	if let Some(secret) = secret {
		if !verify_webhook_signature(secret, headers, body) {
			return Err(ApiError::Unauthorized {
				message: "webhook signature verification failed".to_string(),
			});
		}
	}

	let event: WebhookEvent = serde_json::from_slice(body).map_err(|e| ApiError::BadRequest {
		message: format!("malformed webhook body: {}", e),
		details: None,
	})?;

	sync.handle_webhook(&event).await.map_err(map_core_error)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::SIGNATURE_HEADER;
	use hmac::{Hmac, Mac};
	use reeflab_benchling::implementations::mock::MockBenchling;
	use reeflab_benchling::BenchlingService;
	use reeflab_storage::{implementations::memory::MemoryStorage, StorageService};
	use sha2::Sha256;
	use std::sync::Arc;

	fn engine() -> SyncEngine {
		SyncEngine::new(
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(BenchlingService::new(Box::new(MockBenchling::new()))),
			"ts_aqsample".to_string(),
			"AQS-".to_string(),
		)
	}

	fn event_body(registry_id: &str) -> Vec<u8> {
		serde_json::json!({
			"eventType": "v2.entity.updated",
			"entity": {
				"id": "ent-1",
				"registryId": registry_id,
				"schemaId": "ts_aqsample",
				"entityType": "CustomEntity",
				"modifiedAt": "2026-05-02T10:00:00Z",
				"fields": {"clientName": "Coral Farm A"}
			}
		})
		.to_string()
		.into_bytes()
	}

	fn signed_headers(secret: &str, body: &[u8]) -> HeaderMap {
		let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
		mac.update(body);
		let mut headers = HeaderMap::new();
		headers.insert(
			SIGNATURE_HEADER,
			hex::encode(mac.finalize().into_bytes()).parse().unwrap(),
		);
		headers
	}

	#[tokio::test]
	async fn test_webhook_without_secret_skips_verification() {
		let engine = engine();
		let body = event_body("AQS-QPCR-0001");
		let outcome = process_webhook(&engine, None, &HeaderMap::new(), &body)
			.await
			.unwrap();
		assert!(matches!(outcome, WebhookOutcome::Applied { .. }));
	}

	#[tokio::test]
	async fn test_webhook_signature_enforced_when_configured() {
		let engine = engine();
		let body = event_body("AQS-QPCR-0001");

		let unsigned = process_webhook(&engine, Some("secret"), &HeaderMap::new(), &body).await;
		assert_eq!(unsigned.unwrap_err().status_code(), 401);

		let headers = signed_headers("secret", &body);
		let outcome = process_webhook(&engine, Some("secret"), &headers, &body)
			.await
			.unwrap();
		assert!(matches!(outcome, WebhookOutcome::Applied { .. }));

		// Signature from the wrong secret is rejected
		let wrong = signed_headers("other", &body);
		let result = process_webhook(&engine, Some("secret"), &wrong, &body).await;
		assert_eq!(result.unwrap_err().status_code(), 401);
	}

	#[tokio::test]
	async fn test_filtered_event_acknowledged_as_ignored() {
		let engine = engine();
		let body = event_body("XYZ-QPCR-0001");
		let outcome = process_webhook(&engine, None, &HeaderMap::new(), &body)
			.await
			.unwrap();
		assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
	}

	#[tokio::test]
	async fn test_malformed_body_rejected() {
		let engine = engine();
		let result = process_webhook(&engine, None, &HeaderMap::new(), b"not json").await;
		assert_eq!(result.unwrap_err().status_code(), 400);
	}
}
