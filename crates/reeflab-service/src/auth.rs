//! Bearer-token authentication and webhook signature verification.
//!
//! Requests carry `Authorization: Bearer <token>`; the verifier maps a
//! token to a caller identity. The static implementation is configured
//! from the TOML auth section. Webhook deliveries are authenticated
//! separately with an HMAC-SHA256 signature over the raw body.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use reeflab_config::AuthConfig;
use reeflab_types::{ApiError, AuthContext};
use sha2::Sha256;
use std::collections::HashMap;

/// Header carrying the webhook body signature (hex digest).
pub const SIGNATURE_HEADER: &str = "x-benchling-signature";

/// Trait defining the interface for token verifiers.
pub trait AuthVerifier: Send + Sync {
	/// Resolves a bearer token to a caller identity, if valid.
	fn verify_token(&self, token: &str) -> Option<AuthContext>;
}

/// Verifier backed by the static token table from configuration.
pub struct StaticTokenVerifier {
	tokens: HashMap<String, AuthContext>,
}

impl StaticTokenVerifier {
	pub fn from_config(config: &AuthConfig) -> Self {
		let tokens = config
			.tokens
			.iter()
			.map(|(token, identity)| {
				(
					token.clone(),
					AuthContext {
						uid: identity.uid.clone(),
						admin: identity.admin,
					},
				)
			})
			.collect();
		Self { tokens }
	}
}

impl AuthVerifier for StaticTokenVerifier {
	fn verify_token(&self, token: &str) -> Option<AuthContext> {
		self.tokens.get(token).cloned()
	}
}

/// Authenticates a request from its headers.
pub fn authenticate(
	headers: &HeaderMap,
	verifier: &dyn AuthVerifier,
) -> Result<AuthContext, ApiError> {
	let header = headers
		.get(axum::http::header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.ok_or_else(|| ApiError::Unauthorized {
			message: "missing bearer token".to_string(),
		})?;

	let token = header
		.strip_prefix("Bearer ")
		.ok_or_else(|| ApiError::Unauthorized {
			message: "malformed authorization header".to_string(),
		})?;

	verifier
		.verify_token(token)
		.ok_or_else(|| ApiError::Unauthorized {
			message: "invalid bearer token".to_string(),
		})
}

/// Verifies the HMAC-SHA256 signature of a webhook body.
///
/// The header carries the hex digest of the body keyed by the shared
/// secret; comparison is constant-time via the mac verifier.
pub fn verify_webhook_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> bool {
	let Some(signature_hex) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
		return false;
	};
	let Ok(signature) = hex::decode(signature_hex) else {
		return false;
	};

	let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
		return false;
	};
	mac.update(body);
	mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::header::AUTHORIZATION;
	use reeflab_config::TokenConfig;

	fn verifier() -> StaticTokenVerifier {
		let mut tokens = HashMap::new();
		tokens.insert(
			"admin-token".to_string(),
			TokenConfig {
				uid: "admin-1".to_string(),
				admin: true,
			},
		);
		tokens.insert(
			"user-token".to_string(),
			TokenConfig {
				uid: "user-1".to_string(),
				admin: false,
			},
		);
		StaticTokenVerifier::from_config(&AuthConfig { tokens })
	}

	fn headers_with(token: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
		headers
	}

	#[test]
	fn test_authenticate_resolves_identity() {
		let verifier = verifier();
		let caller = authenticate(&headers_with("admin-token"), &verifier).unwrap();
		assert_eq!(caller.uid, "admin-1");
		assert!(caller.admin);

		let caller = authenticate(&headers_with("user-token"), &verifier).unwrap();
		assert!(!caller.admin);
	}

	#[test]
	fn test_authenticate_rejects_bad_tokens() {
		let verifier = verifier();
		assert!(authenticate(&HeaderMap::new(), &verifier).is_err());
		assert!(authenticate(&headers_with("wrong-token"), &verifier).is_err());

		let mut malformed = HeaderMap::new();
		malformed.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
		assert!(authenticate(&malformed, &verifier).is_err());
	}

	fn sign(secret: &str, body: &[u8]) -> String {
		let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
		mac.update(body);
		hex::encode(mac.finalize().into_bytes())
	}

	#[test]
	fn test_webhook_signature_roundtrip() {
		let body = br#"{"eventType":"v2.entity.updated"}"#;
		let mut headers = HeaderMap::new();
		headers.insert(SIGNATURE_HEADER, sign("secret", body).parse().unwrap());

		assert!(verify_webhook_signature("secret", &headers, body));
		assert!(!verify_webhook_signature("other-secret", &headers, body));
		assert!(!verify_webhook_signature("secret", &headers, b"tampered"));
	}

	#[test]
	fn test_webhook_signature_missing_or_malformed_header() {
		let body = b"{}";
		assert!(!verify_webhook_signature("secret", &HeaderMap::new(), body));

		let mut headers = HeaderMap::new();
		headers.insert(SIGNATURE_HEADER, "not-hex!".parse().unwrap());
		assert!(!verify_webhook_signature("secret", &headers, body));
	}
}
