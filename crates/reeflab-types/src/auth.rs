//! Caller identity types.

use serde::{Deserialize, Serialize};

/// Identity established by the authentication verifier.
///
/// Every handler resolves the bearer token to an AuthContext before
/// applying authorization rules; `admin` gates admin-only transitions,
/// resubmission, and the sync administration endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthContext {
	/// Unique user identifier.
	pub uid: String,
	/// Whether the caller holds the administrator role.
	pub admin: bool,
}

impl AuthContext {
	/// Returns true when the caller may act on the given order owner's
	/// behalf: administrators always, customers only for themselves.
	pub fn can_act_for(&self, owner_uid: &str) -> bool {
		self.admin || self.uid == owner_uid
	}
}
