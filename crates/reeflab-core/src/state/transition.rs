//! Static order status transition table and guard.
//!
//! Each order status maps to the set of legal next statuses, annotated
//! with whether only an administrator may request the transition and a
//! human-readable label. States without entries permit no transitions,
//! so unknown or terminal states fail closed. The table is an
//! exhaustive match over the status enum: adding a status without
//! deciding its transitions is a compile error.

use reeflab_types::OrderStatus;

/// One legal transition out of an order status.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
	/// Status the order moves to.
	pub next: OrderStatus,
	/// Whether only administrators may request this transition.
	/// Administrators may also request non-admin transitions; customers
	/// are never allowed admin-flagged ones.
	pub admin_only: bool,
	/// Human-readable action label.
	pub label: &'static str,
}

/// Returns the legal transitions out of the given status.
pub fn allowed_transitions(from: OrderStatus) -> &'static [TransitionRule] {
	match from {
		OrderStatus::Reviewing => &[TransitionRule {
			next: OrderStatus::Approved,
			admin_only: true,
			label: "Approve order",
		}],
		OrderStatus::Approved => &[TransitionRule {
			next: OrderStatus::KitSent,
			admin_only: true,
			label: "Mark kit dispatched",
		}],
		OrderStatus::KitSent => &[TransitionRule {
			next: OrderStatus::KitArrived,
			admin_only: false,
			label: "Confirm kit arrival",
		}],
		// Terminal for status purposes; samples continue independently
		OrderStatus::KitArrived => &[],
	}
}

/// Checks whether the requested transition is permitted for the caller.
pub fn is_transition_allowed(
	from: OrderStatus,
	to: OrderStatus,
	is_admin: bool,
) -> bool {
	allowed_transitions(from)
		.iter()
		.any(|rule| rule.next == to && (!rule.admin_only || is_admin))
}

/// Returns the label of the matching transition rule, if permitted.
pub(crate) fn transition_label(from: OrderStatus, to: OrderStatus) -> Option<&'static str> {
	allowed_transitions(from)
		.iter()
		.find(|rule| rule.next == to)
		.map(|rule| rule.label)
}
