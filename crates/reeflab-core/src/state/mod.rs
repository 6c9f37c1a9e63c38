//! Order state management.
//!
//! The transition table enumerates every legal status change and who
//! may request it; the state machine applies guarded transitions and
//! closure-based updates against the persisted store.

mod order;
mod transition;

pub use order::OrderStateMachine;
pub use transition::{allowed_transitions, is_transition_allowed, TransitionRule};
