//! Common types module for the reeflab portal backend.
//!
//! This module defines the core data types and structures shared across
//! the portal services. It provides a centralized location for domain
//! types to ensure consistency across all components.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Caller identity established by the authentication verifier.
pub mod auth;
/// Order and sample types tracked through the lab workflow.
pub mod order;
/// Storage collection names for persistent data.
pub mod storage;
/// Types mirrored from or queued for the external lab system.
pub mod sync;

// Re-export all types for convenient access
pub use api::*;
pub use auth::*;
pub use order::*;
pub use storage::*;
pub use sync::*;
