//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for the `casewatch-server`.
//! The handlers are split into sub-modules by the workflow they drive.

pub mod alerts;
pub mod case;
pub mod general;
pub mod monitor;

// Re-export all handlers so the router can reach them under a single `handlers::` path.
pub use alerts::*;
pub use case::*;
pub use general::*;
pub use monitor::*;

// Shared items used by multiple handler modules.
use super::{errors::AppError, state::AppState};
