//! Centralized error handling module
//!
//! One typed error enum for the whole client, plus context helpers for
//! attaching file paths and operations to lower-level failures.

pub mod context;
pub mod types;

pub use context::ErrorContextExt;
pub use types::{AppError, AppResult};
