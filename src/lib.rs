//! TickTick command-line client library
//!
//! Turns loosely specified commands (CLI flags or batch-file items) into
//! validated calls against the TickTick / Dida365 APIs: project resolution,
//! natural-language dates, per-action validation and redacted output.

pub mod api;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dates;
pub mod dispatch;
pub mod errors;
pub mod output;
pub mod resolve;

// Re-export commonly used types for convenience
pub use api::{HttpClient, TickTickApi};
pub use config::{Config, ConfigManager, Settings};
pub use dispatch::{Dispatcher, Domain, Params, Response, View};
pub use errors::{AppError, AppResult};
