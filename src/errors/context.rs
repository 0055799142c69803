//! Error context enhancement utilities
//!
//! Attaches the operation (and, for file work, the path) to foreign errors so
//! messages read "read batch file in file 'x.json': ..." instead of a bare
//! `No such file or directory`.

use super::types::AppError;
use std::path::PathBuf;

/// Extension trait for adding context to error types
pub trait ErrorContextExt<T> {
    /// Add operation and file context
    fn in_file_operation(
        self,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Result<T, AppError>;
}

impl<T, E> ErrorContextExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn in_file_operation(
        self,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Result<T, AppError> {
        self.map_err(|e| AppError::io_with_source(path, operation, e))
    }
}
