//! CLI execution context
//!
//! Holds the global flags and the loaded configuration so handlers don't
//! reach for process-wide state.

use crate::config::{ConfigManager, Settings};
use crate::errors::{AppError, AppResult, ErrorContextExt};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// CLI execution context containing shared dependencies and configuration
pub struct CliContext {
    pub verbose: bool,
    pub json: bool,
    pub assume_yes: bool,
    pub config_manager: ConfigManager,
}

impl CliContext {
    pub fn new(
        config_path: Option<PathBuf>,
        verbose: bool,
        json: bool,
        assume_yes: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            verbose,
            json,
            assume_yes,
            config_manager: ConfigManager::new(config_path)?,
        })
    }

    /// Effective settings (config file merged with the environment)
    pub fn settings(&self) -> AppResult<Settings> {
        self.config_manager.settings()
    }

    fn env_filter(&self) -> EnvFilter {
        let level = &self.config_manager.config().logging.level;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str()));
        if self.verbose {
            filter.add_directive(tracing::Level::DEBUG.into())
        } else {
            filter
        }
    }

    /// Initialize logging on stderr, plus a daily file when configured
    ///
    /// The returned guard must live until the process exits so buffered file
    /// lines are flushed.
    pub fn init_logging(&self) -> AppResult<Option<WorkerGuard>> {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        let (file_layer, guard) = match &self.config_manager.config().logging.file {
            Some(log_path) => {
                let dir = log_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                std::fs::create_dir_all(dir).in_file_operation(dir, "create log directory")?;
                let file_appender = tracing_appender::rolling::daily(
                    dir,
                    log_path
                        .file_name()
                        .unwrap_or_else(|| OsStr::new("ticktick.log")),
                );
                let (writer, guard) = tracing_appender::non_blocking(file_appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to initialize logging: {e}")))?;

        debug!(config = ?self.config_manager.config_path(), "logging initialized");
        Ok(guard)
    }
}
