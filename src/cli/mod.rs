//! CLI module providing command-line interface functionality
//!
//! Handles argument parsing, logging setup and error reporting, then routes
//! to [`CommandHandler`].

pub mod commands;
pub mod context;
pub mod handlers;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;

pub use commands::{Cli, Commands, Invocation};
pub use context::CliContext;
pub use handlers::{CommandHandler, Outcome};

use crate::errors::AppError;
use crate::output;

/// Exit status after Ctrl-C
pub const INTERRUPTED_EXIT: i32 = 130;

/// Main CLI application
pub struct CliApp;

impl CliApp {
    /// Parse arguments, run the command and map the result to an exit code
    pub fn run() -> ExitCode {
        let cli = Cli::parse();

        let context = match CliContext::new(cli.config.clone(), cli.verbose, cli.json, cli.yes) {
            Ok(context) => context,
            Err(e) => return report(&e, &[]),
        };
        let _log_guard = match context.init_logging() {
            Ok(guard) => guard,
            Err(e) => return report(&e, &[]),
        };

        let secrets = context
            .settings()
            .map(|settings| settings.secret_values())
            .unwrap_or_default();
        let handler = CommandHandler::new(context);
        match handler.handle_command(cli.command) {
            Ok(code) => ExitCode::from(code),
            Err(e) => report(&e, &secrets),
        }
    }
}

/// Print a scrubbed error to stderr and pick the exit status
fn report(err: &AppError, secrets: &[String]) -> ExitCode {
    let message = output::scrub(&err.to_string(), secrets);
    error!(category = err.category(), "command failed");
    eprintln!("Error: {message}");
    ExitCode::from(err.exit_code())
}
