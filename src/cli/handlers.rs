//! Command handlers for all CLI operations
//!
//! Parsing ends in an [`Invocation`]; this module confirms destructive work,
//! builds the API client, runs the dispatcher or the batch runner, and renders
//! the result.

use super::commands::{Commands, Invocation};
use super::CliContext;
use crate::api::oauth;
use crate::api::{HttpClient, TickTickApi};
use crate::batch::{self, BatchKind};
use crate::config::Settings;
use crate::dispatch::{rules, Dispatcher, Domain, Params};
use crate::errors::{AppError, AppResult};
use crate::output;
use dialoguer::{Confirm, Input};
use serde_json::Value;
use std::io::{self, BufRead, IsTerminal};
use std::path::Path;
use tracing::{debug, info, warn};

/// Rendered output and the exit status it should produce
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub output: String,
    pub exit_code: u8,
}

/// Coordinates command handling with dependency injection via CliContext
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CliContext {
        &self.context
    }

    /// Route a command and print its output; returns the exit status
    pub fn handle_command(&self, command: Commands) -> AppResult<u8> {
        let invocation = match command {
            Commands::Auth { manual } => return self.handle_auth(manual).map(|()| 0),
            Commands::Tasks { action } => action.into_invocation(),
            Commands::Projects { action } => action.into_invocation(),
            Commands::Folders { action } => action.into_invocation(),
            Commands::Columns { action } => action.into_invocation(),
            Commands::Tags { action } => action.into_invocation(),
            Commands::Habits { action } => action.into_invocation(),
            Commands::User { action } => action.into_invocation(),
            Commands::Focus { action } => action.into_invocation(),
            Commands::Sync => Invocation::Single {
                domain: Domain::Sync,
                action: "state",
                params: Params::new(),
            },
        };

        let settings = self.context.settings()?;
        let client = HttpClient::new(&settings)?;
        let outcome = self.run(&client, &settings, invocation)?;
        print!("{}", outcome.output);
        if !outcome.output.ends_with('\n') {
            println!();
        }
        Ok(outcome.exit_code)
    }

    /// Execute an invocation against any API implementation
    pub fn run<A: TickTickApi + ?Sized>(
        &self,
        api: &A,
        settings: &Settings,
        invocation: Invocation,
    ) -> AppResult<Outcome> {
        let dispatcher = Dispatcher::new(api, settings);
        match invocation {
            Invocation::Single {
                domain,
                action,
                params,
            } => {
                let rule = rules::rule_for(domain, action)?;
                if rule.destructive {
                    self.confirm(&describe(domain, rule.action, &params))?;
                }
                let response = dispatcher.dispatch(domain, action, &params)?;
                Ok(Outcome {
                    output: output::render(&response, self.context.json)?,
                    exit_code: 0,
                })
            }
            Invocation::Batch { kind, file } => {
                self.run_batch(&dispatcher, kind, &file, &settings.secret_values())
            }
        }
    }

    fn run_batch<A: TickTickApi + ?Sized>(
        &self,
        dispatcher: &Dispatcher<'_, A>,
        kind: BatchKind,
        file: &Path,
        secrets: &[String],
    ) -> AppResult<Outcome> {
        let items = batch::load_items(file)?;
        if kind.destructive() {
            self.confirm(&format!(
                "Run tasks {} with {} item(s) from {}?",
                kind.verb(),
                items.len(),
                file.display()
            ))?;
        }
        let report = batch::run_batch(dispatcher, kind, items, secrets);
        let exit_code = report.exit_code();
        if exit_code != 0 {
            warn!(
                failed = report.failed(),
                total = report.results.len(),
                "batch finished with failures"
            );
        }
        Ok(Outcome {
            output: output::render(&report.into_response(), self.context.json)?,
            exit_code,
        })
    }

    /// Ask before destructive work; non-interactive runs need `--yes`
    fn confirm(&self, prompt: &str) -> AppResult<()> {
        if self.context.assume_yes {
            debug!("destructive action confirmed by --yes");
            return Ok(());
        }
        if !io::stdin().is_terminal() {
            return Err(AppError::validation(
                "Destructive action needs confirmation. Re-run with --yes.",
            ));
        }
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        if confirmed {
            Ok(())
        } else {
            Err(AppError::validation("Aborted."))
        }
    }

    /// OAuth2 authorization-code flow; always renders text
    fn handle_auth(&self, manual: bool) -> AppResult<()> {
        let settings = self.context.settings()?;
        let state = oauth::new_state();
        let url = oauth::authorization_url(&settings, &state)?;

        println!("Open this URL to authorize ticktick-cli:\n\n  {url}\n");
        if !manual {
            match open::that(url.as_str()) {
                Ok(()) => info!("opened browser for authorization"),
                Err(e) => warn!("could not open a browser: {e}"),
            }
        }

        let pasted = if io::stdin().is_terminal() {
            Input::<String>::new()
                .with_prompt("Paste the redirected URL (or just the code)")
                .interact_text()?
        } else {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line
        };

        let code = oauth::parse_callback(&pasted, &state)?;
        let token = oauth::exchange_code(&settings, &code)?;

        println!("\nAccess token obtained.\n");
        println!("  export TICKTICK_ACCESS_TOKEN={}", token.access_token);
        if let Some(expires_in) = token.expires_in {
            println!("\nThe token expires in {} days.", expires_in / 86_400);
        }
        println!("\nSet it in your shell or under [api] access_token in the config file.");
        Ok(())
    }
}

/// Prompt text naming the action and the identifiers it will touch
fn describe(domain: Domain, action: &str, params: &Params) -> String {
    let targets: Vec<String> = params
        .as_map()
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some(format!("{key}={s}")),
            _ => None,
        })
        .collect();
    if targets.is_empty() {
        format!("Run {} {action}?", domain.as_str())
    } else {
        format!("Run {} {action} ({})?", domain.as_str(), targets.join(", "))
    }
}
