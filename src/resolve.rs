//! Identifier resolution
//!
//! A command that names no project falls back, in order, to the configured
//! default project and then to the account inbox. The inbox lookup is lazy so
//! it only costs a request when the first two tiers are empty.

use crate::errors::{AppError, AppResult};
use tracing::debug;

/// Which tier supplied a resolved identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Explicit,
    Default,
    Inbox,
    Derived,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Explicit => "explicit",
            Source::Default => "default",
            Source::Inbox => "inbox",
            Source::Derived => "task",
        }
    }
}

/// A resolved identifier and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: String,
    pub source: Source,
}

/// Blank counts as absent; a non-blank value is kept verbatim
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve a project id: explicit, then default, then the inbox.
///
/// Explicit and default values are returned unchanged without checking that
/// they exist. `fetch_inbox` runs only when both are empty, and its failure is
/// reported as a resolution error.
pub fn resolve<F>(explicit: Option<&str>, default: Option<&str>, fetch_inbox: F) -> AppResult<Resolved>
where
    F: FnOnce() -> AppResult<String>,
{
    if let Some(id) = non_empty(explicit) {
        debug!(project_id = id, "using explicit project");
        return Ok(Resolved {
            id: id.to_string(),
            source: Source::Explicit,
        });
    }
    if let Some(id) = non_empty(default) {
        debug!(project_id = id, "using default project");
        return Ok(Resolved {
            id: id.to_string(),
            source: Source::Default,
        });
    }

    let inbox = fetch_inbox().map_err(|e| AppError::resolution_with_source("project", e))?;
    if inbox.trim().is_empty() {
        return Err(AppError::resolution(
            "project",
            "the account reported no inbox project",
        ));
    }
    debug!(project_id = %inbox, "using inbox project");
    Ok(Resolved {
        id: inbox,
        source: Source::Inbox,
    })
}

/// Resolve the project of an existing task.
///
/// An explicit project wins; otherwise the task record is fetched and its own
/// project is used.
pub fn resolve_task_project<F>(explicit: Option<&str>, task_id: &str, fetch_project: F) -> AppResult<Resolved>
where
    F: FnOnce(&str) -> AppResult<Option<String>>,
{
    if let Some(id) = non_empty(explicit) {
        return Ok(Resolved {
            id: id.to_string(),
            source: Source::Explicit,
        });
    }

    let target = format!("project for task {task_id}");
    match fetch_project(task_id) {
        Ok(Some(id)) if !id.trim().is_empty() => {
            debug!(task_id, project_id = %id, "derived project from task");
            Ok(Resolved {
                id,
                source: Source::Derived,
            })
        }
        Ok(_) => Err(AppError::resolution(
            target,
            "task not found or has no project; pass --project",
        )),
        Err(e) => Err(AppError::resolution_with_source(target, e)),
    }
}
