//! Batch files
//!
//! A batch file is a JSON array. Each item is either a positional tuple or a
//! field-named object; both become [`Params`] before dispatch. Items run in
//! order and a failed item never stops the ones after it.

use crate::api::TickTickApi;
use crate::dispatch::{Dispatcher, Domain, Params, Response, View};
use crate::errors::{AppError, AppResult};
use crate::output;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Exit status when at least one item failed
pub const PARTIAL_FAILURE_EXIT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Create,
    Update,
    Delete,
    Done,
    Move,
    Parent,
    Unparent,
    Pin,
    HabitCheckin,
}

impl BatchKind {
    pub const fn domain(&self) -> Domain {
        match self {
            BatchKind::HabitCheckin => Domain::Habits,
            _ => Domain::Tasks,
        }
    }

    pub const fn verb(&self) -> &'static str {
        match self {
            BatchKind::Create => "batch-create",
            BatchKind::Update => "batch-update",
            BatchKind::Delete => "batch-delete",
            BatchKind::Done => "batch-done",
            BatchKind::Move => "batch-move",
            BatchKind::Parent => "batch-parent",
            BatchKind::Unparent => "batch-unparent",
            BatchKind::Pin => "batch-pin",
            BatchKind::HabitCheckin => "batch-checkin",
        }
    }

    /// Action each item is dispatched as (pin items may turn into `unpin`)
    pub const fn action(&self) -> &'static str {
        match self {
            BatchKind::Create => "add",
            BatchKind::Update => "update",
            BatchKind::Delete => "delete",
            BatchKind::Done => "done",
            BatchKind::Move => "move",
            BatchKind::Parent => "subtask",
            BatchKind::Unparent => "unparent",
            BatchKind::Pin => "pin",
            BatchKind::HabitCheckin => "checkin",
        }
    }

    pub const fn destructive(&self) -> bool {
        matches!(self, BatchKind::Delete)
    }

    /// Field names for positional items; empty when only objects are accepted
    const fn positional(&self) -> &'static [&'static str] {
        match self {
            BatchKind::Create | BatchKind::Update => &[],
            BatchKind::Delete | BatchKind::Done | BatchKind::Unparent => &["task_id", "project"],
            BatchKind::Move => &["task_id", "from_project", "to_project"],
            BatchKind::Parent => &["task_id", "parent", "project"],
            BatchKind::Pin => &["task_id", "project", "pin"],
            BatchKind::HabitCheckin => &["habit_id", "value", "date"],
        }
    }
}

/// One item as written in the file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

/// Object keys accepted as spellings of dispatcher fields
fn canonical_key(key: &str) -> &str {
    match key {
        "project_id" => "project",
        "parent_id" => "parent",
        "from_project_id" => "from_project",
        "to_project_id" => "to_project",
        "checkin_date" => "date",
        other => other,
    }
}

fn positional_label(kind: BatchKind) -> String {
    kind.positional()
        .iter()
        .map(|field| match *field {
            "project" | "from_project" | "to_project" | "parent" => format!("{field}_id"),
            "date" => "checkin_date".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl BatchItem {
    /// Normalize to the action to run and its parameters
    pub fn into_params(self, kind: BatchKind) -> AppResult<(&'static str, Params)> {
        let mut map = Map::new();
        match self {
            BatchItem::Named(object) => {
                for (key, value) in object {
                    let field = canonical_key(&key);
                    if map.contains_key(field) {
                        return Err(AppError::validation(format!(
                            "Item sets '{field}' more than once (also as '{key}')."
                        )));
                    }
                    map.insert(field.to_string(), value);
                }
            }
            BatchItem::Positional(values) => {
                let fields = kind.positional();
                if fields.is_empty() {
                    return Err(AppError::validation(format!(
                        "{} items must be objects.",
                        kind.verb()
                    )));
                }
                if values.len() > fields.len() {
                    return Err(AppError::validation(format!(
                        "Item has {} values; {} takes at most {} ({}).",
                        values.len(),
                        kind.verb(),
                        fields.len(),
                        positional_label(kind)
                    )));
                }
                for (field, value) in fields.iter().zip(values) {
                    if !value.is_null() {
                        map.insert(field.to_string(), value);
                    }
                }
            }
        }

        let mut action = kind.action();
        if kind == BatchKind::Pin {
            match map.remove("pin") {
                None | Some(Value::Null) | Some(Value::Bool(true)) => {}
                Some(Value::Bool(false)) => action = "unpin",
                Some(other) => {
                    return Err(AppError::validation(format!(
                        "Field 'pin' must be true or false, got {other}."
                    )))
                }
            }
        }
        Ok((action, Params::from_map(map)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    pub category: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub success: bool,
    /// Identifiers the item resolved to and acted on
    pub ids: Map<String, Value>,
    pub error: Option<ItemError>,
    pub result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len() - self.failed()
    }

    pub fn exit_code(&self) -> u8 {
        if self.failed() > 0 {
            PARTIAL_FAILURE_EXIT
        } else {
            0
        }
    }

    pub fn into_response(self) -> Response {
        let payload = json!({
            "verb": self.kind.verb(),
            "total": self.results.len(),
            "succeeded": self.succeeded(),
            "failed": self.failed(),
            "results": self.results,
        });
        Response::new(
            payload,
            View::Batch {
                verb: self.kind.verb(),
            },
        )
    }
}

/// Read the item array from a batch file
pub fn load_items(path: &Path) -> AppResult<Vec<Value>> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            AppError::validation(format!("Batch file not found: {}", path.display()))
        }
        _ => AppError::io_with_source(path, "read batch file", e),
    })?;
    let document: Value = serde_json::from_str(&text).map_err(|e| {
        AppError::validation(format!("Batch file {} is not valid JSON: {e}", path.display()))
    })?;
    match document {
        Value::Array(items) => Ok(items),
        _ => Err(AppError::validation(format!(
            "Batch file {} must contain a JSON array.",
            path.display()
        ))),
    }
}

/// Identifiers worth echoing back from a dispatch payload
fn resolved_ids(payload: &Value) -> Map<String, Value> {
    let mut ids = Map::new();
    let Some(object) = payload.as_object() else {
        return ids;
    };
    for (key, value) in object {
        if key.ends_with("_id") && value.is_string() {
            ids.insert(key.clone(), value.clone());
        }
    }
    for (entity, id_key) in [("task", "task_id"), ("habit", "habit_id")] {
        if let Some(record) = object.get(entity) {
            if let Some(id) = record.get("id").filter(|v| v.is_string()) {
                ids.entry(id_key).or_insert_with(|| id.clone());
            }
            if let Some(project) = record.get("project_id").filter(|v| v.is_string()) {
                ids.entry("project_id").or_insert_with(|| project.clone());
            }
        }
    }
    ids
}

fn run_item<A: TickTickApi + ?Sized>(
    dispatcher: &Dispatcher<'_, A>,
    kind: BatchKind,
    item: Value,
) -> AppResult<Response> {
    let item: BatchItem = serde_json::from_value(item)
        .map_err(|_| AppError::validation("Item must be a JSON array or object."))?;
    let (action, params) = item.into_params(kind)?;
    dispatcher.dispatch(kind.domain(), action, &params)
}

/// Dispatch every item in order, capturing failures per item
///
/// Item error messages are scrubbed of `secrets` before they are logged or
/// stored.
pub fn run_batch<A: TickTickApi + ?Sized>(
    dispatcher: &Dispatcher<'_, A>,
    kind: BatchKind,
    items: Vec<Value>,
    secrets: &[String],
) -> BatchReport {
    info!(verb = kind.verb(), items = items.len(), "running batch");
    let results = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match run_item(dispatcher, kind, item) {
            Ok(response) => BatchItemResult {
                index,
                success: true,
                ids: resolved_ids(&response.payload),
                error: None,
                result: Some(response.payload),
            },
            Err(e) => {
                let message = output::scrub(&e.to_string(), secrets);
                warn!(verb = kind.verb(), index, "batch item failed: {message}");
                BatchItemResult {
                    index,
                    success: false,
                    ids: Map::new(),
                    error: Some(ItemError {
                        category: e.category(),
                        message,
                    }),
                    result: None,
                }
            }
        })
        .collect();
    BatchReport { kind, results }
}
