//! Rendering of dispatch responses
//!
//! Payloads are redacted before either rendering mode sees them. JSON mode is
//! pretty-printed with non-ASCII kept as-is; text mode follows the response's
//! [`View`].

use crate::dispatch::present::{priority_label, status_label};
use crate::dispatch::{Response, View};
use crate::errors::{AppError, AppResult};
use chrono::DateTime;
use serde_json::{Map, Value};
use std::fmt::Write as _;

pub const REDACTED: &str = "[REDACTED]";

const SECRET_MARKERS: &[&str] = &[
    "token",
    "secret",
    "password",
    "passwd",
    "api_key",
    "apikey",
    "authorization",
    "cookie",
    "credential",
];

const TITLE_WIDTH: usize = 48;
const NAME_WIDTH: usize = 36;

/// Whether a field name looks like it holds a credential
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SECRET_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Copy of `value` with every credential-like field replaced, at any depth
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let inner = if is_secret_key(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(inner)
                    };
                    (key.clone(), inner)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Remove configured secret values from free text such as error messages
pub fn scrub(message: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|secret| !secret.trim().is_empty())
        .fold(message.to_string(), |text, secret| {
            text.replace(secret.as_str(), REDACTED)
        })
}

/// Render a response for stdout
pub fn render(response: &Response, json: bool) -> AppResult<String> {
    let payload = redact(&response.payload);
    if json {
        serde_json::to_string_pretty(&payload)
            .map_err(|e| AppError::json_with_source("render output", e))
    } else {
        Ok(render_text(&response.view, &payload))
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return value.chars().take(max).collect();
    }
    let mut short: String = value.chars().take(max - 3).collect();
    short.push_str("...");
    short
}

/// Aligned table with a dashed rule under the header
fn table(out: &mut String, headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    out.push_str(&line(headers.iter().map(|h| h.to_string()).collect()));
    out.push('\n');
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.clone()));
        out.push('\n');
    }
}

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => cell(other),
    }
}

/// Scalar rendering for table cells and detail lines
fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::String(s) if s.is_empty() => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(|i| !i.is_object() && !i.is_array()) => {
            if items.is_empty() {
                "-".to_string()
            } else {
                items.iter().map(cell).collect::<Vec<_>>().join(", ")
            }
        }
        other => other.to_string(),
    }
}

fn yes_no(value: &Value, key: &str) -> &'static str {
    if value.get(key).and_then(Value::as_bool).unwrap_or(false) {
        "yes"
    } else {
        "no"
    }
}

/// Local date-time column, or `-`
fn when(value: &Value, key: &str) -> String {
    match value.get(key).and_then(Value::as_str) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "-".to_string(),
    }
}

fn int(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn title_of(task: &Value) -> String {
    let title = text(task, "title");
    if title.is_empty() {
        "(no title)".to_string()
    } else {
        title
    }
}

fn items<'v>(payload: &'v Value, key: &str) -> &'v [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn task_table(out: &mut String, tasks: &[Value], title: &str, filters: &[String], show_project: bool) {
    let _ = writeln!(out, "{title} ({})", tasks.len());
    let _ = writeln!(out, "Filters: {}", filters.join(", "));
    if tasks.is_empty() {
        out.push_str("No tasks found.\n");
        return;
    }

    let mut headers = vec!["ID", "Title", "Due", "Priority", "Status"];
    if show_project {
        headers.insert(1, "Project");
    }
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|task| {
            let mut row = vec![
                text(task, "id"),
                truncate(&title_of(task), TITLE_WIDTH),
                when(task, "due_local"),
                priority_label(int(task, "priority")),
                status_label(int(task, "status")),
            ];
            if show_project {
                row.insert(1, text(task, "project_id"));
            }
            row
        })
        .collect();
    table(out, &headers, &rows);
}

fn task_details(out: &mut String, task: &Value) {
    out.push_str("Task\n");
    let _ = writeln!(out, "ID: {}", text(task, "id"));
    let _ = writeln!(out, "Project: {}", text(task, "project_id"));
    let _ = writeln!(out, "Title: {}", title_of(task));
    let _ = writeln!(out, "Status: {}", status_label(int(task, "status")));
    let _ = writeln!(out, "Priority: {}", priority_label(int(task, "priority")));
    let _ = writeln!(out, "Start: {}", when(task, "start_local"));
    let _ = writeln!(out, "Due: {}", when(task, "due_local"));
    let pinned = task.get("pinned_time").map_or(false, |p| !p.is_null());
    let _ = writeln!(out, "Pinned: {}", if pinned { "yes" } else { "no" });

    let tags = items(task, "tags");
    if !tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", cell(&Value::Array(tags.to_vec())));
    }
    for (key, label) in [("content", "Content"), ("description", "Description")] {
        let value = text(task, key);
        if !value.is_empty() {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
}

fn project_details(out: &mut String, project: &Value) {
    let or_dash = |key: &str| {
        let value = text(project, key);
        if value.is_empty() {
            "-".to_string()
        } else {
            value
        }
    };
    out.push_str("Project\n");
    let _ = writeln!(out, "ID: {}", text(project, "id"));
    let _ = writeln!(out, "Name: {}", text(project, "name"));
    let _ = writeln!(out, "Current: {}", yes_no(project, "is_current"));
    let _ = writeln!(out, "Kind: {}", text(project, "kind"));
    let _ = writeln!(out, "View: {}", text(project, "view_mode"));
    let _ = writeln!(out, "Color: {}", or_dash("color"));
    let _ = writeln!(out, "Folder ID: {}", or_dash("folder_id"));
    let _ = writeln!(out, "Closed: {}", yes_no(project, "closed"));
    let _ = writeln!(out, "Muted: {}", yes_no(project, "muted"));
    let _ = writeln!(out, "Permission: {}", or_dash("permission"));
}

fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Nested key/value lines, two spaces per level
fn document(out: &mut String, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) if map.is_empty() => {
            let _ = writeln!(out, "{indent}(empty)");
        }
        Value::Object(map) => {
            for (key, inner) in map {
                if inner.is_object() || inner.as_array().map_or(false, |a| a.iter().any(Value::is_object)) {
                    let _ = writeln!(out, "{indent}{key}:");
                    document(out, inner, depth + 1);
                } else {
                    let _ = writeln!(out, "{indent}{key}: {}", cell(inner));
                }
            }
        }
        Value::Array(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                if entry.is_object() || entry.is_array() {
                    let _ = writeln!(out, "{indent}- [{i}]");
                    document(out, entry, depth + 1);
                } else {
                    let _ = writeln!(out, "{indent}- {}", cell(entry));
                }
            }
        }
        scalar => {
            let _ = writeln!(out, "{indent}{}", cell(scalar));
        }
    }
}

fn entity_lines(out: &mut String, entity: &Map<String, Value>) {
    for (key, value) in entity {
        if value.is_object() {
            let _ = writeln!(out, "{}:", humanize(key));
            document(out, value, 1);
        } else {
            let _ = writeln!(out, "{}: {}", humanize(key), cell(value));
        }
    }
}

fn batch_lines(out: &mut String, verb: &str, payload: &Value) {
    let _ = writeln!(
        out,
        "{verb}: {} succeeded, {} failed",
        int(payload, "succeeded"),
        int(payload, "failed")
    );
    for result in items(payload, "results") {
        let index = int(result, "index");
        if result.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let ids = result
                .get("ids")
                .and_then(Value::as_object)
                .map(|ids| {
                    ids.iter()
                        .map(|(k, v)| format!("{k}={}", cell(v)))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            let _ = writeln!(out, "[{index}] ok {ids}");
        } else {
            let message = result
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let _ = writeln!(out, "[{index}] failed: {message}");
        }
    }
}

/// Text rendering of an already-redacted payload
pub fn render_text(view: &View, payload: &Value) -> String {
    let mut out = String::new();
    match view {
        View::Tasks {
            title,
            filters,
            show_project,
        } => task_table(&mut out, items(payload, "tasks"), title, filters, *show_project),
        View::Task { message } => {
            if let Some(message) = message {
                let _ = writeln!(out, "{message}");
            }
            task_details(&mut out, &payload["task"]);
        }
        View::TaskCreated => {
            let task = &payload["task"];
            out.push_str("Task created\n");
            let row = vec![
                text(task, "id"),
                title_of(task),
                when(task, "due_local"),
                priority_label(int(task, "priority")),
            ];
            table(&mut out, &["ID", "Title", "Due", "Priority"], &[row]);
        }
        View::Projects => {
            let projects = items(payload, "projects");
            let _ = writeln!(out, "Projects ({})", projects.len());
            if projects.is_empty() {
                out.push_str("No projects found.\n");
            } else {
                let rows: Vec<Vec<String>> = projects
                    .iter()
                    .map(|p| {
                        let kind = text(p, "kind");
                        let view = text(p, "view_mode");
                        vec![
                            if yes_no(p, "is_current") == "yes" { "*" } else { "" }.to_string(),
                            text(p, "id"),
                            truncate(&text(p, "name"), NAME_WIDTH),
                            if kind.is_empty() { "TASK".to_string() } else { kind },
                            if view.is_empty() { "list".to_string() } else { view },
                            yes_no(p, "closed").to_string(),
                        ]
                    })
                    .collect();
                table(
                    &mut out,
                    &["Current", "ID", "Name", "Kind", "View", "Closed"],
                    &rows,
                );
            }
        }
        View::Project { message } => {
            if let Some(message) = message {
                let _ = writeln!(out, "{message}");
            }
            project_details(&mut out, &payload["project"]);
        }
        View::ProjectData => {
            let data = &payload["data"];
            let project = &data["project"];
            let mut filters = Vec::new();
            if project.is_object() {
                project_details(&mut out, project);
                out.push('\n');
                filters.push(format!("project={}", text(project, "id")));
            }
            filters.push(format!("tz={}", text(payload, "timezone")));
            task_table(&mut out, items(data, "tasks"), "Project Tasks", &filters, false);

            let columns = items(data, "columns");
            let _ = writeln!(out, "\nColumns ({})", columns.len());
            if columns.is_empty() {
                out.push_str("No columns found.\n");
            } else {
                let rows: Vec<Vec<String>> = columns
                    .iter()
                    .map(|c| vec![text(c, "id"), text(c, "name"), text(c, "sort_order")])
                    .collect();
                table(&mut out, &["ID", "Name", "Sort"], &rows);
            }
        }
        View::Table {
            title,
            key,
            columns,
        } => {
            let rows = items(payload, key);
            let _ = writeln!(out, "{title}");
            if rows.is_empty() {
                let _ = writeln!(out, "No {} found.", key.replace('_', " "));
            } else {
                let headers: Vec<&str> = columns.iter().map(|(header, _)| *header).collect();
                let rows: Vec<Vec<String>> = rows
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|(_, field)| row.get(*field).map_or_else(|| "-".to_string(), cell))
                            .collect()
                    })
                    .collect();
                table(&mut out, &headers, &rows);
            }
        }
        View::Entity { message, key } => {
            if let Some(message) = message {
                let _ = writeln!(out, "{message}");
            }
            if let Some(entity) = payload.get(*key).and_then(Value::as_object) {
                entity_lines(&mut out, entity);
            }
        }
        View::Message(message) => {
            let _ = writeln!(out, "{message}");
        }
        View::Document { title, key } => {
            let _ = writeln!(out, "{title}");
            document(&mut out, payload.get(*key).unwrap_or(&Value::Null), 1);
        }
        View::Batch { verb } => batch_lines(&mut out, verb, payload),
    }
    out
}
