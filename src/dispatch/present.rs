//! JSON projections of API entities
//!
//! These shapes are the stable output contract: snake_case keys, labels next
//! to numeric codes, and dates both as stored and in the active zone.

use crate::api::{Column, Folder, Habit, Project, ProjectData, Tag, Task};
use crate::dates::{parse_api_datetime, Zone};
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde_json::{json, Value};
use std::cmp::Ordering;

pub fn priority_label(priority: i64) -> String {
    match priority {
        0 => "none".to_string(),
        1 => "low".to_string(),
        3 => "medium".to_string(),
        5 => "high".to_string(),
        other => other.to_string(),
    }
}

pub fn status_label(status: i64) -> String {
    match status {
        -1 => "abandoned".to_string(),
        0 => "active".to_string(),
        1 | 2 => "completed".to_string(),
        other => format!("unknown({other})"),
    }
}

/// Accept `none|low|medium|high` or `0|1|3|5`
pub fn parse_priority(raw: &str) -> AppResult<i64> {
    let normalized = raw.trim().to_lowercase();
    let value = match normalized.as_str() {
        "none" => Some(0),
        "low" => Some(1),
        "medium" => Some(3),
        "high" => Some(5),
        other => other.parse::<i64>().ok().filter(|p| matches!(p, 0 | 1 | 3 | 5)),
    };
    value.ok_or_else(|| {
        AppError::validation(format!(
            "Invalid priority '{raw}'. Use none/low/medium/high or 0/1/3/5."
        ))
    })
}

/// Upper-cased value if it is one of `allowed`
pub fn parse_choice(field: &str, raw: &str, allowed: &[&str]) -> AppResult<String> {
    let upper = raw.trim().to_uppercase();
    allowed
        .iter()
        .find(|choice| choice.to_uppercase() == upper)
        .map(|choice| choice.to_string())
        .ok_or_else(|| {
            AppError::validation(format!(
                "Invalid {field} '{raw}'. Use one of: {}.",
                allowed.join(", ")
            ))
        })
}

fn instant(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    raw.and_then(parse_api_datetime)
}

fn rfc3339(value: DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Due instant of a task, if it has a parseable one
pub fn task_due(task: &Task) -> Option<DateTime<FixedOffset>> {
    instant(task.due_date.as_deref())
}

fn date_pair(raw: Option<&str>, zone: &Zone) -> (Value, Value) {
    match (raw, instant(raw)) {
        (_, Some(at)) => (json!(rfc3339(at)), json!(rfc3339(zone.convert(at)))),
        (Some(raw), None) => (json!(raw), Value::Null),
        (None, None) => (Value::Null, Value::Null),
    }
}

pub fn task_to_json(task: &Task, zone: &Zone) -> Value {
    let (start_date, start_local) = date_pair(task.start_date.as_deref(), zone);
    let (due_date, due_local) = date_pair(task.due_date.as_deref(), zone);
    let pinned = match (task.pinned_time.as_deref(), instant(task.pinned_time.as_deref())) {
        (_, Some(at)) => json!(rfc3339(at)),
        (Some(raw), None) => json!(raw),
        (None, None) => Value::Null,
    };
    json!({
        "id": task.id,
        "project_id": task.project_id,
        "title": task.title,
        "content": task.content,
        "description": task.desc,
        "kind": task.kind,
        "status": task.status,
        "status_label": status_label(task.status),
        "priority": task.priority,
        "priority_label": priority_label(task.priority),
        "start_date": start_date,
        "start_local": start_local,
        "due_date": due_date,
        "due_local": due_local,
        "tags": task.tags,
        "parent_id": task.parent_id,
        "column_id": task.column_id,
        "time_zone": task.time_zone,
        "pinned_time": pinned,
        "is_all_day": task.is_all_day,
    })
}

/// No-due last, earliest due first, higher priority first, then title
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    let due_a = task_due(a);
    let due_b = task_due(b);
    due_a
        .is_none()
        .cmp(&due_b.is_none())
        .then_with(|| due_a.cmp(&due_b))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
}

pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

pub fn tasks_to_json(tasks: &[Task], zone: &Zone) -> Vec<Value> {
    tasks.iter().map(|t| task_to_json(t, zone)).collect()
}

pub fn project_to_json(project: &Project, current_project_id: Option<&str>) -> Value {
    json!({
        "id": project.id,
        "name": project.name,
        "color": project.color,
        "folder_id": project.group_id,
        "kind": project.kind,
        "view_mode": project.view_mode,
        "sort_order": project.sort_order,
        "closed": project.closed.unwrap_or(false),
        "muted": project.muted.unwrap_or(false),
        "permission": project.permission,
        "is_current": current_project_id == Some(project.id.as_str()),
    })
}

pub fn column_to_json(column: &Column) -> Value {
    json!({
        "id": column.id,
        "project_id": column.project_id,
        "name": column.name,
        "sort_order": column.sort_order,
        "created_time": column.created_time,
        "modified_time": column.modified_time,
    })
}

pub fn project_data_to_json(data: &ProjectData, current_project_id: Option<&str>, zone: &Zone) -> Value {
    let mut tasks = data.tasks.clone();
    sort_tasks(&mut tasks);
    json!({
        "project": data.project.as_ref().map(|p| project_to_json(p, current_project_id)),
        "task_count": tasks.len(),
        "column_count": data.columns.len(),
        "tasks": tasks_to_json(&tasks, zone),
        "columns": data.columns.iter().map(column_to_json).collect::<Vec<_>>(),
    })
}

pub fn folder_to_json(folder: &Folder) -> Value {
    json!({"id": folder.id, "name": folder.name})
}

pub fn tag_to_json(tag: &Tag) -> Value {
    json!({
        "name": tag.name,
        "label": tag.label.clone().unwrap_or_else(|| tag.name.clone()),
        "color": tag.color,
        "parent": tag.parent,
    })
}

pub fn habit_status_label(status: i64) -> &'static str {
    match status {
        1 => "archived",
        _ => "active",
    }
}

pub fn habit_to_json(habit: &Habit) -> Value {
    json!({
        "id": habit.id,
        "name": habit.name,
        "type": habit.habit_type,
        "goal": habit.goal,
        "step": habit.step,
        "unit": habit.unit,
        "target_days": habit.target_days,
        "encouragement": habit.encouragement,
        "section_id": habit.section_id,
        "color": habit.color,
        "status": habit.status,
        "status_label": habit_status_label(habit.status),
        "total_check_ins": habit.total_check_ins,
    })
}
