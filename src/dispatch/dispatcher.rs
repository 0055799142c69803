use super::params::Params;
use super::present::{
    column_to_json, folder_to_json, habit_to_json, parse_choice, parse_priority, priority_label,
    project_data_to_json, project_to_json, sort_tasks, tag_to_json, task_due, task_to_json,
    tasks_to_json,
};
use super::rules;
use super::{Domain, Response, View};
use crate::api::types::{STATUS_ABANDONED, STATUS_ACTIVE};
use crate::api::{Checkin, ClosedKind, Column, Habit, Project, Tag, Task, TickTickApi};
use crate::config::Settings;
use crate::dates::{self, date_stamp, format_api, NormalizedDate, Zone};
use crate::errors::{AppError, AppResult};
use crate::resolve::{resolve, resolve_task_project};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::unsync::OnceCell;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

const TASK_KINDS: &[&str] = &["TEXT", "NOTE", "CHECKLIST"];
const PROJECT_KINDS: &[&str] = &["TASK", "NOTE"];
const VIEW_MODES: &[&str] = &["list", "kanban", "timeline"];
const HABIT_TYPES: &[&str] = &["Boolean", "Real"];

const DEFAULT_WINDOW_DAYS: i64 = 7;
const DEFAULT_LIMIT: i64 = 100;

/// Maps validated commands onto API calls
///
/// Each dispatch validates first, then resolves identifiers and dates, then
/// issues at most one mutating call. Lookups needed for resolution (the task
/// record, the inbox id) are the only extra requests.
pub struct Dispatcher<'a, A: TickTickApi + ?Sized> {
    api: &'a A,
    settings: &'a Settings,
    now: DateTime<Utc>,
    zone: OnceCell<Zone>,
}

fn lifecycle(action: &str, ids: Value) -> Value {
    let mut payload = Map::new();
    payload.insert("success".into(), Value::Bool(true));
    payload.insert("action".into(), json!(action));
    if let Value::Object(ids) = ids {
        payload.extend(ids);
    }
    Value::Object(payload)
}

/// Span of `days` days, rejecting counts chrono cannot represent
fn window(days: i64) -> AppResult<Duration> {
    Duration::try_days(days)
        .filter(|span| *span < Duration::days(365 * 1000))
        .ok_or_else(|| AppError::validation(format!("Field 'days' is out of range, got {days}.")))
}

fn not_found(what: &str, id: &str) -> AppError {
    AppError::resolution(format!("{what} {id}"), format!("no {what} with this id"))
}

fn table(title: String, key: &'static str, columns: &[(&'static str, &'static str)]) -> View {
    View::Table {
        title,
        key,
        columns: columns.to_vec(),
    }
}

fn entity(message: Option<String>, key: &'static str) -> View {
    View::Entity { message, key }
}

fn document(title: &str, key: &'static str) -> View {
    View::Document {
        title: title.to_string(),
        key,
    }
}

fn filter_by_project(tasks: Vec<Task>, project_id: Option<&str>) -> Vec<Task> {
    match project_id {
        Some(id) => tasks.into_iter().filter(|t| t.project_id == id).collect(),
        None => tasks,
    }
}

impl<'a, A: TickTickApi + ?Sized> Dispatcher<'a, A> {
    pub fn new(api: &'a A, settings: &'a Settings) -> Self {
        Self {
            api,
            settings,
            now: Utc::now(),
            zone: OnceCell::new(),
        }
    }

    /// Pin the clock used for relative dates and time windows
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn dispatch(&self, domain: Domain, action: &str, params: &Params) -> AppResult<Response> {
        let rule = rules::rule_for(domain, action)?;
        rules::validate(rule, params)?;
        debug!(domain = domain.as_str(), action = rule.action, "dispatching");

        match domain {
            Domain::Tasks => self.tasks(rule.action, params),
            Domain::Projects => self.projects(rule.action, params),
            Domain::Folders => self.folders(rule.action, params),
            Domain::Columns => self.columns(rule.action, params),
            Domain::Tags => self.tags(rule.action, params),
            Domain::Habits => self.habits(rule.action, params),
            Domain::User => self.user(rule.action),
            Domain::Focus => self.focus(rule.action, params),
            Domain::Sync => Ok(Response::new(
                json!({"success": true, "sync": self.api.sync_state()?}),
                document("Sync state", "sync"),
            )),
        }
    }

    /// Timezone, validated on first use
    fn zone(&self) -> AppResult<&Zone> {
        self.zone.get_or_try_init(|| self.settings.zone())
    }

    fn timezone_label(&self) -> AppResult<String> {
        Ok(self.zone()?.display_name())
    }

    fn normalize(&self, raw: &str) -> AppResult<NormalizedDate> {
        dates::normalize_at(raw, self.zone()?, self.now)
    }

    fn date_param(&self, params: &Params, key: &str) -> AppResult<Option<NormalizedDate>> {
        params
            .string(key)?
            .map(|raw| self.normalize(&raw))
            .transpose()
    }

    fn today(&self) -> AppResult<NaiveDate> {
        Ok(self.zone()?.today(self.now))
    }

    /// Project for commands that create or list within a project
    fn project(&self, params: &Params) -> AppResult<String> {
        let explicit = params.string("project")?;
        resolve(
            explicit.as_deref(),
            self.settings.current_project_id.as_deref(),
            || self.api.inbox_id(),
        )
        .map(|resolved| resolved.id)
    }

    /// Default project for `is_current` markers; unavailable is not an error
    fn current_project(&self) -> Option<String> {
        match resolve(None, self.settings.current_project_id.as_deref(), || {
            self.api.inbox_id()
        }) {
            Ok(resolved) => Some(resolved.id),
            Err(e) => {
                debug!("current project unavailable: {e}");
                None
            }
        }
    }

    /// Project of an existing task, without keeping the record
    fn task_project(&self, task_id: &str, explicit: Option<&str>) -> AppResult<String> {
        resolve_task_project(explicit, task_id, |id| {
            Ok(self.api.get_task(id, None)?.map(|t| t.project_id))
        })
        .map(|resolved| resolved.id)
    }

    /// Fetch a task for read-modify-write
    fn load_task(&self, task_id: &str, explicit: Option<&str>) -> AppResult<Task> {
        let explicit = explicit.filter(|p| !p.trim().is_empty());
        let mut task = self
            .api
            .get_task(task_id, explicit)?
            .ok_or_else(|| not_found("task", task_id))?;
        if let Some(project_id) = explicit {
            task.project_id = project_id.to_string();
        }
        if task.project_id.is_empty() {
            return Err(AppError::resolution(
                format!("project for task {task_id}"),
                "task has no project; pass --project",
            ));
        }
        Ok(task)
    }

    fn time_zone_param(&self, params: &Params) -> AppResult<Option<String>> {
        match params.string("time_zone")? {
            Some(name) => {
                Zone::from_name(Some(name.as_str()))?;
                Ok(Some(name.trim().to_string()))
            }
            None => Ok(None),
        }
    }

    fn task_list(
        &self,
        tasks: Vec<Task>,
        project_id: Option<&str>,
        mut head: Map<String, Value>,
        title: String,
        mut filters: Vec<String>,
    ) -> AppResult<Response> {
        let mut tasks = filter_by_project(tasks, project_id);
        sort_tasks(&mut tasks);

        let mut payload = Map::new();
        payload.insert("count".into(), json!(tasks.len()));
        payload.insert("project_id".into(), json!(project_id));
        payload.append(&mut head);
        let timezone = self.timezone_label()?;
        payload.insert("timezone".into(), json!(timezone));
        payload.insert("tasks".into(), json!(tasks_to_json(&tasks, self.zone()?)));

        if let Some(id) = project_id {
            filters.insert(0, format!("project={id}"));
        }
        filters.push(format!("tz={timezone}"));

        Ok(Response::new(
            Value::Object(payload),
            View::Tasks {
                title,
                filters,
                show_project: project_id.is_none(),
            },
        ))
    }

    fn task_response(
        &self,
        task: &Task,
        action: Option<&str>,
        message: Option<String>,
    ) -> AppResult<Response> {
        let mut payload = Map::new();
        payload.insert("success".into(), Value::Bool(true));
        if let Some(action) = action {
            payload.insert("action".into(), json!(action));
        }
        payload.insert("task".into(), task_to_json(task, self.zone()?));
        Ok(Response::new(Value::Object(payload), View::Task { message }))
    }

    fn tasks(&self, action: &str, params: &Params) -> AppResult<Response> {
        match action {
            "list" => {
                let due = self.date_param(params, "due")?.map(|d| d.date());
                let project_id = self.project(params)?;
                let zone = self.zone()?;
                let tasks: Vec<Task> = self
                    .api
                    .list_tasks()?
                    .into_iter()
                    .filter(|t| match due {
                        Some(day) => task_due(t).map(|d| zone.convert(d).date_naive()) == Some(day),
                        None => true,
                    })
                    .collect();
                let due_label = due.map(|d| d.format("%Y-%m-%d").to_string());
                let mut head = Map::new();
                head.insert("filters".into(), json!({"due": due_label.clone()}));
                let filters = due_label.iter().map(|d| format!("due={d}")).collect();
                self.task_list(tasks, Some(&project_id), head, "Tasks".into(), filters)
            }
            "get" => {
                let task_id = params.required("task_id")?;
                let project = params.string("project")?;
                let task = self
                    .api
                    .get_task(&task_id, project.as_deref())?
                    .ok_or_else(|| not_found("task", &task_id))?;
                self.task_response(&task, None, None)
            }
            "add" => self.add_task(params),
            "quick-add" => {
                let text = params.required("text")?;
                let project_id = self.project(params)?;
                let task = Task {
                    project_id,
                    title: text,
                    ..Task::default()
                };
                info!(project_id = %task.project_id, "creating task");
                let created = self.api.create_task(&task)?;
                Ok(Response::new(
                    json!({"success": true, "task": task_to_json(&created, self.zone()?)}),
                    View::TaskCreated,
                ))
            }
            "update" => self.update_task(params),
            "done" => {
                let task_id = params.required("task_id")?;
                let project_id = self.task_project(&task_id, params.string("project")?.as_deref())?;
                info!(task_id = %task_id, project_id = %project_id, "completing task");
                self.api.complete_task(&project_id, &task_id)?;
                Ok(Response::new(
                    lifecycle("done", json!({"task_id": task_id, "project_id": project_id})),
                    View::Message(format!("Task {task_id} marked as completed.")),
                ))
            }
            "abandon" => {
                let task_id = params.required("task_id")?;
                let mut task = self.load_task(&task_id, params.string("project")?.as_deref())?;
                task.status = STATUS_ABANDONED;
                task.completed_time = Some(format_api(self.now.fixed_offset()));
                info!(task_id = %task_id, "abandoning task");
                self.api.update_task(&task)?;
                Ok(Response::new(
                    lifecycle(
                        "abandon",
                        json!({"task_id": task_id, "project_id": task.project_id}),
                    ),
                    View::Message(format!("Task {task_id} marked as abandoned (won't do).")),
                ))
            }
            "delete" => {
                let task_id = params.required("task_id")?;
                let project_id = self.task_project(&task_id, params.string("project")?.as_deref())?;
                info!(task_id = %task_id, project_id = %project_id, "deleting task");
                self.api.delete_task(&project_id, &task_id)?;
                Ok(Response::new(
                    lifecycle("delete", json!({"task_id": task_id, "project_id": project_id})),
                    View::Message(format!("Task {task_id} deleted.")),
                ))
            }
            "move" => {
                let task_id = params.required("task_id")?;
                let to_project = params.required("to_project")?;
                let from_project =
                    self.task_project(&task_id, params.string("from_project")?.as_deref())?;
                info!(task_id = %task_id, from = %from_project, to = %to_project, "moving task");
                self.api.move_task(&task_id, &from_project, &to_project)?;
                Ok(Response::new(
                    lifecycle(
                        "move",
                        json!({
                            "task_id": task_id,
                            "from_project_id": from_project,
                            "to_project_id": to_project,
                        }),
                    ),
                    View::Message(format!(
                        "Task {task_id} moved from {from_project} to {to_project}."
                    )),
                ))
            }
            "subtask" => {
                let task_id = params.required("task_id")?;
                let parent_id = params.required("parent")?;
                let project_id = self.task_project(&task_id, params.string("project")?.as_deref())?;
                info!(task_id = %task_id, parent_id = %parent_id, "setting task parent");
                self.api.set_task_parent(&task_id, &parent_id, &project_id)?;
                Ok(Response::new(
                    lifecycle(
                        "subtask",
                        json!({"task_id": task_id, "project_id": project_id, "parent_id": parent_id}),
                    ),
                    View::Message(format!("Task {task_id} is now a subtask of {parent_id}.")),
                ))
            }
            "unparent" => {
                let task_id = params.required("task_id")?;
                let task = self.load_task(&task_id, params.string("project")?.as_deref())?;
                let parent_id = task
                    .parent_id
                    .clone()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| {
                        AppError::resolution(format!("parent of task {task_id}"), "task is not a subtask")
                    })?;
                info!(task_id = %task_id, "removing task parent");
                self.api
                    .unset_task_parent(&task_id, &parent_id, &task.project_id)?;
                Ok(Response::new(
                    lifecycle(
                        "unparent",
                        json!({"task_id": task_id, "project_id": task.project_id}),
                    ),
                    View::Message(format!("Task {task_id} moved to top level.")),
                ))
            }
            "pin" | "unpin" => {
                let task_id = params.required("task_id")?;
                let mut task = self.load_task(&task_id, params.string("project")?.as_deref())?;
                task.pinned_time = if action == "pin" {
                    Some(format_api(self.now.fixed_offset()))
                } else {
                    None
                };
                info!(task_id = %task_id, action, "updating pin");
                let updated = self.api.update_task(&task)?;
                let verb = if action == "pin" { "pinned" } else { "unpinned" };
                self.task_response(&updated, Some(action), Some(format!("Task {task_id} {verb}.")))
            }
            "column" => {
                let task_id = params.required("task_id")?;
                let column_id = params.string("column")?.filter(|c| !c.trim().is_empty());
                let mut task = self.load_task(&task_id, params.string("project")?.as_deref())?;
                task.column_id = column_id.clone();
                info!(task_id = %task_id, column = ?column_id, "moving task to column");
                let updated = self.api.update_task(&task)?;
                let message = match column_id {
                    Some(column) => format!("Task {task_id} moved to column {column}."),
                    None => format!("Task {task_id} removed from column."),
                };
                self.task_response(&updated, Some("column"), Some(message))
            }
            "search" => {
                let query = params.required("query")?;
                let project = params.string("project")?;
                let needle = query.to_lowercase();
                let contains = |text: &Option<String>| {
                    text.as_deref()
                        .map(|t| t.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                };
                let tasks = self
                    .api
                    .list_tasks()?
                    .into_iter()
                    .filter(|t| {
                        t.title.to_lowercase().contains(&needle)
                            || contains(&t.content)
                            || contains(&t.desc)
                    })
                    .collect();
                let mut head = Map::new();
                head.insert("query".into(), json!(query));
                self.task_list(tasks, project.as_deref(), head, format!("Search: {query}"), vec![])
            }
            "by-tag" => {
                let tag = params.required("tag")?;
                let project = params.string("project")?;
                let wanted = tag.to_lowercase();
                let tasks = self
                    .api
                    .list_tasks()?
                    .into_iter()
                    .filter(|t| t.tags.iter().any(|x| x.to_lowercase() == wanted))
                    .collect();
                let mut head = Map::new();
                head.insert("tag".into(), json!(tag));
                self.task_list(
                    tasks,
                    project.as_deref(),
                    head,
                    format!("Tasks tagged '{tag}'"),
                    vec![],
                )
            }
            "by-priority" => {
                let priority = parse_priority(&params.required("priority")?)?;
                let project = params.string("project")?;
                let tasks = self
                    .api
                    .list_tasks()?
                    .into_iter()
                    .filter(|t| t.priority == priority)
                    .collect();
                let mut head = Map::new();
                head.insert("priority".into(), json!(priority));
                head.insert("priority_label".into(), json!(priority_label(priority)));
                self.task_list(
                    tasks,
                    project.as_deref(),
                    head,
                    format!("Tasks with priority {}", priority_label(priority)),
                    vec![],
                )
            }
            "today" => {
                let project = params.string("project")?;
                let today = self.today()?;
                let zone = self.zone()?;
                let tasks = self
                    .api
                    .list_tasks()?
                    .into_iter()
                    .filter(|t| task_due(t).map(|d| zone.convert(d).date_naive()) == Some(today))
                    .collect();
                self.task_list(
                    tasks,
                    project.as_deref(),
                    Map::new(),
                    "Today's tasks".into(),
                    vec![format!("due={}", today.format("%Y-%m-%d"))],
                )
            }
            "overdue" => {
                let project = params.string("project")?;
                let today = self.today()?;
                let now = self.now;
                let zone = self.zone()?;
                let tasks = self
                    .api
                    .list_tasks()?
                    .into_iter()
                    .filter(|t| t.status == STATUS_ACTIVE)
                    .filter(|t| match task_due(t) {
                        Some(due) if t.is_all_day == Some(true) => {
                            zone.convert(due).date_naive() < today
                        }
                        Some(due) => due < now,
                        None => false,
                    })
                    .collect();
                self.task_list(
                    tasks,
                    project.as_deref(),
                    Map::new(),
                    "Overdue tasks".into(),
                    vec![],
                )
            }
            "completed" | "abandoned" => {
                let days = params.positive("days", DEFAULT_WINDOW_DAYS)?;
                let limit = params.positive("limit", DEFAULT_LIMIT)?;
                let project = params.string("project")?;
                let kind = if action == "completed" {
                    ClosedKind::Completed
                } else {
                    ClosedKind::Abandoned
                };
                let from = self.now - window(days)?;
                let tasks = self.api.closed_tasks(
                    kind,
                    from,
                    self.now,
                    u32::try_from(limit).unwrap_or(u32::MAX),
                )?;
                let mut head = Map::new();
                head.insert("days".into(), json!(days));
                head.insert("limit".into(), json!(limit));
                let label = if action == "completed" { "Completed" } else { "Abandoned" };
                self.task_list(
                    tasks,
                    project.as_deref(),
                    head,
                    format!("{label} tasks (last {days} days)"),
                    vec![],
                )
            }
            "deleted" => {
                let limit = params.positive("limit", DEFAULT_LIMIT)?;
                let project = params.string("project")?;
                let tasks = self
                    .api
                    .deleted_tasks(u32::try_from(limit).unwrap_or(u32::MAX))?;
                let mut head = Map::new();
                head.insert("limit".into(), json!(limit));
                self.task_list(
                    tasks,
                    project.as_deref(),
                    head,
                    "Deleted tasks".into(),
                    vec![],
                )
            }
            other => Err(AppError::validation(format!("Unknown tasks action '{other}'."))),
        }
    }

    fn add_task(&self, params: &Params) -> AppResult<Response> {
        // Everything local is parsed before any request is made
        let title = params.required("title")?;
        let kind = params
            .string("kind")?
            .map(|k| parse_choice("kind", &k, TASK_KINDS))
            .transpose()?;
        let priority = params
            .string("priority")?
            .map(|p| parse_priority(&p))
            .transpose()?;
        let start = self.date_param(params, "start")?;
        let due = self.date_param(params, "due")?;
        let time_zone = self.time_zone_param(params)?;
        let default_zone = self.zone()?.name();

        let mut all_day = due.as_ref().or(start.as_ref()).map(|d| d.all_day);
        if params.flag("all_day")? {
            all_day = Some(true);
        }
        if params.flag("timed")? {
            all_day = Some(false);
        }

        let project_id = self.project(params)?;
        let task = Task {
            project_id,
            title,
            content: params.string("content")?,
            desc: params.string("description")?,
            kind,
            priority: priority.unwrap_or(0),
            start_date: start.as_ref().map(NormalizedDate::to_api),
            due_date: due.as_ref().map(NormalizedDate::to_api),
            time_zone: time_zone.or_else(|| default_zone.map(str::to_string)),
            is_all_day: all_day,
            tags: params.list("tags")?.unwrap_or_default(),
            repeat_flag: params.string("recurrence")?,
            parent_id: params.string("parent")?,
            reminders: params.list("reminders")?.unwrap_or_default(),
            ..Task::default()
        };

        info!(project_id = %task.project_id, "creating task");
        let created = self.api.create_task(&task)?;
        Ok(Response::new(
            json!({"success": true, "task": task_to_json(&created, self.zone()?)}),
            View::TaskCreated,
        ))
    }

    fn update_task(&self, params: &Params) -> AppResult<Response> {
        let task_id = params.required("task_id")?;
        let kind = params
            .string("kind")?
            .map(|k| parse_choice("kind", &k, TASK_KINDS))
            .transpose()?;
        let priority = params
            .string("priority")?
            .map(|p| parse_priority(&p))
            .transpose()?;
        let start = self.date_param(params, "start")?;
        let due = self.date_param(params, "due")?;
        let explicit_zone = self.time_zone_param(params)?;

        let mut task = self.load_task(&task_id, params.string("project")?.as_deref())?;

        if let Some(title) = params.string("title")? {
            task.title = title;
        }
        if let Some(content) = params.string("content")? {
            task.content = Some(content);
        }
        if let Some(description) = params.string("description")? {
            task.desc = Some(description);
        }
        if kind.is_some() {
            task.kind = kind;
        }
        if let Some(priority) = priority {
            task.priority = priority;
        }

        if let Some(start) = &start {
            task.start_date = Some(start.to_api());
        }
        if params.flag("clear_start")? {
            task.start_date = None;
        }

        if let Some(due) = &due {
            task.due_date = Some(due.to_api());
            task.is_all_day = Some(due.all_day);
            if let Some(name) = explicit_zone.as_deref().or(self.zone()?.name()) {
                task.time_zone = Some(name.to_string());
            }
        }
        if params.flag("clear_due")? {
            task.due_date = None;
            task.is_all_day = None;
        }
        if params.flag("all_day")? {
            task.is_all_day = Some(true);
        }
        if params.flag("timed")? {
            task.is_all_day = Some(false);
        }

        if let Some(tags) = params.list("tags")? {
            task.tags = tags;
        }
        if params.flag("clear_tags")? {
            task.tags.clear();
        }

        if let Some(recurrence) = params.string("recurrence")? {
            task.repeat_flag = Some(recurrence);
        }
        if params.flag("clear_recurrence")? {
            task.repeat_flag = None;
        }
        if let Some(zone) = explicit_zone {
            task.time_zone = Some(zone);
        }

        info!(task_id = %task_id, project_id = %task.project_id, "updating task");
        let updated = self.api.update_task(&task)?;
        self.task_response(&updated, None, Some(format!("Task {task_id} updated.")))
    }

    fn projects(&self, action: &str, params: &Params) -> AppResult<Response> {
        let project_view = |project: &Project, message: Option<String>| {
            let current = self.current_project();
            Response::new(
                json!({"success": true, "project": project_to_json(project, current.as_deref())}),
                View::Project { message },
            )
        };

        match action {
            "list" => {
                let mut projects = self.api.list_projects()?;
                projects.sort_by_key(|p| p.name.to_lowercase());
                let current = self.current_project();
                let items: Vec<Value> = projects
                    .iter()
                    .map(|p| project_to_json(p, current.as_deref()))
                    .collect();
                Ok(Response::new(
                    json!({
                        "count": items.len(),
                        "current_project_id": current,
                        "projects": items,
                    }),
                    View::Projects,
                ))
            }
            "get" => {
                let project = self.api.get_project(&params.required("project_id")?)?;
                Ok(project_view(&project, None))
            }
            "data" => {
                let data = self.api.project_data(&params.required("project_id")?)?;
                let current = self.current_project();
                Ok(Response::new(
                    json!({
                        "success": true,
                        "timezone": self.timezone_label()?,
                        "data": project_data_to_json(&data, current.as_deref(), self.zone()?),
                    }),
                    View::ProjectData,
                ))
            }
            "create" => {
                let name = params.required("name")?;
                let kind = params
                    .string("kind")?
                    .map(|k| parse_choice("kind", &k, PROJECT_KINDS))
                    .transpose()?
                    .unwrap_or_else(|| "TASK".to_string());
                let view = params
                    .string("view")?
                    .map(|v| parse_choice("view", &v, VIEW_MODES))
                    .transpose()?
                    .unwrap_or_else(|| "list".to_string());
                let project = Project {
                    name,
                    color: params.string("color")?,
                    group_id: params.string("folder")?,
                    kind: Some(kind),
                    view_mode: Some(view),
                    ..Project::default()
                };
                info!(name = %project.name, "creating project");
                let created = self.api.create_project(&project)?;
                let message = format!("Project created: {}", created.id);
                Ok(project_view(&created, Some(message)))
            }
            "update" => {
                let project_id = params.required("project_id")?;
                let mut project = self.api.get_project(&project_id)?;
                if let Some(name) = params.string("name")? {
                    project.name = name;
                }
                if let Some(color) = params.string("color")? {
                    project.color = Some(color);
                }
                if let Some(folder) = params.string("folder")? {
                    project.group_id = Some(folder);
                }
                if params.flag("remove_folder")? {
                    project.group_id = Some("NONE".to_string());
                }
                info!(project_id = %project_id, "updating project");
                let updated = self.api.update_project(&project)?;
                Ok(project_view(&updated, Some(format!("Project {project_id} updated."))))
            }
            "delete" => {
                let project_id = params.required("project_id")?;
                info!(project_id = %project_id, "deleting project");
                self.api.delete_project(&project_id)?;
                Ok(Response::new(
                    lifecycle("delete", json!({"project_id": project_id})),
                    View::Message(format!("Project {project_id} deleted.")),
                ))
            }
            other => Err(AppError::validation(format!("Unknown projects action '{other}'."))),
        }
    }

    fn folders(&self, action: &str, params: &Params) -> AppResult<Response> {
        const COLUMNS: &[(&str, &str)] = &[("ID", "id"), ("Name", "name")];
        match action {
            "list" => {
                let mut folders = self.api.list_folders()?;
                folders.sort_by_key(|f| f.name.to_lowercase());
                let items: Vec<Value> = folders.iter().map(folder_to_json).collect();
                Ok(Response::new(
                    json!({"count": items.len(), "folders": items}),
                    table(format!("Folders ({})", items.len()), "folders", COLUMNS),
                ))
            }
            "create" => {
                let name = params.required("name")?;
                info!(name = %name, "creating folder");
                let folder = self.api.create_folder(&name)?;
                Ok(Response::new(
                    json!({"success": true, "folder": folder_to_json(&folder)}),
                    entity(Some(format!("Folder created: {}", folder.id)), "folder"),
                ))
            }
            "rename" => {
                let folder_id = params.required("folder_id")?;
                let name = params.required("name")?;
                info!(folder_id = %folder_id, "renaming folder");
                let folder = self.api.rename_folder(&folder_id, &name)?;
                Ok(Response::new(
                    json!({"success": true, "folder": folder_to_json(&folder)}),
                    entity(Some(format!("Folder {folder_id} renamed.")), "folder"),
                ))
            }
            "delete" => {
                let folder_id = params.required("folder_id")?;
                info!(folder_id = %folder_id, "deleting folder");
                self.api.delete_folder(&folder_id)?;
                Ok(Response::new(
                    lifecycle("delete", json!({"folder_id": folder_id})),
                    View::Message(format!("Folder {folder_id} deleted.")),
                ))
            }
            other => Err(AppError::validation(format!("Unknown folders action '{other}'."))),
        }
    }

    fn columns(&self, action: &str, params: &Params) -> AppResult<Response> {
        const COLUMNS: &[(&str, &str)] = &[("ID", "id"), ("Name", "name"), ("Sort", "sort_order")];
        let sort = params.int("sort")?;
        let project_id = self.project(params)?;

        match action {
            "list" => {
                let mut columns = self.api.list_columns(&project_id)?;
                columns.sort_by(|a, b| {
                    a.sort_order
                        .cmp(&b.sort_order)
                        .then_with(|| a.name.cmp(&b.name))
                });
                let items: Vec<Value> = columns.iter().map(column_to_json).collect();
                Ok(Response::new(
                    json!({"count": items.len(), "project_id": project_id, "columns": items}),
                    table(format!("Columns ({})", items.len()), "columns", COLUMNS),
                ))
            }
            "create" => {
                let column = Column {
                    project_id: project_id.clone(),
                    name: params.required("name")?,
                    sort_order: sort,
                    ..Column::default()
                };
                info!(project_id = %project_id, "creating column");
                let created = self.api.create_column(&column)?;
                Ok(Response::new(
                    json!({"success": true, "column": column_to_json(&created)}),
                    entity(Some(format!("Column created: {}", created.id)), "column"),
                ))
            }
            "update" => {
                let column_id = params.required("column_id")?;
                let mut column = self
                    .api
                    .list_columns(&project_id)?
                    .into_iter()
                    .find(|c| c.id == column_id)
                    .ok_or_else(|| not_found("column", &column_id))?;
                if let Some(name) = params.string("name")? {
                    column.name = name;
                }
                if sort.is_some() {
                    column.sort_order = sort;
                }
                info!(column_id = %column_id, "updating column");
                let updated = self.api.update_column(&column)?;
                Ok(Response::new(
                    json!({"success": true, "column": column_to_json(&updated)}),
                    entity(Some(format!("Column {column_id} updated.")), "column"),
                ))
            }
            "delete" => {
                let column_id = params.required("column_id")?;
                info!(column_id = %column_id, "deleting column");
                self.api.delete_column(&project_id, &column_id)?;
                Ok(Response::new(
                    lifecycle(
                        "delete",
                        json!({"column_id": column_id, "project_id": project_id}),
                    ),
                    View::Message(format!("Column {column_id} deleted.")),
                ))
            }
            other => Err(AppError::validation(format!("Unknown columns action '{other}'."))),
        }
    }

    fn find_tag(&self, name: &str) -> AppResult<Tag> {
        let wanted = name.to_lowercase();
        self.api
            .list_tags()?
            .into_iter()
            .find(|t| {
                t.name.to_lowercase() == wanted
                    || t.label.as_deref().map(str::to_lowercase).as_deref() == Some(wanted.as_str())
            })
            .ok_or_else(|| not_found("tag", name))
    }

    fn tags(&self, action: &str, params: &Params) -> AppResult<Response> {
        const COLUMNS: &[(&str, &str)] =
            &[("Name", "name"), ("Label", "label"), ("Color", "color"), ("Parent", "parent")];
        match action {
            "list" => {
                let mut tags = self.api.list_tags()?;
                tags.sort_by_key(|t| t.name.to_lowercase());
                let items: Vec<Value> = tags.iter().map(tag_to_json).collect();
                Ok(Response::new(
                    json!({"count": items.len(), "tags": items}),
                    table(format!("Tags ({})", items.len()), "tags", COLUMNS),
                ))
            }
            "create" => {
                let label = params.required("name")?;
                let tag = Tag {
                    name: label.to_lowercase(),
                    label: Some(label),
                    color: params.string("color")?,
                    parent: params.string("parent")?,
                    ..Tag::default()
                };
                info!(tag = %tag.name, "creating tag");
                let created = self.api.create_tag(&tag)?;
                Ok(Response::new(
                    json!({"success": true, "tag": tag_to_json(&created)}),
                    entity(Some(format!("Tag {} created.", created.name)), "tag"),
                ))
            }
            "update" => {
                let name = params.required("name")?;
                let color = params.string("color")?;
                let parent = params.string("parent")?;
                let mut tag = self.find_tag(&name)?;
                if color.is_some() {
                    tag.color = color;
                }
                if parent.is_some() {
                    tag.parent = parent;
                }
                if params.flag("clear_parent")? {
                    tag.parent = None;
                }
                info!(tag = %tag.name, "updating tag");
                let updated = self.api.update_tag(&tag)?;
                Ok(Response::new(
                    json!({"success": true, "tag": tag_to_json(&updated)}),
                    entity(Some(format!("Tag {name} updated.")), "tag"),
                ))
            }
            "rename" => {
                let name = params.required("name")?;
                let new_name = params.required("new_name")?;
                info!(tag = %name, "renaming tag");
                self.api.rename_tag(&name, &new_name)?;
                Ok(Response::new(
                    lifecycle("rename", json!({"name": name, "new_name": new_name})),
                    View::Message(format!("Tag {name} renamed to {new_name}.")),
                ))
            }
            "merge" => {
                let source = params.required("source")?;
                let target = params.required("target")?;
                info!(source = %source, target = %target, "merging tags");
                self.api.merge_tags(&source, &target)?;
                Ok(Response::new(
                    lifecycle("merge", json!({"source": source, "target": target})),
                    View::Message(format!("Tag {source} merged into {target}.")),
                ))
            }
            "delete" => {
                let name = params.required("name")?;
                info!(tag = %name, "deleting tag");
                self.api.delete_tag(&name)?;
                Ok(Response::new(
                    lifecycle("delete", json!({"name": name})),
                    View::Message(format!("Tag {name} deleted.")),
                ))
            }
            other => Err(AppError::validation(format!("Unknown tags action '{other}'."))),
        }
    }

    fn find_habit(&self, habit_id: &str) -> AppResult<Habit> {
        self.api
            .list_habits()?
            .into_iter()
            .find(|h| h.id == habit_id)
            .ok_or_else(|| not_found("habit", habit_id))
    }

    /// Apply habit fields from params onto a habit record
    fn apply_habit_fields(&self, habit: &mut Habit, params: &Params) -> AppResult<()> {
        if let Some(name) = params.string("name")? {
            habit.name = name;
        }
        if let Some(kind) = params.string("type")? {
            habit.habit_type = Some(parse_choice("type", &kind, HABIT_TYPES)?);
        }
        if let Some(goal) = params.float("goal")? {
            habit.goal = Some(goal);
        }
        if let Some(step) = params.float("step")? {
            habit.step = Some(step);
        }
        if let Some(unit) = params.string("unit")? {
            habit.unit = Some(unit);
        }
        if params.has("target_days") {
            habit.target_days = Some(params.positive("target_days", 1)?);
        }
        if let Some(encouragement) = params.string("encouragement")? {
            habit.encouragement = Some(encouragement);
        }
        if let Some(section) = params.string("section")? {
            habit.section_id = Some(section);
        }
        if let Some(color) = params.string("color")? {
            habit.color = Some(color);
        }
        Ok(())
    }

    fn habits(&self, action: &str, params: &Params) -> AppResult<Response> {
        const COLUMNS: &[(&str, &str)] = &[
            ("ID", "id"),
            ("Name", "name"),
            ("Type", "type"),
            ("Goal", "goal"),
            ("Status", "status_label"),
        ];
        let habit_view = |habit: &Habit, action: Option<&str>, message: Option<String>| {
            let mut payload = Map::new();
            payload.insert("success".into(), Value::Bool(true));
            if let Some(action) = action {
                payload.insert("action".into(), json!(action));
            }
            payload.insert("habit".into(), habit_to_json(habit));
            Response::new(Value::Object(payload), entity(message, "habit"))
        };

        match action {
            "list" => {
                let habits = self.api.list_habits()?;
                let items: Vec<Value> = habits.iter().map(habit_to_json).collect();
                Ok(Response::new(
                    json!({"count": items.len(), "habits": items}),
                    table(format!("Habits ({})", items.len()), "habits", COLUMNS),
                ))
            }
            "get" => {
                let habit = self.find_habit(&params.required("habit_id")?)?;
                Ok(habit_view(&habit, None, None))
            }
            "sections" => {
                let sections = self.api.habit_sections()?;
                Ok(Response::new(
                    json!({"count": sections.len(), "sections": sections}),
                    table(
                        format!("Habit sections ({})", sections.len()),
                        "sections",
                        &[("ID", "id"), ("Name", "name")],
                    ),
                ))
            }
            "preferences" => Ok(Response::new(
                json!({"success": true, "preferences": self.api.habit_preferences()?}),
                document("Habit preferences", "preferences"),
            )),
            "create" => {
                let mut habit = Habit {
                    habit_type: Some("Boolean".to_string()),
                    goal: Some(1.0),
                    unit: Some("Count".to_string()),
                    ..Habit::default()
                };
                self.apply_habit_fields(&mut habit, params)?;
                info!(name = %habit.name, "creating habit");
                let created = self.api.create_habit(&habit)?;
                let message = format!("Habit created: {}", created.id);
                Ok(habit_view(&created, None, Some(message)))
            }
            "update" => {
                let habit_id = params.required("habit_id")?;
                // Validate the field values before fetching the record
                self.apply_habit_fields(&mut Habit::default(), params)?;
                let mut habit = self.find_habit(&habit_id)?;
                self.apply_habit_fields(&mut habit, params)?;
                info!(habit_id = %habit_id, "updating habit");
                let updated = self.api.update_habit(&habit)?;
                Ok(habit_view(&updated, None, Some(format!("Habit {habit_id} updated."))))
            }
            "delete" => {
                let habit_id = params.required("habit_id")?;
                info!(habit_id = %habit_id, "deleting habit");
                self.api.delete_habit(&habit_id)?;
                Ok(Response::new(
                    lifecycle("delete", json!({"habit_id": habit_id})),
                    View::Message(format!("Habit {habit_id} deleted.")),
                ))
            }
            "checkin" => {
                let habit_id = params.required("habit_id")?;
                let value = params.float("value")?.unwrap_or(1.0);
                let date = match self.date_param(params, "date")? {
                    Some(date) => date.date(),
                    None => self.today()?,
                };
                let habit = self.find_habit(&habit_id)?;
                let checkin = Checkin {
                    habit_id: habit_id.clone(),
                    value,
                    stamp: date_stamp(date),
                };
                info!(habit_id = %habit_id, stamp = checkin.stamp, "recording check-in");
                let result = self.api.checkin_habit(&checkin)?;
                Ok(Response::new(
                    json!({
                        "success": true,
                        "habit": habit_to_json(&habit),
                        "checkin": {
                            "habit_id": habit_id,
                            "value": value,
                            "date": date.format("%Y-%m-%d").to_string(),
                            "stamp": checkin.stamp,
                        },
                        "result": result,
                    }),
                    entity(
                        Some(format!(
                            "Checked in {} on {}.",
                            habit.name,
                            date.format("%Y-%m-%d")
                        )),
                        "checkin",
                    ),
                ))
            }
            "checkins" => {
                let habit_ids = params.list("habit_ids")?.unwrap_or_default();
                if habit_ids.is_empty() {
                    return Err(AppError::validation("Missing required field 'habit_ids'."));
                }
                let after_stamp = params.int("after_stamp")?.unwrap_or(0);
                let checkins = self.api.habit_checkins(&habit_ids, after_stamp)?;
                let count: usize = checkins
                    .as_object()
                    .map(|by_habit| {
                        by_habit
                            .values()
                            .map(|v| v.as_array().map_or(0, Vec::len))
                            .sum()
                    })
                    .unwrap_or(0);
                Ok(Response::new(
                    json!({
                        "success": true,
                        "count": count,
                        "after_stamp": after_stamp,
                        "checkins": checkins,
                    }),
                    document("Check-ins", "checkins"),
                ))
            }
            "archive" | "unarchive" => {
                let habit_id = params.required("habit_id")?;
                let mut habit = self.find_habit(&habit_id)?;
                habit.status = if action == "archive" { 1 } else { 0 };
                info!(habit_id = %habit_id, action, "changing habit status");
                let updated = self.api.update_habit(&habit)?;
                Ok(habit_view(
                    &updated,
                    Some(action),
                    Some(format!("Habit {habit_id} {action}d.")),
                ))
            }
            other => Err(AppError::validation(format!("Unknown habits action '{other}'."))),
        }
    }

    fn user(&self, action: &str) -> AppResult<Response> {
        let (key, title, value) = match action {
            "profile" => ("profile", "Profile", self.api.user_profile()?),
            "status" => ("status", "Account status", self.api.user_status()?),
            "statistics" => ("statistics", "Statistics", self.api.user_statistics()?),
            "preferences" => ("preferences", "Preferences", self.api.user_preferences()?),
            other => {
                return Err(AppError::validation(format!("Unknown user action '{other}'.")))
            }
        };
        let mut payload = Map::new();
        payload.insert("success".into(), Value::Bool(true));
        payload.insert(key.into(), value);
        Ok(Response::new(Value::Object(payload), document(title, key)))
    }

    /// Inclusive date window from `--days` or `--from/--to`
    fn focus_window(&self, params: &Params) -> AppResult<(NaiveDate, NaiveDate)> {
        let today = self.today()?;
        let from = self.date_param(params, "from")?.map(|d| d.date());
        let to = self.date_param(params, "to")?.map(|d| d.date());
        let window = match (from, to) {
            (None, None) => {
                let days = params.positive("days", DEFAULT_WINDOW_DAYS)?;
                (today - window(days - 1)?, today)
            }
            (Some(from), to) => (from, to.unwrap_or(today)),
            (None, Some(to)) => (to - Duration::days(DEFAULT_WINDOW_DAYS - 1), to),
        };
        if window.0 > window.1 {
            return Err(AppError::validation(format!(
                "--from ({}) must not be after --to ({}).",
                window.0, window.1
            )));
        }
        Ok(window)
    }

    fn focus(&self, action: &str, params: &Params) -> AppResult<Response> {
        let (from, to) = self.focus_window(params)?;
        let (from_stamp, to_stamp) = (date_stamp(from), date_stamp(to));
        let from_label = from.format("%Y-%m-%d").to_string();
        let to_label = to.format("%Y-%m-%d").to_string();

        match action {
            "heatmap" => {
                let heatmap = self.api.focus_heatmap(from_stamp, to_stamp)?;
                Ok(Response::new(
                    json!({
                        "count": heatmap.len(),
                        "from": from_label,
                        "to": to_label,
                        "heatmap": heatmap,
                    }),
                    table(
                        format!("Focus heatmap {from_label} to {to_label}"),
                        "heatmap",
                        &[("Day", "day"), ("Duration", "duration")],
                    ),
                ))
            }
            "by-tag" => {
                let by_tag = self.api.focus_by_tag(from_stamp, to_stamp)?;
                let tag_count = by_tag.as_object().map_or(0, Map::len);
                Ok(Response::new(
                    json!({
                        "tag_count": tag_count,
                        "from": from_label,
                        "to": to_label,
                        "focus_by_tag": by_tag,
                    }),
                    document(
                        &format!("Focus by tag {from_label} to {to_label}"),
                        "focus_by_tag",
                    ),
                ))
            }
            other => Err(AppError::validation(format!("Unknown focus action '{other}'."))),
        }
    }
}
