//! Common test utilities and helpers
//!
//! `FakeApi` is an in-memory `TickTickApi` that records every call, so tests
//! can assert exactly which requests a command would have made. `TestCommand`
//! runs the real binary in a clean environment.

#![allow(dead_code)]

use assert_cmd::Command;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::cell::RefCell;
use tempfile::TempDir;
use ticktick_cli::api::{
    Checkin, ClosedKind, Column, Folder, Habit, Project, ProjectData, Tag, Task, TickTickApi,
};
use ticktick_cli::config::{Config, Settings};
use ticktick_cli::errors::{AppError, AppResult};

pub const INBOX: &str = "inbox123";

/// One recorded API call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: &'static str,
    pub mutating: bool,
    pub args: Vec<String>,
}

#[derive(Default)]
pub struct FakeApi {
    pub tasks: RefCell<Vec<Task>>,
    pub projects: RefCell<Vec<Project>>,
    pub columns: RefCell<Vec<Column>>,
    pub tags: RefCell<Vec<Tag>>,
    pub habits: RefCell<Vec<Habit>>,
    pub closed: Vec<Task>,
    pub calls: RefCell<Vec<Call>>,
    /// Make `inbox_id` fail
    pub inbox_unavailable: bool,
    pub next_id: RefCell<u32>,
}

fn not_found(what: &str) -> AppError {
    AppError::HttpStatus {
        status_code: 404,
        reason: format!("{what} not found"),
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, task: Task) -> Self {
        self.tasks.borrow_mut().push(task);
        self
    }

    pub fn with_project(self, project: Project) -> Self {
        self.projects.borrow_mut().push(project);
        self
    }

    pub fn with_habit(self, habit: Habit) -> Self {
        self.habits.borrow_mut().push(habit);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|c| c.name).collect()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.mutating)
            .cloned()
            .collect()
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks
            .borrow()
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    fn record(&self, name: &'static str, mutating: bool, args: &[&str]) {
        self.calls.borrow_mut().push(Call {
            name,
            mutating,
            args: args.iter().map(|a| a.to_string()).collect(),
        });
    }

    fn new_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        format!("{prefix}{next}")
    }
}

pub fn task(id: &str, project_id: &str, title: &str) -> Task {
    Task {
        id: id.to_string(),
        project_id: project_id.to_string(),
        title: title.to_string(),
        ..Task::default()
    }
}

pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        ..Project::default()
    }
}

impl TickTickApi for FakeApi {
    fn inbox_id(&self) -> AppResult<String> {
        self.record("inbox_id", false, &[]);
        if self.inbox_unavailable {
            return Err(AppError::NetworkTimeout { timeout_secs: 30 });
        }
        Ok(INBOX.to_string())
    }

    fn user_profile(&self) -> AppResult<Value> {
        self.record("user_profile", false, &[]);
        Ok(json!({"username": "ana@example.com", "name": "Ana", "accessToken": "leaked-token"}))
    }

    fn user_status(&self) -> AppResult<Value> {
        self.record("user_status", false, &[]);
        Ok(json!({"inboxId": INBOX, "pro": false}))
    }

    fn user_statistics(&self) -> AppResult<Value> {
        self.record("user_statistics", false, &[]);
        Ok(json!({"score": 120, "level": 3}))
    }

    fn user_preferences(&self) -> AppResult<Value> {
        self.record("user_preferences", false, &[]);
        Ok(json!({"timeZone": "America/New_York"}))
    }

    fn sync_state(&self) -> AppResult<Value> {
        self.record("sync_state", false, &[]);
        Ok(json!({"inboxId": INBOX, "projectProfiles": []}))
    }

    fn get_task(&self, task_id: &str, project_id: Option<&str>) -> AppResult<Option<Task>> {
        self.record("get_task", false, &[task_id, project_id.unwrap_or("")]);
        Ok(self.task(task_id))
    }

    fn list_tasks(&self) -> AppResult<Vec<Task>> {
        self.record("list_tasks", false, &[]);
        Ok(self.tasks.borrow().clone())
    }

    fn create_task(&self, task: &Task) -> AppResult<Task> {
        self.record("create_task", true, &[&task.project_id, &task.title]);
        let mut created = task.clone();
        created.id = self.new_id("task");
        self.tasks.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn update_task(&self, task: &Task) -> AppResult<Task> {
        self.record("update_task", true, &[&task.id, &task.project_id]);
        let mut tasks = self.tasks.borrow_mut();
        let slot = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| not_found("task"))?;
        *slot = task.clone();
        Ok(task.clone())
    }

    fn complete_task(&self, project_id: &str, task_id: &str) -> AppResult<()> {
        self.record("complete_task", true, &[project_id, task_id]);
        let mut tasks = self.tasks.borrow_mut();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.project_id == project_id)
            .ok_or_else(|| not_found("task"))?;
        task.status = 2;
        Ok(())
    }

    fn delete_task(&self, project_id: &str, task_id: &str) -> AppResult<()> {
        self.record("delete_task", true, &[project_id, task_id]);
        let mut tasks = self.tasks.borrow_mut();
        let before = tasks.len();
        tasks.retain(|t| t.id != task_id);
        if tasks.len() == before {
            return Err(not_found("task"));
        }
        Ok(())
    }

    fn move_task(&self, task_id: &str, from_project_id: &str, to_project_id: &str) -> AppResult<()> {
        self.record("move_task", true, &[task_id, from_project_id, to_project_id]);
        let mut tasks = self.tasks.borrow_mut();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| not_found("task"))?;
        task.project_id = to_project_id.to_string();
        Ok(())
    }

    fn set_task_parent(&self, task_id: &str, parent_id: &str, project_id: &str) -> AppResult<()> {
        self.record("set_task_parent", true, &[task_id, parent_id, project_id]);
        Ok(())
    }

    fn unset_task_parent(&self, task_id: &str, old_parent_id: &str, project_id: &str) -> AppResult<()> {
        self.record("unset_task_parent", true, &[task_id, old_parent_id, project_id]);
        Ok(())
    }

    fn closed_tasks(
        &self,
        kind: ClosedKind,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Task>> {
        self.record("closed_tasks", false, &[kind.as_status(), &limit.to_string()]);
        Ok(self.closed.clone())
    }

    fn deleted_tasks(&self, limit: u32) -> AppResult<Vec<Task>> {
        self.record("deleted_tasks", false, &[&limit.to_string()]);
        Ok(Vec::new())
    }

    fn list_projects(&self) -> AppResult<Vec<Project>> {
        self.record("list_projects", false, &[]);
        Ok(self.projects.borrow().clone())
    }

    fn get_project(&self, project_id: &str) -> AppResult<Project> {
        self.record("get_project", false, &[project_id]);
        self.projects
            .borrow()
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| not_found("project"))
    }

    fn project_data(&self, project_id: &str) -> AppResult<ProjectData> {
        self.record("project_data", false, &[project_id]);
        Ok(ProjectData {
            project: self.projects.borrow().iter().find(|p| p.id == project_id).cloned(),
            tasks: self
                .tasks
                .borrow()
                .iter()
                .filter(|t| t.project_id == project_id)
                .cloned()
                .collect(),
            columns: self.columns.borrow().clone(),
        })
    }

    fn create_project(&self, project: &Project) -> AppResult<Project> {
        self.record("create_project", true, &[&project.name]);
        let mut created = project.clone();
        created.id = self.new_id("project");
        self.projects.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn update_project(&self, project: &Project) -> AppResult<Project> {
        self.record("update_project", true, &[&project.id]);
        Ok(project.clone())
    }

    fn delete_project(&self, project_id: &str) -> AppResult<()> {
        self.record("delete_project", true, &[project_id]);
        Ok(())
    }

    fn list_folders(&self) -> AppResult<Vec<Folder>> {
        self.record("list_folders", false, &[]);
        Ok(Vec::new())
    }

    fn create_folder(&self, name: &str) -> AppResult<Folder> {
        self.record("create_folder", true, &[name]);
        Ok(Folder {
            id: self.new_id("folder"),
            name: name.to_string(),
            ..Folder::default()
        })
    }

    fn rename_folder(&self, folder_id: &str, name: &str) -> AppResult<Folder> {
        self.record("rename_folder", true, &[folder_id, name]);
        Ok(Folder {
            id: folder_id.to_string(),
            name: name.to_string(),
            ..Folder::default()
        })
    }

    fn delete_folder(&self, folder_id: &str) -> AppResult<()> {
        self.record("delete_folder", true, &[folder_id]);
        Ok(())
    }

    fn list_columns(&self, project_id: &str) -> AppResult<Vec<Column>> {
        self.record("list_columns", false, &[project_id]);
        Ok(self
            .columns
            .borrow()
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    fn create_column(&self, column: &Column) -> AppResult<Column> {
        self.record("create_column", true, &[&column.project_id, &column.name]);
        let mut created = column.clone();
        created.id = self.new_id("column");
        Ok(created)
    }

    fn update_column(&self, column: &Column) -> AppResult<Column> {
        self.record("update_column", true, &[&column.id]);
        Ok(column.clone())
    }

    fn delete_column(&self, project_id: &str, column_id: &str) -> AppResult<()> {
        self.record("delete_column", true, &[project_id, column_id]);
        Ok(())
    }

    fn list_tags(&self) -> AppResult<Vec<Tag>> {
        self.record("list_tags", false, &[]);
        Ok(self.tags.borrow().clone())
    }

    fn create_tag(&self, tag: &Tag) -> AppResult<Tag> {
        self.record("create_tag", true, &[&tag.name]);
        Ok(tag.clone())
    }

    fn update_tag(&self, tag: &Tag) -> AppResult<Tag> {
        self.record("update_tag", true, &[&tag.name]);
        Ok(tag.clone())
    }

    fn rename_tag(&self, name: &str, new_name: &str) -> AppResult<()> {
        self.record("rename_tag", true, &[name, new_name]);
        Ok(())
    }

    fn merge_tags(&self, source: &str, target: &str) -> AppResult<()> {
        self.record("merge_tags", true, &[source, target]);
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> AppResult<()> {
        self.record("delete_tag", true, &[name]);
        Ok(())
    }

    fn list_habits(&self) -> AppResult<Vec<Habit>> {
        self.record("list_habits", false, &[]);
        Ok(self.habits.borrow().clone())
    }

    fn habit_sections(&self) -> AppResult<Vec<Value>> {
        self.record("habit_sections", false, &[]);
        Ok(vec![json!({"id": "s1", "name": "_morning"})])
    }

    fn habit_preferences(&self) -> AppResult<Value> {
        self.record("habit_preferences", false, &[]);
        Ok(json!({"showInCalendar": true}))
    }

    fn create_habit(&self, habit: &Habit) -> AppResult<Habit> {
        self.record("create_habit", true, &[&habit.name]);
        let mut created = habit.clone();
        created.id = self.new_id("habit");
        Ok(created)
    }

    fn update_habit(&self, habit: &Habit) -> AppResult<Habit> {
        self.record("update_habit", true, &[&habit.id]);
        Ok(habit.clone())
    }

    fn delete_habit(&self, habit_id: &str) -> AppResult<()> {
        self.record("delete_habit", true, &[habit_id]);
        Ok(())
    }

    fn checkin_habit(&self, checkin: &Checkin) -> AppResult<Value> {
        self.record(
            "checkin_habit",
            true,
            &[&checkin.habit_id, &checkin.stamp.to_string(), &checkin.value.to_string()],
        );
        Ok(json!({"id2etag": {}, "id2error": {}}))
    }

    fn habit_checkins(&self, habit_ids: &[String], after_stamp: i64) -> AppResult<Value> {
        self.record("habit_checkins", false, &[&habit_ids.join(","), &after_stamp.to_string()]);
        Ok(json!({"h1": [{"checkinStamp": 20260301, "value": 1.0}]}))
    }

    fn focus_heatmap(&self, from_stamp: i64, to_stamp: i64) -> AppResult<Vec<Value>> {
        self.record("focus_heatmap", false, &[&from_stamp.to_string(), &to_stamp.to_string()]);
        Ok(vec![json!({"day": "20260210", "duration": 50})])
    }

    fn focus_by_tag(&self, from_stamp: i64, to_stamp: i64) -> AppResult<Value> {
        self.record("focus_by_tag", false, &[&from_stamp.to_string(), &to_stamp.to_string()]);
        Ok(json!({"work": 120, "study": 45}))
    }
}

/// Settings built from an explicit environment
pub fn settings(vars: &[(&str, &str)]) -> Settings {
    let vars: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_sources(Config::default(), move |name| {
        vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    })
    .expect("valid test settings")
}

pub fn new_york() -> Settings {
    settings(&[("TZ", "America/New_York")])
}

/// Tuesday 2026-02-10, 12:00 UTC (07:00 in New York)
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap()
}

/// Test command builder for the ticktick binary
///
/// The environment is cleared and the config directory points at a fresh
/// temporary directory, so nothing from the developer's machine leaks in.
pub struct TestCommand {
    cmd: Command,
    _home: TempDir,
}

impl TestCommand {
    pub fn new() -> Self {
        let home = TempDir::new().expect("Failed to create temp directory");
        let mut cmd = Command::cargo_bin("ticktick").expect("Failed to find ticktick binary");
        cmd.env_clear()
            .env("HOME", home.path())
            .env("XDG_CONFIG_HOME", home.path().join(".config"));
        Self { cmd, _home: home }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.cmd.arg(arg.as_ref());
        }
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.cmd.env(key.as_ref(), val.as_ref());
        self
    }

    pub fn assert(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert()
    }
}

impl Default for TestCommand {
    fn default() -> Self {
        Self::new()
    }
}
