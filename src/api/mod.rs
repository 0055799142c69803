//! TickTick API boundary
//!
//! [`TickTickApi`] is the only surface the command logic talks to. The HTTP
//! implementation lives in [`http`]; tests substitute an in-memory double.

pub mod http;
pub mod oauth;
pub mod types;

pub use http::HttpClient;
pub use types::{
    Checkin, ClosedKind, Column, Folder, Habit, Project, ProjectData, Tag, Task,
};

use crate::errors::AppResult;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Operations offered by the TickTick service
///
/// All identifiers are opaque strings. Implementations perform exactly one
/// request per call and never retry.
pub trait TickTickApi {
    // Account
    fn inbox_id(&self) -> AppResult<String>;
    fn user_profile(&self) -> AppResult<Value>;
    fn user_status(&self) -> AppResult<Value>;
    fn user_statistics(&self) -> AppResult<Value>;
    fn user_preferences(&self) -> AppResult<Value>;
    fn sync_state(&self) -> AppResult<Value>;

    // Tasks
    /// Fetch a task; `Ok(None)` when the service reports it missing
    fn get_task(&self, task_id: &str, project_id: Option<&str>) -> AppResult<Option<Task>>;
    /// Every open task in the account
    fn list_tasks(&self) -> AppResult<Vec<Task>>;
    fn create_task(&self, task: &Task) -> AppResult<Task>;
    fn update_task(&self, task: &Task) -> AppResult<Task>;
    fn complete_task(&self, project_id: &str, task_id: &str) -> AppResult<()>;
    fn delete_task(&self, project_id: &str, task_id: &str) -> AppResult<()>;
    fn move_task(&self, task_id: &str, from_project_id: &str, to_project_id: &str) -> AppResult<()>;
    fn set_task_parent(&self, task_id: &str, parent_id: &str, project_id: &str) -> AppResult<()>;
    fn unset_task_parent(&self, task_id: &str, old_parent_id: &str, project_id: &str) -> AppResult<()>;
    fn closed_tasks(
        &self,
        kind: ClosedKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Task>>;
    fn deleted_tasks(&self, limit: u32) -> AppResult<Vec<Task>>;

    // Projects
    fn list_projects(&self) -> AppResult<Vec<Project>>;
    fn get_project(&self, project_id: &str) -> AppResult<Project>;
    fn project_data(&self, project_id: &str) -> AppResult<ProjectData>;
    fn create_project(&self, project: &Project) -> AppResult<Project>;
    fn update_project(&self, project: &Project) -> AppResult<Project>;
    fn delete_project(&self, project_id: &str) -> AppResult<()>;

    // Folders
    fn list_folders(&self) -> AppResult<Vec<Folder>>;
    fn create_folder(&self, name: &str) -> AppResult<Folder>;
    fn rename_folder(&self, folder_id: &str, name: &str) -> AppResult<Folder>;
    fn delete_folder(&self, folder_id: &str) -> AppResult<()>;

    // Kanban columns
    fn list_columns(&self, project_id: &str) -> AppResult<Vec<Column>>;
    fn create_column(&self, column: &Column) -> AppResult<Column>;
    fn update_column(&self, column: &Column) -> AppResult<Column>;
    fn delete_column(&self, project_id: &str, column_id: &str) -> AppResult<()>;

    // Tags
    fn list_tags(&self) -> AppResult<Vec<Tag>>;
    fn create_tag(&self, tag: &Tag) -> AppResult<Tag>;
    fn update_tag(&self, tag: &Tag) -> AppResult<Tag>;
    fn rename_tag(&self, name: &str, new_name: &str) -> AppResult<()>;
    fn merge_tags(&self, source: &str, target: &str) -> AppResult<()>;
    fn delete_tag(&self, name: &str) -> AppResult<()>;

    // Habits
    fn list_habits(&self) -> AppResult<Vec<Habit>>;
    fn habit_sections(&self) -> AppResult<Vec<Value>>;
    fn habit_preferences(&self) -> AppResult<Value>;
    fn create_habit(&self, habit: &Habit) -> AppResult<Habit>;
    fn update_habit(&self, habit: &Habit) -> AppResult<Habit>;
    fn delete_habit(&self, habit_id: &str) -> AppResult<()>;
    fn checkin_habit(&self, checkin: &Checkin) -> AppResult<Value>;
    /// Check-ins grouped by habit id, newer than `after_stamp`
    fn habit_checkins(&self, habit_ids: &[String], after_stamp: i64) -> AppResult<Value>;

    // Focus analytics, stamps are `YYYYMMDD`
    fn focus_heatmap(&self, from_stamp: i64, to_stamp: i64) -> AppResult<Vec<Value>>;
    fn focus_by_tag(&self, from_stamp: i64, to_stamp: i64) -> AppResult<Value>;
}
