//! Command definitions for the CLI
//!
//! The clap tree mirrors the dispatcher catalogue. Every leaf converts into an
//! [`Invocation`]: either one `(domain, action, params)` triple or a batch run.
//! Only explicitly supplied flags end up in the params.

use crate::batch::BatchKind;
use crate::dispatch::{Domain, Params};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug)]
#[command(name = "ticktick")]
#[command(about = "Command-line client for TickTick and Dida365")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Confirm destructive actions without prompting
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, query and change tasks
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Manage projects (lists)
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Manage project folders
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },
    /// Manage kanban columns of a project
    Columns {
        #[command(subcommand)]
        action: ColumnAction,
    },
    /// Manage tags
    Tags {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Manage habits and check-ins
    Habits {
        #[command(subcommand)]
        action: HabitAction,
    },
    /// Account information
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Focus (pomodoro) statistics
    Focus {
        #[command(subcommand)]
        action: FocusAction,
    },
    /// Dump the full account state
    Sync,
    /// Obtain an access token through the OAuth2 authorization-code flow
    Auth {
        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        manual: bool,
    },
}

/// What a parsed command asks the handler to do
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Single {
        domain: Domain,
        action: &'static str,
        params: Params,
    },
    Batch {
        kind: BatchKind,
        file: PathBuf,
    },
}

impl Invocation {
    fn single(domain: Domain, action: &'static str, params: Params) -> Self {
        Invocation::Single {
            domain,
            action,
            params,
        }
    }
}

/// Batch input file
#[derive(Args, Debug)]
pub struct BatchFile {
    /// JSON file containing an array of items
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,
}

#[derive(Args, Debug, Default)]
pub struct ProjectScope {
    /// Project ID (defaults to TICKTICK_CURRENT_PROJECT_ID, then the inbox)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskRef {
    pub task_id: String,
    /// Project ID (looked up from the task when omitted)
    #[arg(long)]
    pub project: Option<String>,
}

impl TaskRef {
    fn params(self) -> Params {
        Params::new()
            .with("task_id", self.task_id)
            .with_opt("project", self.project)
    }
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// List active tasks in a project
    List {
        #[command(flatten)]
        scope: ProjectScope,
        /// Only tasks due on this day
        #[arg(long)]
        due: Option<String>,
    },
    /// Show one task
    Get(TaskRef),
    /// Create a task
    #[command(alias = "create")]
    Add {
        title: String,
        #[command(flatten)]
        scope: ProjectScope,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// TEXT, NOTE or CHECKLIST
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// none, low, medium, high (or 0, 1, 3, 5)
        #[arg(long)]
        priority: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// RRULE recurrence (requires --start)
        #[arg(long)]
        recurrence: Option<String>,
        #[arg(long)]
        time_zone: Option<String>,
        #[arg(long)]
        all_day: bool,
        #[arg(long)]
        timed: bool,
        /// Parent task ID
        #[arg(long)]
        parent: Option<String>,
        /// Comma-separated reminder triggers
        #[arg(long)]
        reminders: Option<String>,
    },
    /// Create a task from a line of text
    QuickAdd {
        text: String,
        #[command(flatten)]
        scope: ProjectScope,
    },
    /// Change fields of a task
    Update {
        task_id: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        clear_start: bool,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        clear_tags: bool,
        #[arg(long)]
        recurrence: Option<String>,
        #[arg(long)]
        clear_recurrence: bool,
        #[arg(long)]
        time_zone: Option<String>,
        #[arg(long)]
        all_day: bool,
        #[arg(long)]
        timed: bool,
    },
    /// Mark a task completed
    Done(TaskRef),
    /// Mark a task won't-do
    Abandon(TaskRef),
    /// Delete a task
    Delete(TaskRef),
    /// Move a task to another project
    Move {
        task_id: String,
        #[arg(long)]
        to_project: String,
        /// Current project (looked up from the task when omitted)
        #[arg(long)]
        from_project: Option<String>,
    },
    /// Make a task a subtask of another
    Subtask {
        task_id: String,
        #[arg(long)]
        parent: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Move a subtask back to the top level
    Unparent(TaskRef),
    Pin(TaskRef),
    Unpin(TaskRef),
    /// Place a task in a kanban column
    Column {
        task_id: String,
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        clear_column: bool,
        #[arg(long)]
        project: Option<String>,
    },
    /// Find tasks whose title, content or description contains text
    Search {
        query: String,
        #[command(flatten)]
        scope: ProjectScope,
    },
    ByTag {
        tag: String,
        #[command(flatten)]
        scope: ProjectScope,
    },
    ByPriority {
        priority: String,
        #[command(flatten)]
        scope: ProjectScope,
    },
    /// Tasks due today
    Today {
        #[command(flatten)]
        scope: ProjectScope,
    },
    /// Active tasks past their due date
    Overdue {
        #[command(flatten)]
        scope: ProjectScope,
    },
    /// Recently completed tasks
    Completed {
        #[command(flatten)]
        scope: ProjectScope,
        /// Days to look back (default 7)
        #[arg(long)]
        days: Option<i64>,
        /// Maximum number of tasks (default 100)
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Recently abandoned tasks
    Abandoned {
        #[command(flatten)]
        scope: ProjectScope,
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Tasks in the trash
    Deleted {
        #[command(flatten)]
        scope: ProjectScope,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Create tasks from a file of objects
    BatchCreate(BatchFile),
    /// Update tasks from a file of objects
    BatchUpdate(BatchFile),
    /// Delete tasks: [task_id, project_id]
    BatchDelete(BatchFile),
    /// Complete tasks: [task_id, project_id]
    BatchDone(BatchFile),
    /// Move tasks: [task_id, from_project_id, to_project_id]
    BatchMove(BatchFile),
    /// Set parents: [task_id, parent_id, project_id]
    BatchParent(BatchFile),
    /// Remove parents: [task_id, project_id]
    BatchUnparent(BatchFile),
    /// Pin or unpin: [task_id, project_id, pin]
    BatchPin(BatchFile),
}

impl TaskAction {
    pub fn into_invocation(self) -> Invocation {
        let single = |action, params| Invocation::single(Domain::Tasks, action, params);
        let batch = |kind, file: BatchFile| Invocation::Batch {
            kind,
            file: file.file,
        };
        let scoped = |scope: ProjectScope| Params::new().with_opt("project", scope.project);

        match self {
            TaskAction::List { scope, due } => single("list", scoped(scope).with_opt("due", due)),
            TaskAction::Get(task) => single("get", task.params()),
            TaskAction::Add {
                title,
                scope,
                content,
                description,
                kind,
                start,
                due,
                priority,
                tags,
                recurrence,
                time_zone,
                all_day,
                timed,
                parent,
                reminders,
            } => single(
                "add",
                scoped(scope)
                    .with("title", title)
                    .with_opt("content", content)
                    .with_opt("description", description)
                    .with_opt("kind", kind)
                    .with_opt("start", start)
                    .with_opt("due", due)
                    .with_opt("priority", priority)
                    .with_opt("tags", tags)
                    .with_opt("recurrence", recurrence)
                    .with_opt("time_zone", time_zone)
                    .with_flag("all_day", all_day)
                    .with_flag("timed", timed)
                    .with_opt("parent", parent)
                    .with_opt("reminders", reminders),
            ),
            TaskAction::QuickAdd { text, scope } => {
                single("quick-add", scoped(scope).with("text", text))
            }
            TaskAction::Update {
                task_id,
                project,
                title,
                content,
                description,
                kind,
                priority,
                start,
                clear_start,
                due,
                clear_due,
                tags,
                clear_tags,
                recurrence,
                clear_recurrence,
                time_zone,
                all_day,
                timed,
            } => single(
                "update",
                Params::new()
                    .with("task_id", task_id)
                    .with_opt("project", project)
                    .with_opt("title", title)
                    .with_opt("content", content)
                    .with_opt("description", description)
                    .with_opt("kind", kind)
                    .with_opt("priority", priority)
                    .with_opt("start", start)
                    .with_flag("clear_start", clear_start)
                    .with_opt("due", due)
                    .with_flag("clear_due", clear_due)
                    .with_opt("tags", tags)
                    .with_flag("clear_tags", clear_tags)
                    .with_opt("recurrence", recurrence)
                    .with_flag("clear_recurrence", clear_recurrence)
                    .with_opt("time_zone", time_zone)
                    .with_flag("all_day", all_day)
                    .with_flag("timed", timed),
            ),
            TaskAction::Done(task) => single("done", task.params()),
            TaskAction::Abandon(task) => single("abandon", task.params()),
            TaskAction::Delete(task) => single("delete", task.params()),
            TaskAction::Move {
                task_id,
                to_project,
                from_project,
            } => single(
                "move",
                Params::new()
                    .with("task_id", task_id)
                    .with("to_project", to_project)
                    .with_opt("from_project", from_project),
            ),
            TaskAction::Subtask {
                task_id,
                parent,
                project,
            } => single(
                "subtask",
                Params::new()
                    .with("task_id", task_id)
                    .with("parent", parent)
                    .with_opt("project", project),
            ),
            TaskAction::Unparent(task) => single("unparent", task.params()),
            TaskAction::Pin(task) => single("pin", task.params()),
            TaskAction::Unpin(task) => single("unpin", task.params()),
            TaskAction::Column {
                task_id,
                column,
                clear_column,
                project,
            } => single(
                "column",
                Params::new()
                    .with("task_id", task_id)
                    .with_opt("column", column)
                    .with_flag("clear_column", clear_column)
                    .with_opt("project", project),
            ),
            TaskAction::Search { query, scope } => {
                single("search", scoped(scope).with("query", query))
            }
            TaskAction::ByTag { tag, scope } => single("by-tag", scoped(scope).with("tag", tag)),
            TaskAction::ByPriority { priority, scope } => {
                single("by-priority", scoped(scope).with("priority", priority))
            }
            TaskAction::Today { scope } => single("today", scoped(scope)),
            TaskAction::Overdue { scope } => single("overdue", scoped(scope)),
            TaskAction::Completed { scope, days, limit } => single(
                "completed",
                scoped(scope).with_opt("days", days).with_opt("limit", limit),
            ),
            TaskAction::Abandoned { scope, days, limit } => single(
                "abandoned",
                scoped(scope).with_opt("days", days).with_opt("limit", limit),
            ),
            TaskAction::Deleted { scope, limit } => {
                single("deleted", scoped(scope).with_opt("limit", limit))
            }
            TaskAction::BatchCreate(file) => batch(BatchKind::Create, file),
            TaskAction::BatchUpdate(file) => batch(BatchKind::Update, file),
            TaskAction::BatchDelete(file) => batch(BatchKind::Delete, file),
            TaskAction::BatchDone(file) => batch(BatchKind::Done, file),
            TaskAction::BatchMove(file) => batch(BatchKind::Move, file),
            TaskAction::BatchParent(file) => batch(BatchKind::Parent, file),
            TaskAction::BatchUnparent(file) => batch(BatchKind::Unparent, file),
            TaskAction::BatchPin(file) => batch(BatchKind::Pin, file),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ProjectAction {
    /// List projects, marking the current one
    List,
    Get { project_id: String },
    /// Show a project with its tasks and columns
    Data { project_id: String },
    Create {
        name: String,
        #[arg(long)]
        color: Option<String>,
        /// TASK or NOTE
        #[arg(long)]
        kind: Option<String>,
        /// list, kanban or timeline
        #[arg(long)]
        view: Option<String>,
        /// Folder ID
        #[arg(long)]
        folder: Option<String>,
    },
    Update {
        project_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        remove_folder: bool,
    },
    Delete { project_id: String },
}

impl ProjectAction {
    pub fn into_invocation(self) -> Invocation {
        let single = |action, params| Invocation::single(Domain::Projects, action, params);
        match self {
            ProjectAction::List => single("list", Params::new()),
            ProjectAction::Get { project_id } => {
                single("get", Params::new().with("project_id", project_id))
            }
            ProjectAction::Data { project_id } => {
                single("data", Params::new().with("project_id", project_id))
            }
            ProjectAction::Create {
                name,
                color,
                kind,
                view,
                folder,
            } => single(
                "create",
                Params::new()
                    .with("name", name)
                    .with_opt("color", color)
                    .with_opt("kind", kind)
                    .with_opt("view", view)
                    .with_opt("folder", folder),
            ),
            ProjectAction::Update {
                project_id,
                name,
                color,
                folder,
                remove_folder,
            } => single(
                "update",
                Params::new()
                    .with("project_id", project_id)
                    .with_opt("name", name)
                    .with_opt("color", color)
                    .with_opt("folder", folder)
                    .with_flag("remove_folder", remove_folder),
            ),
            ProjectAction::Delete { project_id } => {
                single("delete", Params::new().with("project_id", project_id))
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum FolderAction {
    List,
    Create { name: String },
    Rename { folder_id: String, name: String },
    Delete { folder_id: String },
}

impl FolderAction {
    pub fn into_invocation(self) -> Invocation {
        let single = |action, params| Invocation::single(Domain::Folders, action, params);
        match self {
            FolderAction::List => single("list", Params::new()),
            FolderAction::Create { name } => single("create", Params::new().with("name", name)),
            FolderAction::Rename { folder_id, name } => single(
                "rename",
                Params::new().with("folder_id", folder_id).with("name", name),
            ),
            FolderAction::Delete { folder_id } => {
                single("delete", Params::new().with("folder_id", folder_id))
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ColumnAction {
    List {
        #[command(flatten)]
        scope: ProjectScope,
    },
    Create {
        name: String,
        #[command(flatten)]
        scope: ProjectScope,
        #[arg(long)]
        sort: Option<i64>,
    },
    Update {
        column_id: String,
        #[command(flatten)]
        scope: ProjectScope,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        sort: Option<i64>,
    },
    Delete {
        column_id: String,
        #[command(flatten)]
        scope: ProjectScope,
    },
}

impl ColumnAction {
    pub fn into_invocation(self) -> Invocation {
        let single = |action, params| Invocation::single(Domain::Columns, action, params);
        let scoped = |scope: ProjectScope| Params::new().with_opt("project", scope.project);
        match self {
            ColumnAction::List { scope } => single("list", scoped(scope)),
            ColumnAction::Create { name, scope, sort } => single(
                "create",
                scoped(scope).with("name", name).with_opt("sort", sort),
            ),
            ColumnAction::Update {
                column_id,
                scope,
                name,
                sort,
            } => single(
                "update",
                scoped(scope)
                    .with("column_id", column_id)
                    .with_opt("name", name)
                    .with_opt("sort", sort),
            ),
            ColumnAction::Delete { column_id, scope } => {
                single("delete", scoped(scope).with("column_id", column_id))
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TagAction {
    List,
    Create {
        name: String,
        #[arg(long)]
        color: Option<String>,
        /// Parent tag name
        #[arg(long)]
        parent: Option<String>,
    },
    Update {
        name: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        clear_parent: bool,
    },
    Rename { name: String, new_name: String },
    /// Fold SOURCE into TARGET and remove SOURCE
    Merge { source: String, target: String },
    Delete { name: String },
}

impl TagAction {
    pub fn into_invocation(self) -> Invocation {
        let single = |action, params| Invocation::single(Domain::Tags, action, params);
        match self {
            TagAction::List => single("list", Params::new()),
            TagAction::Create {
                name,
                color,
                parent,
            } => single(
                "create",
                Params::new()
                    .with("name", name)
                    .with_opt("color", color)
                    .with_opt("parent", parent),
            ),
            TagAction::Update {
                name,
                color,
                parent,
                clear_parent,
            } => single(
                "update",
                Params::new()
                    .with("name", name)
                    .with_opt("color", color)
                    .with_opt("parent", parent)
                    .with_flag("clear_parent", clear_parent),
            ),
            TagAction::Rename { name, new_name } => single(
                "rename",
                Params::new().with("name", name).with("new_name", new_name),
            ),
            TagAction::Merge { source, target } => single(
                "merge",
                Params::new().with("source", source).with("target", target),
            ),
            TagAction::Delete { name } => single("delete", Params::new().with("name", name)),
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct HabitFields {
    /// Boolean or Real
    #[arg(long = "type")]
    pub habit_type: Option<String>,
    #[arg(long)]
    pub goal: Option<f64>,
    #[arg(long)]
    pub step: Option<f64>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub target_days: Option<i64>,
    #[arg(long)]
    pub encouragement: Option<String>,
    /// Habit section ID
    #[arg(long)]
    pub section: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

impl HabitFields {
    fn apply(self, params: Params) -> Params {
        params
            .with_opt("type", self.habit_type)
            .with_opt("goal", self.goal)
            .with_opt("step", self.step)
            .with_opt("unit", self.unit)
            .with_opt("target_days", self.target_days)
            .with_opt("encouragement", self.encouragement)
            .with_opt("section", self.section)
            .with_opt("color", self.color)
    }
}

#[derive(Subcommand, Debug)]
pub enum HabitAction {
    List,
    Get { habit_id: String },
    Sections,
    Preferences,
    Create {
        name: String,
        #[command(flatten)]
        fields: HabitFields,
    },
    Update {
        habit_id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: HabitFields,
    },
    Delete { habit_id: String },
    /// Record a check-in (today unless --date)
    Checkin {
        habit_id: String,
        #[arg(long)]
        value: Option<f64>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Check-in history for one or more habits
    Checkins {
        #[arg(required = true)]
        habit_ids: Vec<String>,
        /// Only check-ins after this YYYYMMDD stamp
        #[arg(long)]
        after_stamp: Option<i64>,
    },
    Archive { habit_id: String },
    Unarchive { habit_id: String },
    /// Record check-ins: [habit_id, value, checkin_date]
    BatchCheckin(BatchFile),
}

impl HabitAction {
    pub fn into_invocation(self) -> Invocation {
        let single = |action, params| Invocation::single(Domain::Habits, action, params);
        let habit = |id: String| Params::new().with("habit_id", id);
        match self {
            HabitAction::List => single("list", Params::new()),
            HabitAction::Get { habit_id } => single("get", habit(habit_id)),
            HabitAction::Sections => single("sections", Params::new()),
            HabitAction::Preferences => single("preferences", Params::new()),
            HabitAction::Create { name, fields } => {
                single("create", fields.apply(Params::new().with("name", name)))
            }
            HabitAction::Update {
                habit_id,
                name,
                fields,
            } => single(
                "update",
                fields.apply(habit(habit_id).with_opt("name", name)),
            ),
            HabitAction::Delete { habit_id } => single("delete", habit(habit_id)),
            HabitAction::Checkin {
                habit_id,
                value,
                date,
            } => single(
                "checkin",
                habit(habit_id).with_opt("value", value).with_opt("date", date),
            ),
            HabitAction::Checkins {
                habit_ids,
                after_stamp,
            } => single(
                "checkins",
                Params::new()
                    .with("habit_ids", habit_ids)
                    .with_opt("after_stamp", after_stamp),
            ),
            HabitAction::Archive { habit_id } => single("archive", habit(habit_id)),
            HabitAction::Unarchive { habit_id } => single("unarchive", habit(habit_id)),
            HabitAction::BatchCheckin(file) => Invocation::Batch {
                kind: BatchKind::HabitCheckin,
                file: file.file,
            },
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    Profile,
    Status,
    Statistics,
    Preferences,
}

impl UserAction {
    pub fn into_invocation(self) -> Invocation {
        let action = match self {
            UserAction::Profile => "profile",
            UserAction::Status => "status",
            UserAction::Statistics => "statistics",
            UserAction::Preferences => "preferences",
        };
        Invocation::single(Domain::User, action, Params::new())
    }
}

#[derive(Args, Debug, Default)]
pub struct FocusWindow {
    /// Days back from today, inclusive (default 7)
    #[arg(long)]
    pub days: Option<i64>,
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum FocusAction {
    /// Daily focus durations
    Heatmap(FocusWindow),
    /// Focus time per tag
    ByTag(FocusWindow),
}

impl FocusAction {
    pub fn into_invocation(self) -> Invocation {
        let (action, window) = match self {
            FocusAction::Heatmap(window) => ("heatmap", window),
            FocusAction::ByTag(window) => ("by-tag", window),
        };
        Invocation::single(
            Domain::Focus,
            action,
            Params::new()
                .with_opt("days", window.days)
                .with_opt("from", window.from)
                .with_opt("to", window.to),
        )
    }
}
