//! Command dispatch
//!
//! `(domain, action, params)` goes in, a [`Response`] comes out. Validation
//! against [`rules`] always happens first, so rejected input never costs a
//! request.

mod dispatcher;
pub mod params;
pub mod present;
pub mod rules;

pub use dispatcher::Dispatcher;
pub use params::Params;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Tasks,
    Projects,
    Folders,
    Columns,
    Tags,
    Habits,
    User,
    Focus,
    Sync,
}

impl Domain {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::Tasks => "tasks",
            Domain::Projects => "projects",
            Domain::Folders => "folders",
            Domain::Columns => "columns",
            Domain::Tags => "tags",
            Domain::Habits => "habits",
            Domain::User => "user",
            Domain::Focus => "focus",
            Domain::Sync => "sync",
        }
    }
}

/// How the text formatter should render a payload
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Aligned task table from `tasks`
    Tasks {
        title: String,
        filters: Vec<String>,
        show_project: bool,
    },
    /// Detail view of `task`, optionally preceded by a message line
    Task { message: Option<String> },
    /// Short table of a freshly created `task`
    TaskCreated,
    /// Project table from `projects`
    Projects,
    /// Detail view of `project`
    Project { message: Option<String> },
    /// Project, its tasks and its columns from `data`
    ProjectData,
    /// Generic table over `payload[key]`
    Table {
        title: String,
        key: &'static str,
        columns: Vec<(&'static str, &'static str)>,
    },
    /// `Key: value` lines for the object at `payload[key]`
    Entity {
        message: Option<String>,
        key: &'static str,
    },
    /// One confirmation line
    Message(String),
    /// Nested document at `payload[key]`, printed as indented lines
    Document { title: String, key: &'static str },
    /// Per-item outcome lines from `results`
    Batch { verb: &'static str },
}

/// Result of one dispatched command
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// JSON payload with stable field names
    pub payload: Value,
    pub view: View,
}

impl Response {
    pub fn new(payload: Value, view: View) -> Self {
        Self { payload, view }
    }
}
