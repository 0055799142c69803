//! Declarative per-action parameter rules
//!
//! Every (domain, action) pair has one [`ActionRule`]. [`validate`] checks a
//! [`Params`] set against it without touching the network.

use super::params::Params;
use super::Domain;
use crate::errors::{AppError, AppResult};

#[derive(Debug)]
pub struct ActionRule {
    pub domain: Domain,
    pub action: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Pairs that may not both be supplied
    pub exclusive: &'static [(&'static str, &'static str)],
    /// At least one of these must be supplied (empty means no constraint)
    pub at_least_one: &'static [&'static str],
    /// `(field, prerequisite)`: supplying the field requires the prerequisite
    pub depends: &'static [(&'static str, &'static str)],
    pub mutating: bool,
    pub destructive: bool,
}

const fn read(domain: Domain, action: &'static str) -> ActionRule {
    ActionRule {
        domain,
        action,
        required: &[],
        optional: &[],
        exclusive: &[],
        at_least_one: &[],
        depends: &[],
        mutating: false,
        destructive: false,
    }
}

const fn write(domain: Domain, action: &'static str) -> ActionRule {
    ActionRule {
        mutating: true,
        ..read(domain, action)
    }
}

const fn delete(domain: Domain, action: &'static str) -> ActionRule {
    ActionRule {
        destructive: true,
        ..write(domain, action)
    }
}

const TASK_REF: &[&str] = &["task_id"];
const PROJECT: &[&str] = &["project"];

const TASK_UPDATE_FIELDS: &[&str] = &[
    "title",
    "content",
    "description",
    "kind",
    "priority",
    "start",
    "clear_start",
    "due",
    "clear_due",
    "tags",
    "clear_tags",
    "recurrence",
    "clear_recurrence",
    "time_zone",
    "all_day",
    "timed",
];

const HABIT_FIELDS: &[&str] = &[
    "name",
    "type",
    "goal",
    "step",
    "unit",
    "target_days",
    "encouragement",
    "section",
    "color",
];

const FOCUS_WINDOW: &[&str] = &["days", "from", "to"];

pub static RULES: &[ActionRule] = &[
    // tasks
    ActionRule {
        optional: &["project", "due"],
        ..read(Domain::Tasks, "list")
    },
    ActionRule {
        required: TASK_REF,
        optional: PROJECT,
        ..read(Domain::Tasks, "get")
    },
    ActionRule {
        required: &["title"],
        optional: &[
            "project",
            "content",
            "description",
            "kind",
            "start",
            "due",
            "priority",
            "tags",
            "recurrence",
            "time_zone",
            "all_day",
            "timed",
            "parent",
            "reminders",
        ],
        exclusive: &[("all_day", "timed")],
        depends: &[("recurrence", "start")],
        ..write(Domain::Tasks, "add")
    },
    ActionRule {
        required: &["text"],
        optional: PROJECT,
        ..write(Domain::Tasks, "quick-add")
    },
    ActionRule {
        required: TASK_REF,
        optional: &[
            "project",
            "title",
            "content",
            "description",
            "kind",
            "priority",
            "start",
            "clear_start",
            "due",
            "clear_due",
            "tags",
            "clear_tags",
            "recurrence",
            "clear_recurrence",
            "time_zone",
            "all_day",
            "timed",
        ],
        exclusive: &[
            ("start", "clear_start"),
            ("due", "clear_due"),
            ("tags", "clear_tags"),
            ("recurrence", "clear_recurrence"),
            ("all_day", "timed"),
        ],
        at_least_one: TASK_UPDATE_FIELDS,
        ..write(Domain::Tasks, "update")
    },
    ActionRule {
        required: TASK_REF,
        optional: PROJECT,
        ..write(Domain::Tasks, "done")
    },
    ActionRule {
        required: TASK_REF,
        optional: PROJECT,
        ..write(Domain::Tasks, "abandon")
    },
    ActionRule {
        required: TASK_REF,
        optional: PROJECT,
        ..delete(Domain::Tasks, "delete")
    },
    ActionRule {
        required: &["task_id", "to_project"],
        optional: &["from_project"],
        ..write(Domain::Tasks, "move")
    },
    ActionRule {
        required: &["task_id", "parent"],
        optional: PROJECT,
        ..write(Domain::Tasks, "subtask")
    },
    ActionRule {
        required: TASK_REF,
        optional: PROJECT,
        ..write(Domain::Tasks, "unparent")
    },
    ActionRule {
        required: TASK_REF,
        optional: PROJECT,
        ..write(Domain::Tasks, "pin")
    },
    ActionRule {
        required: TASK_REF,
        optional: PROJECT,
        ..write(Domain::Tasks, "unpin")
    },
    ActionRule {
        required: TASK_REF,
        optional: &["project", "column", "clear_column"],
        exclusive: &[("column", "clear_column")],
        at_least_one: &["column", "clear_column"],
        ..write(Domain::Tasks, "column")
    },
    ActionRule {
        required: &["query"],
        optional: PROJECT,
        ..read(Domain::Tasks, "search")
    },
    ActionRule {
        required: &["tag"],
        optional: PROJECT,
        ..read(Domain::Tasks, "by-tag")
    },
    ActionRule {
        required: &["priority"],
        optional: PROJECT,
        ..read(Domain::Tasks, "by-priority")
    },
    ActionRule {
        optional: PROJECT,
        ..read(Domain::Tasks, "today")
    },
    ActionRule {
        optional: PROJECT,
        ..read(Domain::Tasks, "overdue")
    },
    ActionRule {
        optional: &["project", "days", "limit"],
        ..read(Domain::Tasks, "completed")
    },
    ActionRule {
        optional: &["project", "days", "limit"],
        ..read(Domain::Tasks, "abandoned")
    },
    ActionRule {
        optional: &["project", "limit"],
        ..read(Domain::Tasks, "deleted")
    },
    // projects
    read(Domain::Projects, "list"),
    ActionRule {
        required: &["project_id"],
        ..read(Domain::Projects, "get")
    },
    ActionRule {
        required: &["project_id"],
        ..read(Domain::Projects, "data")
    },
    ActionRule {
        required: &["name"],
        optional: &["color", "kind", "view", "folder"],
        ..write(Domain::Projects, "create")
    },
    ActionRule {
        required: &["project_id"],
        optional: &["name", "color", "folder", "remove_folder"],
        exclusive: &[("folder", "remove_folder")],
        at_least_one: &["name", "color", "folder", "remove_folder"],
        ..write(Domain::Projects, "update")
    },
    ActionRule {
        required: &["project_id"],
        ..delete(Domain::Projects, "delete")
    },
    // folders
    read(Domain::Folders, "list"),
    ActionRule {
        required: &["name"],
        ..write(Domain::Folders, "create")
    },
    ActionRule {
        required: &["folder_id", "name"],
        ..write(Domain::Folders, "rename")
    },
    ActionRule {
        required: &["folder_id"],
        ..delete(Domain::Folders, "delete")
    },
    // columns
    ActionRule {
        optional: PROJECT,
        ..read(Domain::Columns, "list")
    },
    ActionRule {
        required: &["name"],
        optional: &["project", "sort"],
        ..write(Domain::Columns, "create")
    },
    ActionRule {
        required: &["column_id"],
        optional: &["project", "name", "sort"],
        at_least_one: &["name", "sort"],
        ..write(Domain::Columns, "update")
    },
    ActionRule {
        required: &["column_id"],
        optional: PROJECT,
        ..delete(Domain::Columns, "delete")
    },
    // tags
    read(Domain::Tags, "list"),
    ActionRule {
        required: &["name"],
        optional: &["color", "parent"],
        ..write(Domain::Tags, "create")
    },
    ActionRule {
        required: &["name"],
        optional: &["color", "parent", "clear_parent"],
        exclusive: &[("parent", "clear_parent")],
        at_least_one: &["color", "parent", "clear_parent"],
        ..write(Domain::Tags, "update")
    },
    ActionRule {
        required: &["name", "new_name"],
        ..write(Domain::Tags, "rename")
    },
    ActionRule {
        required: &["source", "target"],
        ..delete(Domain::Tags, "merge")
    },
    ActionRule {
        required: &["name"],
        ..delete(Domain::Tags, "delete")
    },
    // habits
    read(Domain::Habits, "list"),
    ActionRule {
        required: &["habit_id"],
        ..read(Domain::Habits, "get")
    },
    read(Domain::Habits, "sections"),
    read(Domain::Habits, "preferences"),
    ActionRule {
        required: &["name"],
        optional: HABIT_FIELDS,
        ..write(Domain::Habits, "create")
    },
    ActionRule {
        required: &["habit_id"],
        optional: HABIT_FIELDS,
        at_least_one: HABIT_FIELDS,
        ..write(Domain::Habits, "update")
    },
    ActionRule {
        required: &["habit_id"],
        ..delete(Domain::Habits, "delete")
    },
    ActionRule {
        required: &["habit_id"],
        optional: &["value", "date"],
        ..write(Domain::Habits, "checkin")
    },
    ActionRule {
        required: &["habit_ids"],
        optional: &["after_stamp"],
        ..read(Domain::Habits, "checkins")
    },
    ActionRule {
        required: &["habit_id"],
        ..write(Domain::Habits, "archive")
    },
    ActionRule {
        required: &["habit_id"],
        ..write(Domain::Habits, "unarchive")
    },
    // user
    read(Domain::User, "profile"),
    read(Domain::User, "status"),
    read(Domain::User, "statistics"),
    read(Domain::User, "preferences"),
    // focus
    ActionRule {
        optional: FOCUS_WINDOW,
        exclusive: &[("days", "from"), ("days", "to")],
        ..read(Domain::Focus, "heatmap")
    },
    ActionRule {
        optional: FOCUS_WINDOW,
        exclusive: &[("days", "from"), ("days", "to")],
        ..read(Domain::Focus, "by-tag")
    },
    // sync
    read(Domain::Sync, "state"),
];

/// Map accepted aliases onto their canonical action name
pub fn canonical_action(domain: Domain, action: &str) -> &str {
    match (domain, action) {
        (Domain::Tasks, "create") => "add",
        _ => action,
    }
}

pub fn rule_for(domain: Domain, action: &str) -> AppResult<&'static ActionRule> {
    let action = canonical_action(domain, action);
    RULES
        .iter()
        .find(|rule| rule.domain == domain && rule.action == action)
        .ok_or_else(|| {
            AppError::validation(format!("Unknown {} action '{action}'.", domain.as_str()))
        })
}

fn flag_name(field: &str) -> String {
    format!("--{}", field.replace('_', "-"))
}

/// Check a parameter set against the rule for its action
pub fn validate(rule: &ActionRule, params: &Params) -> AppResult<()> {
    for key in params.keys() {
        if !rule.required.contains(&key) && !rule.optional.contains(&key) {
            return Err(AppError::validation(format!(
                "Unknown field '{key}' for {} {}.",
                rule.domain.as_str(),
                rule.action
            )));
        }
    }

    for field in rule.required {
        if !params.has(field) {
            return Err(AppError::validation(format!(
                "Missing required field '{field}'."
            )));
        }
    }

    for (a, b) in rule.exclusive {
        if params.has(a) && params.has(b) {
            return Err(AppError::validation(format!(
                "Use either {} or {}, not both.",
                flag_name(a),
                flag_name(b)
            )));
        }
    }

    for (field, prerequisite) in rule.depends {
        if params.has(field) && !params.has(prerequisite) {
            return Err(AppError::validation(format!(
                "{} requires {}.",
                flag_name(field),
                flag_name(prerequisite)
            )));
        }
    }

    if !rule.at_least_one.is_empty() && !rule.at_least_one.iter().any(|f| params.has(f)) {
        return Err(AppError::validation("No update fields provided."));
    }

    Ok(())
}
