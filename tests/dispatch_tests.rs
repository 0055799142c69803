//! Dispatch tests against the in-memory API
//!
//! Each test pins the clock and the zone, runs one command through the
//! dispatcher and checks both the payload and the exact requests made.

mod common;

use common::{fixed_now, new_york, project, settings, task, FakeApi, INBOX};
use serde_json::json;
use ticktick_cli::api::Habit;
use ticktick_cli::dispatch::{Dispatcher, Domain, Params};

#[cfg(test)]
mod task_tests {
    use super::*;

    #[test]
    fn test_add_defaults_to_inbox_as_all_day() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new()
            .with("title", "Buy coffee")
            .with("priority", "medium")
            .with("due", "tomorrow");
        let response = dispatcher.dispatch(Domain::Tasks, "add", &params).unwrap();

        assert_eq!(api.call_names(), vec!["inbox_id", "create_task"]);
        let created = api.task("task1").unwrap();
        assert_eq!(created.project_id, INBOX);
        assert_eq!(created.priority, 3);
        assert_eq!(created.is_all_day, Some(true));
        assert_eq!(created.due_date.as_deref(), Some("2026-02-11T05:00:00.000+0000"));
        assert_eq!(created.time_zone.as_deref(), Some("America/New_York"));

        let payload = &response.payload;
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["task"]["title"], json!("Buy coffee"));
        assert_eq!(payload["task"]["priority_label"], json!("medium"));
    }

    #[test]
    fn test_explicit_project_beats_default() {
        let api = FakeApi::new();
        let settings = settings(&[("TZ", "UTC"), ("TICKTICK_CURRENT_PROJECT_ID", "p2")]);
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("title", "Ship it").with("project", "p1");
        dispatcher.dispatch(Domain::Tasks, "add", &params).unwrap();
        assert_eq!(api.mutating_calls()[0].args[0], "p1");

        let params = Params::new().with("title", "Ship it again");
        dispatcher.dispatch(Domain::Tasks, "add", &params).unwrap();
        let mutating = api.mutating_calls();
        assert_eq!(mutating[1].args[0], "p2");
        assert!(!api.call_names().contains(&"inbox_id"));
    }

    #[test]
    fn test_update_without_fields_makes_no_calls() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Draft"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let err = dispatcher
            .dispatch(Domain::Tasks, "update", &Params::new().with("task_id", "t1"))
            .unwrap_err();

        assert_eq!(err.category(), "validation");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "No update fields provided.");
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_exclusive_flags_are_rejected_before_any_request() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Draft"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new()
            .with("task_id", "t1")
            .with("due", "tomorrow")
            .with("clear_due", true);
        let err = dispatcher.dispatch(Domain::Tasks, "update", &params).unwrap_err();

        assert_eq!(err.to_string(), "Use either --due or --clear-due, not both.");
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_bad_date_fails_before_resolution() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("title", "Plan").with("due", "next blursday");
        let err = dispatcher.dispatch(Domain::Tasks, "add", &params).unwrap_err();

        assert_eq!(err.category(), "date");
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_invalid_priority_is_a_validation_error() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("title", "Plan").with("priority", "urgent");
        let err = dispatcher.dispatch(Domain::Tasks, "add", &params).unwrap_err();

        assert_eq!(err.category(), "validation");
        assert!(err.to_string().contains("urgent"));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_done_derives_project_from_task() {
        let api = FakeApi::new().with_task(task("t1", "p9", "Report"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let response = dispatcher
            .dispatch(Domain::Tasks, "done", &Params::new().with("task_id", "t1"))
            .unwrap();

        assert_eq!(
            response.payload,
            json!({"success": true, "action": "done", "task_id": "t1", "project_id": "p9"})
        );
        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].name, "complete_task");
        assert_eq!(mutating[0].args, vec!["p9", "t1"]);
    }

    #[test]
    fn test_missing_task_is_a_resolution_error() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let err = dispatcher
            .dispatch(Domain::Tasks, "delete", &Params::new().with("task_id", "ghost"))
            .unwrap_err();

        assert_eq!(err.category(), "resolution");
        assert_eq!(err.exit_code(), 1);
        assert!(api.mutating_calls().is_empty());
    }

    #[test]
    fn test_update_keeps_untouched_fields() {
        let mut existing = task("t1", "p1", "Draft");
        existing.due_date = Some("2026-02-12T05:00:00.000+0000".into());
        existing.is_all_day = Some(true);
        existing.tags = vec!["work".into()];
        let api = FakeApi::new().with_task(existing);
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("task_id", "t1").with("clear_due", true);
        dispatcher.dispatch(Domain::Tasks, "update", &params).unwrap();

        let updated = api.task("t1").unwrap();
        assert_eq!(updated.title, "Draft");
        assert_eq!(updated.tags, vec!["work".to_string()]);
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.is_all_day, None);
        assert_eq!(api.call_names(), vec!["get_task", "update_task"]);
    }

    #[test]
    fn test_abandon_marks_status() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Old idea"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        dispatcher
            .dispatch(Domain::Tasks, "abandon", &Params::new().with("task_id", "t1"))
            .unwrap();

        let abandoned = api.task("t1").unwrap();
        assert_eq!(abandoned.status, -1);
        assert_eq!(
            abandoned.completed_time.as_deref(),
            Some("2026-02-10T12:00:00.000+0000")
        );
    }

    #[test]
    fn test_overdue_splits_all_day_and_timed() {
        let mut yesterday = task("a", "p1", "Yesterday all-day");
        yesterday.due_date = Some("2026-02-09T05:00:00.000+0000".into());
        yesterday.is_all_day = Some(true);
        let mut today = task("b", "p1", "Today all-day");
        today.due_date = Some("2026-02-10T05:00:00.000+0000".into());
        today.is_all_day = Some(true);
        let mut earlier = task("c", "p1", "Earlier this morning");
        earlier.due_date = Some("2026-02-10T11:00:00.000+0000".into());
        earlier.is_all_day = Some(false);
        let mut finished = task("d", "p1", "Finished");
        finished.due_date = Some("2026-02-08T05:00:00.000+0000".into());
        finished.status = 2;

        let api = FakeApi::new()
            .with_task(yesterday)
            .with_task(today)
            .with_task(earlier)
            .with_task(finished);
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let response = dispatcher
            .dispatch(Domain::Tasks, "overdue", &Params::new())
            .unwrap();

        let ids: Vec<&str> = response.payload["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(response.payload["count"], json!(2));
        assert_eq!(response.payload["timezone"], json!("America/New_York"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("title", "Plan").with("colour", "red");
        let err = dispatcher.dispatch(Domain::Tasks, "add", &params).unwrap_err();

        assert_eq!(err.to_string(), "Unknown field 'colour' for tasks add.");
    }

    #[test]
    fn test_move_derives_source_project() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Draft"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("task_id", "t1").with("to_project", "p2");
        let response = dispatcher.dispatch(Domain::Tasks, "move", &params).unwrap();

        assert_eq!(api.call_names(), vec!["get_task", "move_task"]);
        assert_eq!(api.mutating_calls()[0].args, vec!["t1", "p1", "p2"]);
        assert_eq!(response.payload["from_project_id"], json!("p1"));
        assert_eq!(api.task("t1").unwrap().project_id, "p2");
    }

    #[test]
    fn test_move_with_source_skips_lookup() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Draft"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new()
            .with("task_id", "t1")
            .with("to_project", "p2")
            .with("from_project", "p1");
        dispatcher.dispatch(Domain::Tasks, "move", &params).unwrap();

        assert_eq!(api.call_names(), vec!["move_task"]);
        assert_eq!(api.calls()[0].args, vec!["t1", "p1", "p2"]);
    }

    #[test]
    fn test_subtask_uses_task_project() {
        let api = FakeApi::new()
            .with_task(task("t1", "p9", "Child"))
            .with_task(task("parent", "p9", "Parent"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("task_id", "t1").with("parent", "parent");
        let response = dispatcher.dispatch(Domain::Tasks, "subtask", &params).unwrap();

        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].name, "set_task_parent");
        assert_eq!(mutating[0].args, vec!["t1", "parent", "p9"]);
        assert_eq!(response.payload["parent_id"], json!("parent"));
    }

    #[test]
    fn test_unparent_sends_old_parent() {
        let mut child = task("t1", "p1", "Child");
        child.parent_id = Some("par".into());
        let api = FakeApi::new().with_task(child);
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        dispatcher
            .dispatch(Domain::Tasks, "unparent", &Params::new().with("task_id", "t1"))
            .unwrap();

        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].name, "unset_task_parent");
        assert_eq!(mutating[0].args, vec!["t1", "par", "p1"]);
    }

    #[test]
    fn test_unparent_top_level_task_is_a_resolution_error() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Loose"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let err = dispatcher
            .dispatch(Domain::Tasks, "unparent", &Params::new().with("task_id", "t1"))
            .unwrap_err();

        assert_eq!(err.category(), "resolution");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("task is not a subtask"));
        assert!(api.mutating_calls().is_empty());
    }

    #[test]
    fn test_column_set_and_clear() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Card"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let set = Params::new().with("task_id", "t1").with("column", "c1");
        let response = dispatcher.dispatch(Domain::Tasks, "column", &set).unwrap();
        assert_eq!(api.task("t1").unwrap().column_id.as_deref(), Some("c1"));
        assert_eq!(response.payload["task"]["column_id"], json!("c1"));

        let clear = Params::new().with("task_id", "t1").with_flag("clear_column", true);
        dispatcher.dispatch(Domain::Tasks, "column", &clear).unwrap();
        assert_eq!(api.task("t1").unwrap().column_id, None);

        let names: Vec<&str> = api.mutating_calls().iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["update_task", "update_task"]);
    }
}

#[cfg(test)]
mod project_tests {
    use super::*;

    #[test]
    fn test_list_marks_current_project() {
        let api = FakeApi::new()
            .with_project(project(INBOX, "Inbox"))
            .with_project(project("p1", "Errands"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let response = dispatcher
            .dispatch(Domain::Projects, "list", &Params::new())
            .unwrap();

        let projects = response.payload["projects"].as_array().unwrap();
        assert_eq!(projects[0]["name"], json!("Errands"));
        assert_eq!(projects[0]["is_current"], json!(false));
        assert_eq!(projects[1]["is_current"], json!(true));
        assert_eq!(response.payload["current_project_id"], json!(INBOX));
    }

    #[test]
    fn test_list_tolerates_missing_inbox() {
        let api = FakeApi {
            inbox_unavailable: true,
            ..FakeApi::default()
        }
        .with_project(project("p1", "Errands"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let response = dispatcher
            .dispatch(Domain::Projects, "list", &Params::new())
            .unwrap();

        assert_eq!(response.payload["current_project_id"], json!(null));
        assert_eq!(response.payload["projects"][0]["is_current"], json!(false));
    }

    #[test]
    fn test_inbox_failure_is_a_resolution_error_for_writes() {
        let api = FakeApi {
            inbox_unavailable: true,
            ..FakeApi::default()
        };
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let err = dispatcher
            .dispatch(Domain::Tasks, "quick-add", &Params::new().with("text", "Call mom"))
            .unwrap_err();

        assert_eq!(err.category(), "resolution");
        assert!(api.mutating_calls().is_empty());
    }

    #[test]
    fn test_update_remove_folder_sends_none() {
        let mut filed = project("p1", "Errands");
        filed.group_id = Some("f1".into());
        let api = FakeApi::new().with_project(filed);
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new()
            .with("project_id", "p1")
            .with_flag("remove_folder", true);
        let response = dispatcher.dispatch(Domain::Projects, "update", &params).unwrap();

        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].name, "update_project");
        assert_eq!(mutating[0].args, vec!["p1"]);
        assert_eq!(response.payload["project"]["folder_id"], json!("NONE"));
        assert_eq!(response.payload["project"]["name"], json!("Errands"));
    }

    #[test]
    fn test_columns_follow_project_chain() {
        let api = FakeApi::new();
        let explicit = settings(&[("TZ", "UTC"), ("TICKTICK_CURRENT_PROJECT_ID", "p2")]);
        let dispatcher = Dispatcher::new(&api, &explicit).with_now(fixed_now());
        let params = Params::new().with("name", "Doing").with("project", "p1");
        dispatcher.dispatch(Domain::Columns, "create", &params).unwrap();
        assert_eq!(api.mutating_calls()[0].args, vec!["p1", "Doing"]);

        let api = FakeApi::new();
        let dispatcher = Dispatcher::new(&api, &explicit).with_now(fixed_now());
        let response = dispatcher
            .dispatch(Domain::Columns, "list", &Params::new())
            .unwrap();
        assert_eq!(response.payload["project_id"], json!("p2"));
        assert_eq!(api.call_names(), vec!["list_columns"]);

        let api = FakeApi::new();
        let fallback = new_york();
        let dispatcher = Dispatcher::new(&api, &fallback).with_now(fixed_now());
        dispatcher
            .dispatch(Domain::Columns, "delete", &Params::new().with("column_id", "c1"))
            .unwrap();
        assert_eq!(api.call_names(), vec!["inbox_id", "delete_column"]);
        assert_eq!(api.mutating_calls()[0].args, vec![INBOX, "c1"]);
    }
}

#[cfg(test)]
mod tag_and_folder_tests {
    use super::*;

    #[test]
    fn test_tag_create_lowercases_name() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let response = dispatcher
            .dispatch(Domain::Tags, "create", &Params::new().with("name", "DeepWork"))
            .unwrap();

        assert_eq!(api.mutating_calls()[0].args, vec!["deepwork"]);
        assert_eq!(response.payload["tag"]["name"], json!("deepwork"));
        assert_eq!(response.payload["tag"]["label"], json!("DeepWork"));
    }

    #[test]
    fn test_tag_rename_merge_delete() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let rename = Params::new().with("name", "work").with("new_name", "job");
        dispatcher.dispatch(Domain::Tags, "rename", &rename).unwrap();
        let merge = Params::new().with("source", "job").with("target", "career");
        let response = dispatcher.dispatch(Domain::Tags, "merge", &merge).unwrap();
        assert_eq!(response.payload["action"], json!("merge"));
        dispatcher
            .dispatch(Domain::Tags, "delete", &Params::new().with("name", "career"))
            .unwrap();

        let mutating = api.mutating_calls();
        let names: Vec<&str> = mutating.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["rename_tag", "merge_tags", "delete_tag"]);
        assert_eq!(mutating[0].args, vec!["work", "job"]);
        assert_eq!(mutating[1].args, vec!["job", "career"]);
        assert_eq!(mutating[2].args, vec!["career"]);
    }

    #[test]
    fn test_folder_create_rename_delete() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let created = dispatcher
            .dispatch(Domain::Folders, "create", &Params::new().with("name", "Work"))
            .unwrap();
        assert_eq!(created.payload["folder"]["name"], json!("Work"));

        let rename = Params::new().with("folder_id", "f1").with("name", "Office");
        dispatcher.dispatch(Domain::Folders, "rename", &rename).unwrap();
        dispatcher
            .dispatch(Domain::Folders, "delete", &Params::new().with("folder_id", "f1"))
            .unwrap();

        let mutating = api.mutating_calls();
        let names: Vec<&str> = mutating.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["create_folder", "rename_folder", "delete_folder"]);
        assert_eq!(mutating[0].args, vec!["Work"]);
        assert_eq!(mutating[1].args, vec!["f1", "Office"]);
        assert_eq!(mutating[2].args, vec!["f1"]);
    }
}

#[cfg(test)]
mod habit_and_focus_tests {
    use super::*;

    fn habit(id: &str, name: &str) -> Habit {
        Habit {
            id: id.to_string(),
            name: name.to_string(),
            ..Habit::default()
        }
    }

    #[test]
    fn test_checkin_uses_date_stamp() {
        let api = FakeApi::new().with_habit(habit("h1", "Read"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("habit_id", "h1").with("date", "2026-03-01");
        let response = dispatcher.dispatch(Domain::Habits, "checkin", &params).unwrap();

        assert_eq!(response.payload["checkin"]["stamp"], json!(20260301));
        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].args, vec!["h1", "20260301", "1"]);
    }

    #[test]
    fn test_checkin_unknown_habit_makes_no_write() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let err = dispatcher
            .dispatch(Domain::Habits, "checkin", &Params::new().with("habit_id", "nope"))
            .unwrap_err();

        assert_eq!(err.category(), "resolution");
        assert!(api.mutating_calls().is_empty());
    }


    #[test]
    fn test_archive_and_unarchive_set_status() {
        let api = FakeApi::new().with_habit(habit("h1", "Read"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("habit_id", "h1");
        let archived = dispatcher.dispatch(Domain::Habits, "archive", &params).unwrap();
        assert_eq!(archived.payload["action"], json!("archive"));
        assert_eq!(archived.payload["habit"]["status"], json!(1));

        let restored = dispatcher.dispatch(Domain::Habits, "unarchive", &params).unwrap();
        assert_eq!(restored.payload["habit"]["status"], json!(0));

        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 2);
        assert!(mutating.iter().all(|c| c.name == "update_habit" && c.args == vec!["h1"]));
    }

    #[test]
    fn test_focus_days_window_ends_today() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let response = dispatcher
            .dispatch(Domain::Focus, "heatmap", &Params::new().with("days", 3))
            .unwrap();

        assert_eq!(response.payload["from"], json!("2026-02-08"));
        assert_eq!(response.payload["to"], json!("2026-02-10"));
        assert_eq!(api.calls()[0].args, vec!["20260208", "20260210"]);
    }

    #[test]
    fn test_focus_rejects_inverted_window() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let params = Params::new().with("from", "2026-02-10").with("to", "2026-02-01");
        let err = dispatcher.dispatch(Domain::Focus, "by-tag", &params).unwrap_err();

        assert_eq!(err.category(), "validation");
        assert!(api.calls().is_empty());
    }
}

#[cfg(test)]
mod timezone_tests {
    use super::*;

    fn martian() -> ticktick_cli::config::Settings {
        settings(&[("TZ", "Mars/Olympus_Mons")])
    }

    #[test]
    fn test_invalid_zone_does_not_block_plain_writes() {
        let api = FakeApi::new().with_task(task("t1", "p1", "Draft"));
        let settings = martian();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        dispatcher
            .dispatch(Domain::Tasks, "done", &Params::new().with("task_id", "t1"))
            .unwrap();

        assert_eq!(api.task("t1").unwrap().status, 2);
    }

    #[test]
    fn test_invalid_zone_fails_date_commands_before_requests() {
        let api = FakeApi::new();
        let settings = martian();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let err = dispatcher
            .dispatch(Domain::Tasks, "add", &Params::new().with("title", "Buy coffee"))
            .unwrap_err();
        assert_eq!(err.category(), "validation");
        assert!(err.to_string().contains("Mars/Olympus_Mons"));

        let err = dispatcher
            .dispatch(Domain::Focus, "heatmap", &Params::new())
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(api.calls().is_empty());
    }
}
