//! Batch execution tests
//!
//! Items run in order against the in-memory API; a failing item is reported
//! in place and never stops the rest.

mod common;

use common::{fixed_now, new_york, settings, task, FakeApi};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use ticktick_cli::batch::{self, BatchKind, PARTIAL_FAILURE_EXIT};
use ticktick_cli::cli::{CliContext, CommandHandler, Invocation};
use ticktick_cli::dispatch::Dispatcher;

fn handler(dir: &TempDir, json: bool, assume_yes: bool) -> CommandHandler {
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    CommandHandler::new(CliContext::new(Some(config), false, json, assume_yes).unwrap())
}

#[cfg(test)]
mod runner_tests {
    use super::*;

    #[test]
    fn test_invalid_middle_item_does_not_stop_the_rest() {
        let api = FakeApi::new()
            .with_task(task("t1", "p1", "One"))
            .with_task(task("t2", "p1", "Two"))
            .with_task(task("t3", "p1", "Three"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let items = vec![
            json!(["t1", "p1"]),
            json!(["t2", "p1", "extra"]),
            json!({"task_id": "t3", "project_id": "p1"}),
        ];
        let report = batch::run_batch(&dispatcher, BatchKind::Done, items, &[]);

        assert_eq!(report.results.len(), 3);
        let indexes: Vec<usize> = report.results.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(report.results[0].success);
        assert!(!report.results[1].success);
        assert!(report.results[2].success);
        assert_eq!(report.exit_code(), PARTIAL_FAILURE_EXIT);

        let error = report.results[1].error.as_ref().unwrap();
        assert_eq!(error.category, "validation");
        assert_eq!(
            error.message,
            "Item has 3 values; batch-done takes at most 2 (task_id, project_id)."
        );

        let completed: Vec<String> = api
            .mutating_calls()
            .into_iter()
            .map(|c| c.args[1].clone())
            .collect();
        assert_eq!(completed, vec!["t1", "t3"]);
        assert_eq!(api.task("t2").unwrap().status, 0);
    }

    #[test]
    fn test_create_items_report_resolved_ids() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let items = vec![
            json!({"title": "Milk", "project_id": "p1"}),
            json!({"title": "Eggs"}),
        ];
        let report = batch::run_batch(&dispatcher, BatchKind::Create, items, &[]);

        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.results[0].ids["task_id"], json!("task1"));
        assert_eq!(report.results[0].ids["project_id"], json!("p1"));
        assert_eq!(report.results[1].ids["project_id"], json!(common::INBOX));
    }

    #[test]
    fn test_positional_create_item_is_rejected() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let report = batch::run_batch(&dispatcher, BatchKind::Create, vec![json!(["Milk"])], &[]);

        assert_eq!(report.failed(), 1);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_pin_false_unpins() {
        let mut pinned = task("t1", "p1", "Pinned");
        pinned.pinned_time = Some("2026-02-01T09:00:00.000+0000".into());
        let api = FakeApi::new().with_task(pinned);
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let report = batch::run_batch(
            &dispatcher,
            BatchKind::Pin,
            vec![json!({"task_id": "t1", "pin": false})],
            &[],
        );

        assert_eq!(report.exit_code(), 0);
        assert_eq!(api.task("t1").unwrap().pinned_time, None);
    }

    #[test]
    fn test_item_errors_are_scrubbed_of_secrets() {
        let api = FakeApi::new();
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let report = batch::run_batch(
            &dispatcher,
            BatchKind::Done,
            vec![json!(["tok-SECRET-123"])],
            &["tok-SECRET-123".to_string()],
        );

        let error = report.results[0].error.as_ref().unwrap();
        assert_eq!(error.category, "resolution");
        assert!(!error.message.contains("tok-SECRET-123"));
        assert!(error.message.contains("[REDACTED]"));
    }

    #[test]
    fn test_move_items_derive_or_take_source() {
        let api = FakeApi::new()
            .with_task(task("t1", "p1", "One"))
            .with_task(task("t2", "p3", "Two"));
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let items = vec![
            json!({"task_id": "t1", "to_project_id": "p2"}),
            json!(["t2", "p3", "p4"]),
        ];
        let report = batch::run_batch(&dispatcher, BatchKind::Move, items, &[]);

        assert_eq!(report.exit_code(), 0);
        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 2);
        assert_eq!(mutating[0].args, vec!["t1", "p1", "p2"]);
        assert_eq!(mutating[1].args, vec!["t2", "p3", "p4"]);
        assert_eq!(report.results[0].ids["from_project_id"], json!("p1"));
    }

    #[test]
    fn test_parent_and_unparent_items() {
        let mut child = task("t2", "p1", "Child");
        child.parent_id = Some("t1".into());
        let api = FakeApi::new()
            .with_task(task("t1", "p1", "Parent"))
            .with_task(task("t3", "p5", "Loose"))
            .with_task(child);
        let settings = new_york();
        let dispatcher = Dispatcher::new(&api, &settings).with_now(fixed_now());

        let parent = batch::run_batch(
            &dispatcher,
            BatchKind::Parent,
            vec![json!({"task_id": "t3", "parent_id": "t1"})],
            &[],
        );
        assert_eq!(parent.exit_code(), 0);

        let unparent = batch::run_batch(
            &dispatcher,
            BatchKind::Unparent,
            vec![json!(["t2"]), json!(["t1"])],
            &[],
        );
        assert_eq!(unparent.exit_code(), PARTIAL_FAILURE_EXIT);
        let error = unparent.results[1].error.as_ref().unwrap();
        assert_eq!(error.category, "resolution");

        let mutating = api.mutating_calls();
        assert_eq!(mutating.len(), 2);
        assert_eq!(mutating[0].name, "set_task_parent");
        assert_eq!(mutating[0].args, vec!["t3", "t1", "p5"]);
        assert_eq!(mutating[1].name, "unset_task_parent");
        assert_eq!(mutating[1].args, vec!["t2", "t1", "p1"]);
    }
}

#[cfg(test)]
mod handler_tests {
    use super::*;

    #[test]
    fn test_batch_file_through_handler() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("done.json");
        fs::write(&file, r#"[["t1"], ["missing"]]"#).unwrap();

        let api = FakeApi::new().with_task(task("t1", "p1", "One"));
        let settings = new_york();
        let outcome = handler(&dir, true, false)
            .run(
                &api,
                &settings,
                Invocation::Batch {
                    kind: BatchKind::Done,
                    file,
                },
            )
            .unwrap();

        assert_eq!(outcome.exit_code, PARTIAL_FAILURE_EXIT);
        let payload: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
        assert_eq!(payload["verb"], json!("batch-done"));
        assert_eq!(payload["total"], json!(2));
        assert_eq!(payload["succeeded"], json!(1));
        assert_eq!(payload["failed"], json!(1));
        assert_eq!(payload["results"][1]["error"]["category"], json!("resolution"));
    }

    #[test]
    fn test_missing_batch_file_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let api = FakeApi::new();
        let settings = new_york();

        let err = handler(&dir, false, true)
            .run(
                &api,
                &settings,
                Invocation::Batch {
                    kind: BatchKind::Delete,
                    file: dir.path().join("nope.json"),
                },
            )
            .unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("Batch file not found"));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_destructive_batch_with_yes_runs() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("delete.json");
        fs::write(&file, r#"[{"task_id": "t1", "project_id": "p1"}]"#).unwrap();

        let api = FakeApi::new().with_task(task("t1", "p1", "One"));
        let settings = new_york();
        let outcome = handler(&dir, false, true)
            .run(
                &api,
                &settings,
                Invocation::Batch {
                    kind: BatchKind::Delete,
                    file,
                },
            )
            .unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.output.contains("[0] ok"));
        assert!(api.task("t1").is_none());
    }

    #[test]
    fn test_batch_output_hides_access_token() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("done.json");
        fs::write(&file, r#"[["tok-SECRET-123"]]"#).unwrap();

        let api = FakeApi::new();
        let settings = settings(&[
            ("TZ", "America/New_York"),
            ("TICKTICK_ACCESS_TOKEN", "tok-SECRET-123"),
        ]);
        let outcome = handler(&dir, true, false)
            .run(
                &api,
                &settings,
                Invocation::Batch {
                    kind: BatchKind::Done,
                    file,
                },
            )
            .unwrap();

        assert_eq!(outcome.exit_code, PARTIAL_FAILURE_EXIT);
        assert!(!outcome.output.contains("tok-SECRET-123"));
        let payload: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
        let message = payload["results"][0]["error"]["message"].as_str().unwrap();
        assert!(message.contains("[REDACTED]"));
    }
}
