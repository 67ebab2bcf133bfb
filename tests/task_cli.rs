mod support;

use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

use support::TestHome;

#[test]
fn add_list_toggle_rm_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();

    let milk = home.add(&["Buy milk", "-p", "low", "-c", "life"])?;
    let report = home.add(&[
        "Write report",
        "--priority",
        "high",
        "--due",
        "2024-05-01",
        "-d",
        "Quarterly numbers",
    ])?;

    let tasks = home.read_tasks()?;
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["title"], "Buy milk");
    assert_eq!(tasks[0]["completed"], false);
    assert_eq!(tasks[1]["dueDate"], "2024-05-01");

    let list = home.td_json(&["list", "--sort", "priority"])?;
    assert_eq!(list["schema_version"], "td.v1");
    assert_eq!(list["command"], "list");
    assert_eq!(list["data"]["roots"][0]["task"]["id"].as_u64(), Some(report));
    assert_eq!(list["data"]["remaining"], 2);

    let toggled = home.td_json(&["toggle", &milk.to_string()])?;
    assert_eq!(toggled["data"]["completed"], true);

    let active = home.td_json(&["list", "--status", "active"])?;
    let roots = active["data"]["roots"].as_array().cloned().unwrap_or_default();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["task"]["title"], "Write report");

    home.td()
        .args(["list", "-s", "QUARTERLY"])
        .assert()
        .success()
        .stdout(contains("Write report"))
        .stdout(contains("Buy milk").not());

    let removed = home.td_json(&["rm", &report.to_string()])?;
    assert_eq!(removed["data"]["count"], 1);
    assert_eq!(home.read_tasks()?.len(), 1);

    Ok(())
}

#[test]
fn blank_title_is_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    home.add(&["Keep"])?;

    let value = home.td_json(&["add", "   "])?;
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["added"], false);
    assert_eq!(home.read_tasks()?.len(), 1);
    Ok(())
}

#[test]
fn subtasks_cascade_on_delete() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let parent = home.add(&["Plan trip"])?;
    let other = home.add(&["Other"])?;
    home.add(&["Book hotel", "--parent", &parent.to_string()])?;
    home.add(&["Buy tickets", "--parent", &parent.to_string()])?;

    let list = home.td_json(&["list", "--expand", &parent.to_string()])?;
    let first = &list["data"]["roots"][0];
    assert_eq!(first["child_count"], 2);
    assert_eq!(first["expanded"], true);
    assert_eq!(first["children"][1]["title"], "Buy tickets");

    let removed = home.td_json(&["rm", &parent.to_string()])?;
    assert_eq!(removed["data"]["count"], 3);

    let tasks = home.read_tasks()?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"].as_u64(), Some(other));
    Ok(())
}

#[test]
fn subtask_of_subtask_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let parent = home.add(&["Parent"])?;
    let child = home.add(&["Child", "--parent", &parent.to_string()])?;

    home.td()
        .args(["add", "Grandchild", "--parent", &child.to_string()])
        .assert()
        .code(2)
        .stderr(contains("only top-level tasks"));
    Ok(())
}

#[test]
fn unknown_ids_are_user_errors() {
    let home = TestHome::new();

    home.td()
        .args(["toggle", "12345"])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));

    home.td()
        .args(["--json", "rm", "12345"])
        .assert()
        .code(2)
        .stdout(contains("\"status\": \"error\""))
        .stdout(contains("\"kind\": \"user_error\""));

    home.td().args(["toggle", "abc"]).assert().code(2);
}

#[test]
fn invalid_inputs_are_rejected() {
    let home = TestHome::new();

    home.td()
        .args(["add", "Dated", "--due", "tomorrow"])
        .assert()
        .code(2)
        .stderr(contains("invalid due date"));
    home.td()
        .args(["add", "X", "-p", "urgent"])
        .assert()
        .code(2);
    home.td()
        .args(["list", "--status", "open"])
        .assert()
        .code(2);
}

#[test]
fn clear_requires_confirmation() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let done = home.add(&["Done"])?;
    home.add(&["Open"])?;
    home.add(&["Child of done", "--parent", &done.to_string()])?;
    home.td().args(["toggle", &done.to_string()]).assert().success();

    home.td()
        .args(["--json", "clear"])
        .assert()
        .code(2)
        .stdout(contains("--yes"));

    home.td()
        .arg("clear")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(contains("Cancelled"));
    assert_eq!(home.read_tasks()?.len(), 3);

    home.td()
        .arg("clear")
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(contains("Completed tasks cleared"));

    let tasks = home.read_tasks()?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Open");

    let value = home.td_json(&["clear", "--yes"])?;
    assert_eq!(value["data"]["count"], 0);
    Ok(())
}

#[test]
fn corrupt_store_reads_as_empty() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    home.write_tasks("{definitely not json")?;

    let list = home.td_json(&["list"])?;
    assert_eq!(list["data"]["roots"], Value::Array(Vec::new()));

    home.add(&["Fresh start"])?;
    assert_eq!(home.read_tasks()?.len(), 1);
    Ok(())
}

#[test]
fn legacy_store_is_upgraded() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    home.write_tasks(r#"[{"id": 1, "text": "Old task", "completed": false}]"#)?;

    home.td()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("Old task (medium, work)"));
    Ok(())
}

#[test]
fn config_defaults_apply_to_new_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    home.write_config("[defaults]\ncategory = \"study\"\npriority = \"low\"\n")?;

    home.add(&["Read chapter"])?;
    let tasks = home.read_tasks()?;
    assert_eq!(tasks[0]["category"], "study");
    assert_eq!(tasks[0]["priority"], "low");
    Ok(())
}

#[test]
fn high_priority_add_emits_notification_event() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let events = home.path().join("events.jsonl");
    let events_arg = events.to_string_lossy().to_string();

    home.td()
        .args(["add", "Call the bank", "-p", "high", "--events", &events_arg])
        .assert()
        .success();
    home.td()
        .args(["add", "Routine", "--events", &events_arg])
        .assert()
        .success();

    let content = std::fs::read_to_string(&events)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    let event: Value = serde_json::from_str(lines[0])?;
    assert_eq!(event["event"], "task_notification");
    assert_eq!(event["data"]["body"], "Call the bank");
    Ok(())
}
