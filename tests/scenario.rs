//! File-backed scenario tests: TOML on disk into a running system.

use std::io::Write;

use mabos::error::ConfigError;
use mabos::event::SystemEvent;
use mabos::scenario::Scenario;
use serde_json::json;

const WAREHOUSE: &str = r#"
[scheduler]
parallel = true

[world.variables]
"crate.location" = "dock"
stock = 2

[[rules]]
condition = "stock < 5"
action = "restock"
probability = 0.9

[[rules]]
condition = "stock < 5"
action = "complain"
probability = 0.4

[[plans]]
id = "haul"
goal = "restock"
priority = 2
steps = [
    "Move to dock",
    "Pick up crate",
    "Move to shelf",
    "Put down crate",
    { description = "log the delivery", effects = { stock = 10 } },
    "Tell clerk: shelf restocked",
]

[[agents]]
id = "forklift"
capabilities = ["move", "pick_up", "put_down", "communicate"]
desires = [{ id = "restock", description = "keep the shelf stocked", priority = 3 }]

[[agents]]
id = "clerk"
reasoning = "passive"
"#;

fn write_scenario(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn warehouse_runs_to_completion() {
    let file = write_scenario(WAREHOUSE);
    let scenario = Scenario::load(file.path()).unwrap();
    let mut system = scenario.build().unwrap();
    assert!(system.config().parallel);

    let reports = system.run(7);
    assert_eq!(system.world().get("stock"), Some(&json!(10)));
    assert_eq!(system.world().get("crate.location"), Some(&json!("shelf")));

    let achieved = reports
        .iter()
        .flat_map(|r| &r.events)
        .filter(|e| matches!(e, SystemEvent::GoalAchieved { .. }))
        .count();
    assert_eq!(achieved, 1);

    // "complain" matches no desire and is only reported.
    assert!(reports[0].candidate_actions["forklift"].contains_key("complain"));

    let clerk = system.agent("clerk").unwrap();
    assert_eq!(
        clerk.beliefs().get("message.forklift").unwrap().value,
        json!("shelf restocked")
    );
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = Scenario::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn invalid_plan_fails_to_build() {
    let file = write_scenario(
        r#"
        [[plans]]
        id = "empty"
        goal = "g"
        steps = []
        "#,
    );
    let scenario = Scenario::load(file.path()).unwrap();
    let err = scenario.build().unwrap_err();
    assert!(err.to_string().contains("has no steps"));
}
