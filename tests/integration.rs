//! End-to-end integration tests for the mabos kernel.
//!
//! These tests drive whole systems through the scheduler and check the
//! properties that only show up across ticks: message latency, the absence
//! of false progress, idempotence at rest and recovery from task failure.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use mabos::action::Action;
use mabos::agent::{
    Agent, AgentConfig, ReasoningMode, TaskEffect, TaskError, TaskExecutor, TaskResult,
};
use mabos::event::SystemEvent;
use mabos::goal::{Desire, Goal, IntentionStatus};
use mabos::message::MessageContent;
use mabos::plan::{Plan, PlanLibrary, Task};
use mabos::reason::ReasoningEngine;
use mabos::scheduler::Scheduler;
use mabos::world::{WorldMutation, WorldState};
use serde_json::json;

fn set(world: &mut WorldState, key: &str, value: serde_json::Value) {
    world.apply(&WorldMutation::Set {
        key: key.into(),
        value,
    });
}

fn agent_with_goal(id: &str, goal: &str, priority: i64) -> Agent {
    let mut agent = Agent::new(id, AgentConfig::default());
    agent.adopt_goal(Goal::new(goal, goal, priority));
    agent
}

#[test]
fn reasoning_reference_example() {
    let mut engine = ReasoningEngine::default();
    engine
        .add_rule("temperature > 30", "turn_on_air_conditioning", 0.8)
        .unwrap();
    let facts = BTreeMap::from([("temperature".to_string(), json!(32))]);

    let fired = engine.rule_based_reasoning(&facts);
    assert_eq!(
        fired.into_iter().collect::<Vec<_>>(),
        vec!["turn_on_air_conditioning"]
    );

    let priors = BTreeMap::from([("temperature".to_string(), 0.6)]);
    let confidences = engine.probabilistic_reasoning(&facts, &priors);
    let c = confidences["turn_on_air_conditioning"];
    assert!((c - 0.857).abs() < 1e-3, "got {c}");
}

#[test]
fn plan_selection_reference_example() {
    let mut library = PlanLibrary::new();
    library
        .add_plan(
            Plan::new("A", "G", 5)
                .with_precondition("has_tool")
                .with_step(Task::new("a1", "work")),
        )
        .unwrap();
    library
        .add_plan(
            Plan::new("B", "G", 9)
                .with_precondition("has_tool")
                .with_precondition("has_permit")
                .with_step(Task::new("b1", "work")),
        )
        .unwrap();
    let state = vec!["has_tool".to_string()];
    assert_eq!(library.select_plan("G", &state).unwrap().id, "A");
}

#[test]
fn message_visible_only_on_next_tick() {
    let mut system = Scheduler::default();
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(
            Plan::new("announce", "share", 1).with_step(
                Task::new("tell", "tell the door state").with_action(Action::Communicate {
                    recipient: Some("bob".into()),
                    content: MessageContent::inform("door", json!("open"), 0.9),
                }),
            ),
        )
        .unwrap();
    system.register_agent(agent_with_goal("amy", "share", 1)).unwrap();
    system
        .register_agent(Agent::new("bob", AgentConfig::default()))
        .unwrap();

    let report = system.step();
    assert_eq!(report.messages.len(), 1);
    assert_eq!(report.messages[0].tick, 1);
    let bob = system.agent("bob").unwrap();
    assert_eq!(bob.inbox().len(), 1);
    assert!(bob.beliefs().get("door").is_none());

    system.step();
    let bob = system.agent("bob").unwrap();
    assert!(bob.inbox().is_empty());
    let belief = bob.beliefs().get("door").unwrap();
    assert_eq!(belief.value, json!("open"));
    assert_eq!(belief.certainty, 0.9);
}

#[test]
fn request_message_becomes_receiver_desire() {
    let mut system = Scheduler::default();
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(
            Plan::new("ask", "delegate", 1).with_step(Task::new("req", "ask for help").with_action(
                Action::Communicate {
                    recipient: Some("helper".into()),
                    content: MessageContent::request("assist", "assist the boss", 4),
                },
            )),
        )
        .unwrap();
    system.register_agent(agent_with_goal("boss", "delegate", 1)).unwrap();
    system
        .register_agent(Agent::new("helper", AgentConfig::default()))
        .unwrap();

    system.run(2);
    let helper = system.agent("helper").unwrap();
    assert_eq!(helper.desire("assist").unwrap().priority, 4);
}

#[test]
fn no_false_progress_without_applicable_plans() {
    let mut system = Scheduler::default();
    set(system.world_mut().unwrap(), "weather", json!("rain"));
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(
            Plan::new("dry-run", "deliver", 3)
                .with_precondition("weather=sun")
                .with_step(Task::parse("go", "Move to market").unwrap()),
        )
        .unwrap();
    for id in ["a", "b", "c"] {
        system.register_agent(agent_with_goal(id, "deliver", 1)).unwrap();
    }
    let before = system.world().clone();

    for report in system.run(6) {
        assert!(report.applied.is_empty());
        for agent in system.agents() {
            assert_eq!(agent.goals().len(), 1);
            assert!(agent.goals().iter().all(|g| !g.is_achieved));
            assert!(agent.intentions().is_empty());
        }
        assert!(report.events.iter().all(|e| matches!(
            e,
            SystemEvent::PlanNotApplicable { .. } | SystemEvent::AgentAdmitted { .. }
        )));
    }
    assert_eq!(system.world(), &before);
}

#[test]
fn step_is_idempotent_at_rest() {
    let mut system = Scheduler::default();
    set(system.world_mut().unwrap(), "lamp", json!(true));
    system.reasoning_mut().unwrap().add_rule("lamp", "read_book", 0.7).unwrap();
    system
        .register_agent(Agent::new("reader", AgentConfig::default()))
        .unwrap();

    let first = system.step();
    let world_after_first = system.world().clone();
    let second = system.step();
    assert_eq!(system.world(), &world_after_first);
    assert_eq!(first.applied, second.applied);
    assert_eq!(first.candidate_actions, second.candidate_actions);
}

#[test]
fn work_finishes_then_world_settles() {
    let mut system = Scheduler::default();
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(
            Plan::new("haul", "fetch", 1)
                .with_step(Task::parse("go", "Move to dock").unwrap())
                .with_step(Task::parse("grab", "Pick up crate").unwrap())
                .with_step(Task::parse("back", "Move to base").unwrap())
                .with_step(Task::parse("drop", "Put down crate").unwrap()),
        )
        .unwrap();
    set(system.world_mut().unwrap(), "crate.location", json!("dock"));
    system.register_agent(agent_with_goal("robot", "fetch", 1)).unwrap();

    let reports = system.run(4);
    assert!(
        reports[3]
            .events
            .iter()
            .any(|e| matches!(e, SystemEvent::GoalAchieved { .. }))
    );
    assert_eq!(system.world().get("crate.location"), Some(&json!("base")));

    let settled = system.world().clone();
    system.run(2);
    assert_eq!(system.world(), &settled);
}

#[test]
fn at_most_one_intention_per_goal_at_every_boundary() {
    let mut system = Scheduler::default();
    for (id, priority) in [("p1", 1), ("p2", 2), ("p3", 2)] {
        system
            .plan_library_mut()
            .unwrap()
            .add_plan(
                Plan::new(id, "g", priority)
                    .with_step(Task::parse("a", "Use hammer").unwrap())
                    .with_step(Task::parse("b", "Use saw").unwrap()),
            )
            .unwrap();
    }
    let mut agent = agent_with_goal("a", "g", 1);
    agent.adopt_goal(Goal::new("other", "no plans", 5));
    system.register_agent(agent).unwrap();

    for _ in 0..4 {
        system.step();
        let agent = system.agent("a").unwrap();
        for goal_id in agent.intentions().keys() {
            assert!(agent.goal(goal_id).is_some());
        }
        assert!(agent.intentions().len() <= agent.goals().len());
    }
}

/// Fails the first `failures` executions, then succeeds.
struct Flaky {
    calls: AtomicUsize,
    failures: usize,
}

impl TaskExecutor for Flaky {
    fn execute(&self, _agent: &str, task: &Task, _world: &WorldState) -> TaskResult<Vec<TaskEffect>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(TaskError::Execution {
                task: task.id.clone(),
                message: "jammed".into(),
            });
        }
        Ok(task.action.clone().map(TaskEffect::Act).into_iter().collect())
    }
}

#[test]
fn failure_aborts_intention_and_next_tick_reselects() {
    let mut system = Scheduler::default();
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(Plan::new("p", "g", 1).with_step(Task::parse("t", "Interact with valve").unwrap()))
        .unwrap();
    let agent = agent_with_goal("fixer", "g", 1).with_executor(Box::new(Flaky {
        calls: AtomicUsize::new(0),
        failures: 1,
    }));
    system.register_agent(agent).unwrap();

    let first = system.step();
    assert!(first.applied.is_empty());
    assert!(first.events.iter().any(|e| matches!(
        e,
        SystemEvent::IntentionAborted { reason, .. } if reason.contains("jammed")
    )));
    assert_eq!(system.agent("fixer").unwrap().goal("g").unwrap().failures, 1);

    let second = system.step();
    assert!(second.events.iter().any(|e| matches!(e, SystemEvent::IntentionCommitted { .. })));
    assert!(second.events.iter().any(|e| matches!(e, SystemEvent::GoalAchieved { .. })));
    assert_eq!(second.applied.len(), 1);
}

#[test]
fn probabilistic_agent_promotes_desire_from_world() {
    let mut system = Scheduler::default();
    set(system.world_mut().unwrap(), "temperature", json!(34));
    system
        .reasoning_mut()
        .unwrap()
        .add_rule("temperature > 30", "cool_down", 0.8)
        .unwrap();
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(
            Plan::new("fan", "cool_down", 1)
                .with_step(Task::new("t", "fan on").with_effect("temperature", json!(22))),
        )
        .unwrap();

    let config = AgentConfig {
        reasoning: ReasoningMode::Probabilistic,
        perception_certainty: 0.6,
        ..AgentConfig::default()
    };
    let mut hvac = Agent::new("hvac", config);
    hvac.add_desire(Desire::new("cool_down", "keep it cool", 2));
    system.register_agent(hvac).unwrap();

    let report = system.step();
    assert!(report.events.iter().any(|e| matches!(e, SystemEvent::GoalAdopted { .. })));
    assert_eq!(system.world().get("temperature"), Some(&json!(22)));
}

#[test]
fn removed_agent_no_longer_receives_messages() {
    let mut system = Scheduler::default();
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(
            Plan::new("chat", "talk", 1)
                .with_step(Task::parse("1", "Move to hall").unwrap())
                .with_step(Task::parse("2", "Tell bob: hello").unwrap()),
        )
        .unwrap();
    system.register_agent(agent_with_goal("amy", "talk", 1)).unwrap();
    system
        .register_agent(Agent::new("bob", AgentConfig::default()))
        .unwrap();

    system.step();
    let bob = system.remove_agent("bob").unwrap();
    assert_eq!(bob.id(), "bob");

    let report = system.step();
    assert!(report.messages.is_empty());
    assert!(report.events.contains(&SystemEvent::MessageDropped {
        from: "amy".into(),
        to: "bob".into()
    }));
}

#[test]
fn suspended_intention_waits_between_ticks() {
    let mut system = Scheduler::default();
    system
        .plan_library_mut()
        .unwrap()
        .add_plan(
            Plan::new("haul", "fetch", 1)
                .with_step(Task::parse("go", "Move to dock").unwrap())
                .with_step(Task::parse("back", "Move to base").unwrap()),
        )
        .unwrap();
    system.register_agent(agent_with_goal("robot", "fetch", 1)).unwrap();

    system.step();
    assert_eq!(system.world().get("robot.location"), Some(&json!("dock")));
    assert!(system.agent_mut("robot").unwrap().suspend_intention("fetch"));

    let report = system.run(2);
    assert!(report.iter().all(|r| r.applied.is_empty()));
    assert_eq!(
        system.agent("robot").unwrap().intention("fetch").unwrap().status,
        IntentionStatus::Suspended
    );

    assert!(system.agent_mut("robot").unwrap().resume_intention("fetch"));
    let report = system.step();
    assert!(report.events.iter().any(|e| matches!(e, SystemEvent::GoalAchieved { .. })));
    assert_eq!(system.world().get("robot.location"), Some(&json!("base")));
}
