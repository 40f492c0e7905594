//! Task executors: how an agent turns a plan step into effects.
//!
//! Executors are pure with respect to the world. They return what the task
//! does; the scheduler applies it after every agent has deliberated.

use std::collections::BTreeSet;

use crate::action::{Action, ActionKind};
use crate::plan::Task;
use crate::value::Value;
use crate::world::WorldState;

use super::error::{TaskError, TaskResult};

/// Something a completed task contributes to the tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEffect {
    /// Perform an action; the scheduler derives its world mutations.
    Act(Action),
    /// Assign a world variable directly.
    Assign { key: String, value: Value },
}

/// Executes one task on behalf of an agent.
pub trait TaskExecutor: Send + Sync {
    /// Run `task` for `agent` against a read-only view of the world.
    fn execute(&self, agent: &str, task: &Task, world: &WorldState) -> TaskResult<Vec<TaskEffect>>;
}

/// Default executor: emits the task's action and effects, refusing actions
/// outside the agent's capability set.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    /// `None` allows every action kind.
    capabilities: Option<BTreeSet<ActionKind>>,
}

impl ActionExecutor {
    pub fn new(capabilities: Option<BTreeSet<ActionKind>>) -> Self {
        Self { capabilities }
    }

    pub fn has_capability(&self, kind: ActionKind) -> bool {
        self.capabilities
            .as_ref()
            .is_none_or(|caps| caps.contains(&kind))
    }
}

impl TaskExecutor for ActionExecutor {
    fn execute(&self, _agent: &str, task: &Task, _world: &WorldState) -> TaskResult<Vec<TaskEffect>> {
        let mut effects = Vec::with_capacity(1 + task.effects.len());
        if let Some(action) = &task.action {
            let kind = action.kind();
            if !self.has_capability(kind) {
                return Err(TaskError::MissingCapability {
                    task: task.id.clone(),
                    kind,
                });
            }
            effects.push(TaskEffect::Act(action.clone()));
        }
        effects.extend(task.effects.iter().map(|(key, value)| TaskEffect::Assign {
            key: key.clone(),
            value: value.clone(),
        }));
        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emits_action_then_effects() {
        let task = Task::parse("t", "Move to dock")
            .unwrap()
            .with_effect("dock.busy", json!(true));
        let out = ActionExecutor::default()
            .execute("robot", &task, &WorldState::new())
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], TaskEffect::Act(Action::Move { .. })));
        assert_eq!(
            out[1],
            TaskEffect::Assign {
                key: "dock.busy".into(),
                value: json!(true)
            }
        );
    }

    #[test]
    fn missing_capability_fails() {
        let exec = ActionExecutor::new(Some([ActionKind::Move].into()));
        let task = Task::parse("t", "Pick up crate").unwrap();
        let err = exec.execute("robot", &task, &WorldState::new()).unwrap_err();
        assert!(matches!(
            err,
            TaskError::MissingCapability {
                kind: ActionKind::PickUp,
                ..
            }
        ));
    }

    #[test]
    fn bookkeeping_task_needs_no_capability() {
        let exec = ActionExecutor::new(Some(BTreeSet::new()));
        let task = Task::new("t", "note");
        assert!(exec.execute("a", &task, &WorldState::new()).unwrap().is_empty());
    }
}
