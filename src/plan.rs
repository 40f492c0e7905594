//! Plans and the goal-indexed plan library.
//!
//! A `Plan` is an ordered list of `Task`s guarded by a conjunction of
//! precondition predicates. The library stores plans per goal in insertion
//! order and selects, for a given state, the highest-priority plan whose
//! preconditions all hold.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{ConfigError, ConfigResult};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Status of an individual task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet executed.
    #[default]
    Pending,
    /// Handed to the executor this tick.
    InProgress,
    /// Completed successfully.
    Completed,
    /// Executor reported failure.
    Failed,
}

/// A single step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    /// What the task does to the world, if anything.
    #[serde(default)]
    pub action: Option<Action>,
    /// World variables assigned when the task completes.
    #[serde(default)]
    pub effects: BTreeMap<String, Value>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// A bookkeeping task with no action.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            action: None,
            effects: BTreeMap::new(),
            status: TaskStatus::Pending,
        }
    }

    /// A task whose action is parsed from its description.
    pub fn parse(id: impl Into<String>, description: &str) -> ConfigResult<Self> {
        let action = Action::parse(description)?;
        Ok(Self::new(id, description).with_action(action))
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_effect(mut self, key: impl Into<String>, value: Value) -> Self {
        self.effects.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// An ordered sequence of tasks for achieving a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    /// Which goal this plan serves.
    pub goal_id: String,
    /// Higher wins during selection.
    pub priority: i64,
    /// Predicates that must all hold for the plan to be applicable.
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub steps: Vec<Task>,
}

impl Plan {
    pub fn new(id: impl Into<String>, goal_id: impl Into<String>, priority: i64) -> Self {
        Self {
            id: id.into(),
            goal_id: goal_id.into(),
            priority,
            preconditions: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_precondition(mut self, predicate: impl Into<String>) -> Self {
        self.preconditions.push(predicate.into());
        self
    }

    pub fn with_step(mut self, task: Task) -> Self {
        self.steps.push(task);
        self
    }

    /// Whether every precondition appears in `current_state`.
    ///
    /// An empty precondition list is vacuously satisfied.
    pub fn is_applicable(&self, current_state: &[String]) -> bool {
        self.preconditions
            .iter()
            .all(|p| current_state.iter().any(|s| s == p))
    }

    /// Index of the next pending task.
    pub fn next_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.status == TaskStatus::Pending)
    }

    pub fn set_status(&mut self, index: usize, status: TaskStatus) {
        if let Some(task) = self.steps.get_mut(index) {
            task.status = status;
        }
    }

    /// Whether every task completed.
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status == TaskStatus::Completed)
    }

    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == TaskStatus::Completed)
            .count()
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptyPlan {
                plan_id: self.id.clone(),
                goal_id: self.goal_id.clone(),
            });
        }
        if self.preconditions.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::BlankPrecondition {
                plan_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Plan library
// ---------------------------------------------------------------------------

/// Goal-indexed repository of plans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanLibrary {
    plans: BTreeMap<String, Vec<Plan>>,
}

impl PlanLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plan to its goal's bucket.
    ///
    /// Rejects plans without steps, with blank preconditions, or whose id is
    /// already used within the same goal.
    pub fn add_plan(&mut self, plan: Plan) -> ConfigResult<()> {
        plan.validate()?;
        let bucket = self.plans.entry(plan.goal_id.clone()).or_default();
        if bucket.iter().any(|p| p.id == plan.id) {
            return Err(ConfigError::DuplicatePlan {
                plan_id: plan.id,
                goal_id: plan.goal_id,
            });
        }
        tracing::debug!(plan = %plan.id, goal = %plan.goal_id, priority = plan.priority, "plan added");
        bucket.push(plan);
        Ok(())
    }

    /// Remove a plan. Returns whether it existed.
    pub fn remove_plan(&mut self, plan_id: &str, goal_id: &str) -> bool {
        let Some(bucket) = self.plans.get_mut(goal_id) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|p| p.id != plan_id);
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            self.plans.remove(goal_id);
        }
        removed
    }

    /// Replace a plan by id: remove-then-add.
    ///
    /// The previous version is the copy in the plan's own goal bucket when
    /// there is one, otherwise the first copy with the same id in any other
    /// bucket, so changing `goal_id` moves the plan. The replacement is
    /// appended to the end of its bucket. Nothing is removed when the
    /// replacement is invalid.
    pub fn update_plan(&mut self, plan: Plan) -> ConfigResult<()> {
        plan.validate()?;
        let in_own_bucket = self
            .get_plans_for_goal(&plan.goal_id)
            .iter()
            .any(|p| p.id == plan.id);
        let previous_goal = if in_own_bucket {
            Some(plan.goal_id.clone())
        } else {
            self.plans
                .iter()
                .find(|(_, bucket)| bucket.iter().any(|p| p.id == plan.id))
                .map(|(goal, _)| goal.clone())
        };
        // The target bucket no longer holds the id, so the add cannot fail.
        if let Some(goal) = previous_goal {
            self.remove_plan(&plan.id, &goal);
        }
        self.add_plan(plan)
    }

    /// Plans for a goal, in insertion order.
    pub fn get_plans_for_goal(&self, goal_id: &str) -> &[Plan] {
        self.plans.get(goal_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest-priority applicable plan for `goal_id`; ties go to the plan
    /// added first. `None` when nothing is applicable.
    pub fn select_plan(&self, goal_id: &str, current_state: &[String]) -> Option<&Plan> {
        let mut best: Option<&Plan> = None;
        for plan in self.get_plans_for_goal(goal_id) {
            if !plan.is_applicable(current_state) {
                continue;
            }
            if best.is_none_or(|b| plan.priority > b.priority) {
                best = Some(plan);
            }
        }
        best
    }

    /// Goal ids that have at least one plan.
    pub fn goals(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    /// Total number of plans.
    pub fn len(&self) -> usize {
        self.plans.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(preds: &[&str]) -> Vec<String> {
        preds.iter().map(|s| s.to_string()).collect()
    }

    fn plan(id: &str, goal: &str, priority: i64, pre: &[&str]) -> Plan {
        let mut p = Plan::new(id, goal, priority).with_step(Task::new(format!("{id}-1"), "step"));
        for c in pre {
            p = p.with_precondition(*c);
        }
        p
    }

    #[test]
    fn higher_priority_inapplicable_plan_is_skipped() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("A", "G", 5, &["has_tool"])).unwrap();
        lib.add_plan(plan("B", "G", 9, &["has_tool", "has_permit"])).unwrap();

        let chosen = lib.select_plan("G", &state(&["has_tool"])).unwrap();
        assert_eq!(chosen.id, "A");

        let chosen = lib
            .select_plan("G", &state(&["has_tool", "has_permit"]))
            .unwrap();
        assert_eq!(chosen.id, "B");
    }

    #[test]
    fn ties_go_to_first_added() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("first", "G", 3, &[])).unwrap();
        lib.add_plan(plan("second", "G", 3, &[])).unwrap();
        assert_eq!(lib.select_plan("G", &[]).unwrap().id, "first");
    }

    #[test]
    fn empty_preconditions_always_apply() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("free", "G", 1, &[])).unwrap();
        assert_eq!(lib.select_plan("G", &[]).unwrap().id, "free");
    }

    #[test]
    fn no_applicable_plan_is_none() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("A", "G", 5, &["x"])).unwrap();
        assert!(lib.select_plan("G", &state(&["y"])).is_none());
        assert!(lib.select_plan("unknown", &state(&["x"])).is_none());
    }

    #[test]
    fn selected_plan_preconditions_are_subset_of_state() {
        let mut lib = PlanLibrary::new();
        let preds = ["a", "b", "c"];
        let pres: [&[&str]; 5] = [&["a"], &["a", "b"], &["c"], &["a", "b", "c"], &["d"]];
        for (i, pre) in pres.iter().enumerate() {
            lib.add_plan(plan(&format!("p{i}"), "G", i as i64, pre)).unwrap();
        }
        for mask in 0..8u8 {
            let current: Vec<String> = preds
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, p)| p.to_string())
                .collect();
            if let Some(chosen) = lib.select_plan("G", &current) {
                assert!(chosen.preconditions.iter().all(|p| current.contains(p)));
            }
        }
    }

    #[test]
    fn get_plans_keeps_insertion_order() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("low", "G", 1, &[])).unwrap();
        lib.add_plan(plan("high", "G", 9, &[])).unwrap();
        let ids: Vec<&str> = lib.get_plans_for_goal("G").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["low", "high"]);
    }

    #[test]
    fn remove_plan_drops_empty_bucket() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("A", "G", 1, &[])).unwrap();
        assert!(lib.remove_plan("A", "G"));
        assert!(!lib.remove_plan("A", "G"));
        assert!(lib.is_empty());
        assert_eq!(lib.goals().count(), 0);
    }

    #[test]
    fn update_moves_plan_between_goals() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("A", "G1", 1, &[])).unwrap();
        lib.update_plan(plan("A", "G2", 4, &[])).unwrap();
        assert!(lib.get_plans_for_goal("G1").is_empty());
        assert_eq!(lib.get_plans_for_goal("G2")[0].priority, 4);
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn update_prefers_own_goal_bucket() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("A", "G1", 1, &[])).unwrap();
        lib.add_plan(plan("A", "G2", 1, &[])).unwrap();

        lib.update_plan(plan("A", "G2", 7, &[])).unwrap();
        assert_eq!(lib.get_plans_for_goal("G1").len(), 1);
        assert_eq!(lib.get_plans_for_goal("G1")[0].priority, 1);
        assert_eq!(lib.get_plans_for_goal("G2").len(), 1);
        assert_eq!(lib.get_plans_for_goal("G2")[0].priority, 7);
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn invalid_update_keeps_previous_plan() {
        let mut lib = PlanLibrary::new();
        lib.add_plan(plan("A", "G", 3, &[])).unwrap();
        assert!(matches!(
            lib.update_plan(Plan::new("A", "G", 9)),
            Err(ConfigError::EmptyPlan { .. })
        ));
        assert_eq!(lib.get_plans_for_goal("G")[0].priority, 3);
    }

    #[test]
    fn authoring_errors_are_rejected() {
        let mut lib = PlanLibrary::new();
        assert!(matches!(
            lib.add_plan(Plan::new("empty", "G", 1)),
            Err(ConfigError::EmptyPlan { .. })
        ));
        assert!(matches!(
            lib.add_plan(plan("blank", "G", 1, &[" "])),
            Err(ConfigError::BlankPrecondition { .. })
        ));
        lib.add_plan(plan("A", "G", 1, &[])).unwrap();
        assert!(matches!(
            lib.add_plan(plan("A", "G", 2, &[])),
            Err(ConfigError::DuplicatePlan { .. })
        ));
    }

    #[test]
    fn task_status_bookkeeping() {
        let mut p = Plan::new("p", "g", 1)
            .with_step(Task::new("t1", "one"))
            .with_step(Task::new("t2", "two"));
        assert_eq!(p.next_pending(), Some(0));
        p.set_status(0, TaskStatus::Completed);
        assert_eq!(p.next_pending(), Some(1));
        assert!(!p.is_complete());
        p.set_status(1, TaskStatus::Completed);
        assert!(p.is_complete());
        assert_eq!(p.completed_count(), 2);
    }

    #[test]
    fn task_parse_sets_action() {
        let t = Task::parse("t", "Move to dock").unwrap();
        assert!(matches!(t.action, Some(Action::Move { .. })));
        assert!(Task::parse("t", "sing").is_err());
    }
}
