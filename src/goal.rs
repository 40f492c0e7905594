//! Desires, goals and intentions.
//!
//! A desire is a candidate objective. Reasoning promotes it into a goal; the
//! deliberation cycle commits a goal to one plan, forming an intention. An
//! agent holds at most one intention per goal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plan::Plan;

/// Lifecycle of a desire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesireStatus {
    /// Eligible for promotion.
    #[default]
    Active,
    /// Kept, but ignored by promotion until reactivated.
    Suspended,
    /// Turned into a goal.
    Promoted,
}

impl fmt::Display for DesireStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Promoted => write!(f, "promoted"),
        }
    }
}

/// A candidate goal not yet committed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desire {
    /// Id of the goal this desire becomes; also the action name that triggers it.
    pub id: String,
    pub description: String,
    pub priority: i64,
    #[serde(default)]
    pub status: DesireStatus,
}

impl Desire {
    pub fn new(id: impl Into<String>, description: impl Into<String>, priority: i64) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority,
            status: DesireStatus::Active,
        }
    }

    /// The goal this desire turns into.
    pub fn to_goal(&self, tick: u64) -> Goal {
        Goal {
            id: self.id.clone(),
            description: self.description.clone(),
            priority: self.priority,
            is_achieved: false,
            failures: 0,
            adopted_tick: tick,
        }
    }
}

/// An objective the agent is pursuing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub description: String,
    pub priority: i64,
    pub is_achieved: bool,
    /// Intentions aborted for this goal so far.
    #[serde(default)]
    pub failures: u32,
    /// Tick at which the goal was adopted.
    #[serde(default)]
    pub adopted_tick: u64,
}

impl Goal {
    pub fn new(id: impl Into<String>, description: impl Into<String>, priority: i64) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority,
            is_achieved: false,
            failures: 0,
            adopted_tick: 0,
        }
    }
}

/// Lifecycle of an intention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentionStatus {
    /// Committed, no task run yet.
    #[default]
    Pending,
    /// Ran a task on the agent's most recent cycle.
    Active,
    /// Started but not running: preempted by a higher-priority intention,
    /// or held by the caller.
    Suspended,
    /// Every task completed.
    Completed,
    /// Aborted by a task failure.
    Failed,
}

impl fmt::Display for IntentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A goal committed to a specific plan.
///
/// The intention owns a working copy of the plan, so task statuses are
/// private to the executing agent and the shared library stays untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intention {
    pub goal_id: String,
    pub plan: Plan,
    pub committed_tick: u64,
    #[serde(default)]
    pub status: IntentionStatus,
    /// Held by the caller; never selected for execution until resumed.
    #[serde(default)]
    pub held: bool,
}

impl Intention {
    pub fn new(goal_id: impl Into<String>, plan: Plan, committed_tick: u64) -> Self {
        Self {
            goal_id: goal_id.into(),
            plan,
            committed_tick,
            status: IntentionStatus::Pending,
            held: false,
        }
    }

    /// Whether the intention can be picked to run a task.
    pub fn is_runnable(&self) -> bool {
        !self.held && !self.is_finished()
    }

    /// Hold the intention. Returns `false` if already held or finished.
    pub fn suspend(&mut self) -> bool {
        if self.held || self.is_finished() {
            return false;
        }
        self.held = true;
        self.status = IntentionStatus::Suspended;
        true
    }

    /// Release a held intention. Returns `false` if it was not held.
    pub fn resume(&mut self) -> bool {
        if !self.held {
            return false;
        }
        self.held = false;
        if self.plan.completed_count() == 0 {
            self.status = IntentionStatus::Pending;
        }
        true
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, IntentionStatus::Completed | IntentionStatus::Failed)
    }

    /// Fraction of tasks completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.plan.steps.is_empty() {
            return 0.0;
        }
        self.plan.completed_count() as f64 / self.plan.steps.len() as f64
    }
}
