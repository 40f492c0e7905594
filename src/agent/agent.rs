//! Agent struct: beliefs, desires, goals and intentions of one BDI agent.
//!
//! An `Agent` is a single type composed of capabilities: its perception
//! scope, reasoning mode and task executor are configuration, not subclasses.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::belief::BeliefStore;
use crate::goal::{Desire, DesireStatus, Goal, Intention};
use crate::message::{AgentId, Message};
use crate::value::Facts;
use crate::world::PerceptionScope;

use super::executor::{ActionExecutor, TaskExecutor};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How an agent turns beliefs into candidate actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningMode {
    /// Boolean rule matching; every fired action has confidence 1.0.
    #[default]
    RuleBased,
    /// Rule probabilities combined with belief certainties as priors.
    Probabilistic,
    /// No reasoning. Goals come only from the caller.
    Passive,
}

/// Configuration for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Which world facts the agent perceives (default: all).
    pub perception: PerceptionScope,
    /// Certainty given to perceived facts (default: 1.0).
    pub perception_certainty: f64,
    /// Minimum certainty for a belief to count as a satisfied predicate (default: 0.5).
    pub belief_threshold: f64,
    /// Minimum action confidence that triggers a desire (default: 0.5).
    pub confidence_threshold: f64,
    pub reasoning: ReasoningMode,
    /// Action kinds the agent may perform; `None` allows all.
    pub capabilities: Option<BTreeSet<ActionKind>>,
    /// Aborted intentions after which a goal is abandoned; `None` retries forever.
    pub max_plan_failures: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            perception: PerceptionScope::All,
            perception_certainty: 1.0,
            belief_threshold: 0.5,
            confidence_threshold: 0.5,
            reasoning: ReasoningMode::RuleBased,
            capabilities: None,
            max_plan_failures: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A BDI agent driven by the scheduler, one deliberation cycle per tick.
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) config: AgentConfig,
    pub(crate) beliefs: BeliefStore,
    pub(crate) desires: Vec<Desire>,
    /// Active goals in adoption order.
    pub(crate) goals: Vec<Goal>,
    /// Goals reached so far, in achievement order.
    pub(crate) achieved: Vec<Goal>,
    /// At most one intention per goal, keyed by goal id.
    pub(crate) intentions: BTreeMap<String, Intention>,
    /// Last completed or failed intention per goal.
    pub(crate) retired: BTreeMap<String, Intention>,
    /// Messages delivered at the end of the previous tick.
    pub(crate) inbox: Vec<Message>,
    /// World facts seen at the last perceive.
    pub(crate) perceived: Facts,
    pub(crate) executor: Box<dyn TaskExecutor>,
    pub(crate) cycle_count: u64,
}

impl Agent {
    /// Create an agent with the default [`ActionExecutor`] limited to
    /// `config.capabilities`.
    pub fn new(id: impl Into<AgentId>, config: AgentConfig) -> Self {
        let executor = Box::new(ActionExecutor::new(config.capabilities.clone()));
        Self {
            id: id.into(),
            config,
            beliefs: BeliefStore::new(),
            desires: Vec::new(),
            goals: Vec::new(),
            achieved: Vec::new(),
            intentions: BTreeMap::new(),
            retired: BTreeMap::new(),
            inbox: Vec::new(),
            perceived: Facts::new(),
            executor,
            cycle_count: 0,
        }
    }

    /// Replace the task executor.
    pub fn with_executor(mut self, executor: Box<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn beliefs(&self) -> &BeliefStore {
        &self.beliefs
    }

    /// Direct access for seeding beliefs between ticks.
    pub fn beliefs_mut(&mut self) -> &mut BeliefStore {
        &mut self.beliefs
    }

    pub fn desires(&self) -> &[Desire] {
        &self.desires
    }

    pub fn desire(&self, id: &str) -> Option<&Desire> {
        self.desires.iter().find(|d| d.id == id)
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn achieved_goals(&self) -> &[Goal] {
        &self.achieved
    }

    pub fn intentions(&self) -> &BTreeMap<String, Intention> {
        &self.intentions
    }

    pub fn intention(&self, goal_id: &str) -> Option<&Intention> {
        self.intentions.get(goal_id)
    }

    /// The most recent intention for `goal_id` that completed or failed.
    pub fn retired_intention(&self, goal_id: &str) -> Option<&Intention> {
        self.retired.get(goal_id)
    }

    pub fn inbox(&self) -> &[Message] {
        &self.inbox
    }

    pub fn perceived(&self) -> &Facts {
        &self.perceived
    }

    /// Number of deliberation cycles run.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    // ── Desires ─────────────────────────────────────────────────────────

    /// Add a desire, replacing any desire with the same id.
    /// Returns `true` if the id was new.
    pub fn add_desire(&mut self, desire: Desire) -> bool {
        if let Some(existing) = self.desires.iter_mut().find(|d| d.id == desire.id) {
            *existing = desire;
            false
        } else {
            self.desires.push(desire);
            true
        }
    }

    /// Exclude a desire from promotion. Returns `false` if unknown or not active.
    pub fn suspend_desire(&mut self, id: &str) -> bool {
        self.set_desire_status(id, DesireStatus::Active, DesireStatus::Suspended)
    }

    /// Make a suspended desire eligible for promotion again.
    pub fn activate_desire(&mut self, id: &str) -> bool {
        self.set_desire_status(id, DesireStatus::Suspended, DesireStatus::Active)
    }

    fn set_desire_status(&mut self, id: &str, from: DesireStatus, to: DesireStatus) -> bool {
        match self.desires.iter_mut().find(|d| d.id == id) {
            Some(d) if d.status == from => {
                d.status = to;
                true
            }
            _ => false,
        }
    }

    // ── Goals ───────────────────────────────────────────────────────────

    /// Adopt a goal directly, bypassing desire promotion.
    ///
    /// Returns `false` if a goal with this id is already active. A desire
    /// with the same id is marked promoted.
    pub fn adopt_goal(&mut self, goal: Goal) -> bool {
        if self.goal(&goal.id).is_some() {
            return false;
        }
        if let Some(d) = self.desires.iter_mut().find(|d| d.id == goal.id) {
            d.status = DesireStatus::Promoted;
        }
        tracing::debug!(agent = %self.id, goal = %goal.id, priority = goal.priority, "goal adopted");
        self.goals.push(goal);
        true
    }

    /// Drop a goal and its intention.
    pub fn abandon_goal(&mut self, id: &str) -> Option<Goal> {
        let pos = self.goals.iter().position(|g| g.id == id)?;
        self.intentions.remove(id);
        Some(self.goals.remove(pos))
    }

    // ── Intentions ──────────────────────────────────────────────────────

    /// Hold the intention for `goal_id`. It keeps its progress and its goal
    /// gets no new plan, but no task runs until [`resume_intention`](Self::resume_intention).
    pub fn suspend_intention(&mut self, goal_id: &str) -> bool {
        let held = self.intentions.get_mut(goal_id).is_some_and(Intention::suspend);
        if held {
            tracing::debug!(agent = %self.id, goal = %goal_id, "intention suspended");
        }
        held
    }

    /// Release a held intention.
    pub fn resume_intention(&mut self, goal_id: &str) -> bool {
        let resumed = self.intentions.get_mut(goal_id).is_some_and(Intention::resume);
        if resumed {
            tracing::debug!(agent = %self.id, goal = %goal_id, "intention resumed");
        }
        resumed
    }

    /// Highest priority among active goals.
    pub(crate) fn top_goal_priority(&self) -> Option<i64> {
        self.goals.iter().map(|g| g.priority).max()
    }

    pub(crate) fn deliver(&mut self, message: Message) {
        self.inbox.push(message);
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("beliefs", &self.beliefs.len())
            .field("desires", &self.desires.len())
            .field("goals", &self.goals.len())
            .field("intentions", &self.intentions.len())
            .field("retired", &self.retired.len())
            .field("inbox", &self.inbox.len())
            .field("cycle_count", &self.cycle_count)
            .finish()
    }
}
