//! Multi-agent scheduler: lock-step ticks over a shared world.
//!
//! A tick has two halves. [`Scheduler::begin_tick`] lets every agent
//! deliberate against the same frozen world, in ascending id order.
//! [`Scheduler::commit_tick`] is the serial barrier: it applies world
//! mutations in agent-id order (last writer wins), routes messages into
//! inboxes for the next perceive, writes variable changes through to the
//! knowledge store and processes deferred removals. [`Scheduler::step`] runs
//! both halves. The agent registry is locked while a tick is open.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, CycleOutcome, DeliberationContext, TaskEffect};
use crate::error::{RegistryError, RegistryResult};
use crate::event::{EventSink, SystemEvent};
use crate::knowledge::KnowledgeStore;
use crate::message::{AgentId, Message};
use crate::plan::PlanLibrary;
use crate::reason::ReasoningEngine;
use crate::world::{WorldMutation, WorldState};

// ---------------------------------------------------------------------------
// Configuration and reports
// ---------------------------------------------------------------------------

/// Scheduler settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Deliberate agents on the rayon pool. Results are still applied in id order.
    pub parallel: bool,
}

/// Everything that happened in one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// World mutations in the order they were applied.
    pub applied: Vec<WorldMutation>,
    /// Messages routed this tick; receivers see them next tick.
    pub messages: Vec<Message>,
    pub events: Vec<SystemEvent>,
    /// Per agent, reasoned actions that matched no desire.
    pub candidate_actions: BTreeMap<AgentId, BTreeMap<String, f64>>,
}

/// Deliberation results waiting for the apply barrier.
struct OpenTick {
    tick: u64,
    outcomes: Vec<(AgentId, CycleOutcome)>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owns the world, the shared plan library and rule set, and every agent.
pub struct Scheduler {
    config: SchedulerConfig,
    world: WorldState,
    plans: PlanLibrary,
    reasoning: ReasoningEngine,
    agents: BTreeMap<AgentId, Agent>,
    tick: u64,
    open: Option<OpenTick>,
    queued_registrations: Vec<Agent>,
    queued_removals: Vec<AgentId>,
    /// Registry events since the last report.
    pending_events: Vec<SystemEvent>,
    next_message_id: u64,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            world: WorldState::new(),
            plans: PlanLibrary::new(),
            reasoning: ReasoningEngine::default(),
            agents: BTreeMap::new(),
            tick: 0,
            open: None,
            queued_registrations: Vec::new(),
            queued_removals: Vec::new(),
            pending_events: Vec::new(),
            next_message_id: 0,
            knowledge: None,
            sink: None,
        }
    }

    pub fn with_world(mut self, world: WorldState) -> Self {
        self.world = world;
        self
    }

    pub fn with_plan_library(mut self, plans: PlanLibrary) -> Self {
        self.plans = plans;
        self
    }

    pub fn with_reasoning(mut self, reasoning: ReasoningEngine) -> Self {
        self.reasoning = reasoning;
        self
    }

    /// Write applied variable changes through to `store` after every tick.
    pub fn with_knowledge_store(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(store);
        self
    }

    /// Forward every tick's events to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of completed or open ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_tick_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Direct world access for seeding between ticks.
    ///
    /// Fails while a tick is open: agents have deliberated against the
    /// current world and their effects are not yet applied.
    pub fn world_mut(&mut self) -> RegistryResult<&mut WorldState> {
        self.ensure_between_ticks()?;
        Ok(&mut self.world)
    }

    pub fn plan_library(&self) -> &PlanLibrary {
        &self.plans
    }

    /// Fails while a tick is open.
    pub fn plan_library_mut(&mut self) -> RegistryResult<&mut PlanLibrary> {
        self.ensure_between_ticks()?;
        Ok(&mut self.plans)
    }

    pub fn reasoning(&self) -> &ReasoningEngine {
        &self.reasoning
    }

    /// Fails while a tick is open.
    pub fn reasoning_mut(&mut self) -> RegistryResult<&mut ReasoningEngine> {
        self.ensure_between_ticks()?;
        Ok(&mut self.reasoning)
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Mutable agent access between ticks, e.g. to suspend an intention.
    pub fn agent_mut(&mut self, id: &str) -> RegistryResult<&mut Agent> {
        self.ensure_between_ticks()?;
        self.agents
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownAgent {
                agent_id: id.to_string(),
            })
    }

    /// Registered agents in ascending id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    // ── Registry ────────────────────────────────────────────────────────

    /// Register an agent between ticks.
    pub fn register_agent(&mut self, agent: Agent) -> RegistryResult<()> {
        self.ensure_between_ticks()?;
        self.admit(agent)
    }

    /// Remove an agent between ticks, together with its world bookkeeping
    /// (`<id>.*` variables and relations whose subject is the agent) and
    /// its undelivered messages.
    pub fn remove_agent(&mut self, id: &str) -> RegistryResult<Agent> {
        self.ensure_between_ticks()?;
        self.evict(id)
    }

    /// Register at the start of the next tick. Allowed while a tick is open.
    pub fn queue_registration(&mut self, agent: Agent) {
        self.queued_registrations.push(agent);
    }

    /// Remove at the end of the current (or next) tick. Allowed while a tick is open.
    pub fn queue_removal(&mut self, id: impl Into<AgentId>) {
        self.queued_removals.push(id.into());
    }

    fn ensure_between_ticks(&self) -> RegistryResult<()> {
        match &self.open {
            Some(open) => Err(RegistryError::TickInProgress { tick: open.tick }),
            None => Ok(()),
        }
    }

    fn admit(&mut self, agent: Agent) -> RegistryResult<()> {
        if self.agents.contains_key(agent.id()) {
            return Err(RegistryError::DuplicateAgent {
                agent_id: agent.id().to_string(),
            });
        }
        let id = agent.id().to_string();
        tracing::info!(agent = %id, tick = self.tick, "agent registered");
        self.agents.insert(id.clone(), agent);
        self.pending_events.push(SystemEvent::AgentAdmitted { agent: id });
        Ok(())
    }

    fn evict(&mut self, id: &str) -> RegistryResult<Agent> {
        let Some(mut agent) = self.agents.remove(id) else {
            return Err(RegistryError::UnknownAgent {
                agent_id: id.to_string(),
            });
        };
        let undelivered = std::mem::take(&mut agent.inbox).len();
        let removed = self.world.forget_entity(id);
        if let Some(store) = &self.knowledge {
            for m in &removed {
                store.record(m);
            }
        }
        tracing::info!(
            agent = %id,
            tick = self.tick,
            world_entries = removed.len(),
            undelivered,
            "agent removed"
        );
        self.pending_events.push(SystemEvent::AgentRemoved {
            agent: id.to_string(),
        });
        Ok(agent)
    }

    // ── Ticks ───────────────────────────────────────────────────────────

    /// Open a tick: admit queued registrations and let every agent deliberate.
    ///
    /// Nothing is applied until [`commit_tick`](Self::commit_tick).
    pub fn begin_tick(&mut self) -> RegistryResult<u64> {
        self.ensure_between_ticks()?;
        let open = self.deliberate_all();
        let tick = open.tick;
        self.open = Some(open);
        Ok(tick)
    }

    /// Close the open tick. Returns `None` when no tick is open.
    pub fn commit_tick(&mut self) -> Option<TickReport> {
        let open = self.open.take()?;
        Some(self.apply(open))
    }

    /// Run one full tick.
    pub fn step(&mut self) -> TickReport {
        let open = match self.open.take() {
            Some(open) => open,
            None => self.deliberate_all(),
        };
        self.apply(open)
    }

    /// Run `n` ticks.
    pub fn run(&mut self, n: u64) -> Vec<TickReport> {
        (0..n).map(|_| self.step()).collect()
    }

    fn deliberate_all(&mut self) -> OpenTick {
        self.tick += 1;
        let tick = self.tick;

        for agent in std::mem::take(&mut self.queued_registrations) {
            if let Err(err) = self.admit(agent) {
                tracing::warn!(tick, error = %err, "queued registration rejected");
            }
        }

        let ctx = DeliberationContext {
            world: &self.world,
            plans: &self.plans,
            reasoning: &self.reasoning,
            tick,
        };
        let outcomes: Vec<(AgentId, CycleOutcome)> = if self.config.parallel {
            let mut outcomes: Vec<(AgentId, CycleOutcome)> = self
                .agents
                .par_iter_mut()
                .map(|(id, agent)| (id.clone(), agent.deliberate(&ctx)))
                .collect();
            outcomes.sort_by(|a, b| a.0.cmp(&b.0));
            outcomes
        } else {
            self.agents
                .iter_mut()
                .map(|(id, agent)| (id.clone(), agent.deliberate(&ctx)))
                .collect()
        };

        OpenTick { tick, outcomes }
    }

    fn apply(&mut self, open: OpenTick) -> TickReport {
        let OpenTick { tick, outcomes } = open;
        let mut report = TickReport {
            tick,
            events: std::mem::take(&mut self.pending_events),
            ..TickReport::default()
        };

        // World mutations, in agent-id order.
        let mut outbound = Vec::new();
        for (id, outcome) in outcomes {
            for effect in outcome.effects {
                let mutations = match effect {
                    TaskEffect::Act(action) => action.mutations(&id, &self.world),
                    TaskEffect::Assign { key, value } => vec![WorldMutation::Set { key, value }],
                };
                for m in mutations {
                    self.world.apply(&m);
                    report.applied.push(m);
                }
            }
            report.events.extend(outcome.events);
            if !outcome.candidate_actions.is_empty() {
                report
                    .candidate_actions
                    .insert(id.clone(), outcome.candidate_actions);
            }
            outbound.extend(outcome.outbound.into_iter().map(|m| (id.clone(), m)));
        }

        // Message routing; receivers perceive these next tick.
        for (from, msg) in outbound {
            let recipients: Vec<AgentId> = match msg.to {
                Some(to) if self.agents.contains_key(&to) => vec![to],
                Some(to) => {
                    report.events.push(SystemEvent::MessageDropped { from, to });
                    continue;
                }
                None => self
                    .agents
                    .keys()
                    .filter(|id| **id != from)
                    .cloned()
                    .collect(),
            };
            for to in recipients {
                self.next_message_id += 1;
                let message = Message {
                    id: self.next_message_id,
                    tick,
                    from: from.clone(),
                    to: to.clone(),
                    content: msg.content.clone(),
                };
                if let Some(agent) = self.agents.get_mut(&to) {
                    agent.deliver(message.clone());
                }
                report.messages.push(message);
            }
        }

        if let Some(store) = &self.knowledge {
            for m in &report.applied {
                store.record(m);
            }
        }

        for id in std::mem::take(&mut self.queued_removals) {
            if let Err(err) = self.evict(&id) {
                tracing::warn!(tick, error = %err, "queued removal rejected");
            }
        }
        report.events.append(&mut self.pending_events);

        if let Some(sink) = &self.sink {
            sink.emit_batch(tick, &report.events);
        }
        tracing::info!(
            tick,
            agents = self.agents.len(),
            applied = report.applied.len(),
            messages = report.messages.len(),
            events = report.events.len(),
            "tick complete"
        );
        report
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("tick_open", &self.open.is_some())
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("plans", &self.plans.len())
            .field("rules", &self.reasoning.len())
            .field("queued_registrations", &self.queued_registrations.len())
            .field("queued_removals", &self.queued_removals)
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
