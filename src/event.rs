//! Deliberation events and the sinks that consume them.
//!
//! Everything that happens to goals and intentions during a tick is recorded
//! as a [`SystemEvent`]. The scheduler returns them in each `TickReport` and
//! forwards them to an optional [`EventSink`]: the tracing log, NDJSON on
//! stdout, or an in-memory collector for tests.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::message::AgentId;

// ── Event types ─────────────────────────────────────────────────────────

/// A goal, intention or registry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemEvent {
    AgentAdmitted {
        agent: AgentId,
    },
    AgentRemoved {
        agent: AgentId,
    },
    GoalAdopted {
        agent: AgentId,
        goal: String,
        priority: i64,
    },
    /// No plan for the goal is applicable this tick; it stays pending.
    PlanNotApplicable {
        agent: AgentId,
        goal: String,
    },
    IntentionCommitted {
        agent: AgentId,
        goal: String,
        plan: String,
    },
    TaskCompleted {
        agent: AgentId,
        goal: String,
        plan: String,
        task: String,
    },
    /// A task failed; the intention was dropped and the goal is pending again.
    IntentionAborted {
        agent: AgentId,
        goal: String,
        plan: String,
        task: String,
        reason: String,
    },
    GoalAchieved {
        agent: AgentId,
        goal: String,
    },
    GoalAbandoned {
        agent: AgentId,
        goal: String,
        failures: u32,
    },
    /// A message was addressed to an agent that is not registered.
    MessageDropped {
        from: AgentId,
        to: AgentId,
    },
}

impl SystemEvent {
    /// Short label, used as the log message.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AgentAdmitted { .. } => "agent admitted",
            Self::AgentRemoved { .. } => "agent removed",
            Self::GoalAdopted { .. } => "goal adopted",
            Self::PlanNotApplicable { .. } => "no applicable plan",
            Self::IntentionCommitted { .. } => "intention committed",
            Self::TaskCompleted { .. } => "task completed",
            Self::IntentionAborted { .. } => "intention aborted",
            Self::GoalAchieved { .. } => "goal achieved",
            Self::GoalAbandoned { .. } => "goal abandoned",
            Self::MessageDropped { .. } => "message dropped",
        }
    }
}

// ── EventSink trait ─────────────────────────────────────────────────────

/// A destination for deliberation events.
pub trait EventSink: Send + Sync {
    /// Emit a single event that occurred during `tick`.
    fn emit(&self, tick: u64, event: &SystemEvent);

    /// Emit a batch of events from the same tick.
    fn emit_batch(&self, tick: u64, events: &[SystemEvent]) {
        for e in events {
            self.emit(tick, e);
        }
    }
}

// ── LogSink ─────────────────────────────────────────────────────────────

/// Forwards events to `tracing`. Failures log at `warn`, the rest at `debug`.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, tick: u64, event: &SystemEvent) {
        let detail = serde_json::to_string(event).unwrap_or_default();
        match event {
            SystemEvent::IntentionAborted { .. }
            | SystemEvent::GoalAbandoned { .. }
            | SystemEvent::MessageDropped { .. } => {
                tracing::warn!(tick, %detail, "{}", event.label());
            }
            _ => tracing::debug!(tick, %detail, "{}", event.label()),
        }
    }
}

// ── JsonSink ────────────────────────────────────────────────────────────

/// Emits events as newline-delimited JSON on stdout.
pub struct JsonSink;

#[derive(Serialize)]
struct TickedEvent<'a> {
    tick: u64,
    #[serde(flatten)]
    event: &'a SystemEvent,
}

impl EventSink for JsonSink {
    fn emit(&self, tick: u64, event: &SystemEvent) {
        if let Ok(json) = serde_json::to_string(&TickedEvent { tick, event }) {
            println!("{json}");
        }
    }
}

// ── VecSink ─────────────────────────────────────────────────────────────

/// Collects `(tick, event)` pairs in memory for testing.
pub struct VecSink {
    events: Mutex<Vec<(u64, SystemEvent)>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// All collected events.
    pub fn events(&self) -> Vec<(u64, SystemEvent)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for VecSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecSink {
    fn emit(&self, tick: u64, event: &SystemEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((tick, event.clone()));
    }
}
