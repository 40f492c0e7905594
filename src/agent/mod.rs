//! Agent layer: BDI agents and their deliberation cycle.
//!
//! Each agent owns:
//! - **Beliefs** (certainty-weighted facts, revised from perception and messages)
//! - **Desires** (candidate goals, promoted when reasoning triggers them)
//! - **Goals** and **intentions** (goals committed to a working copy of a plan)
//! - **Task executor** (turns plan steps into world effects)
//!
//! The cycle is Perceive → Revise → Reason → Plan-select → Act, once per tick.

pub mod agent;
pub mod cycle;
pub mod error;
pub mod executor;

pub use agent::{Agent, AgentConfig, ReasoningMode};
pub use cycle::{CycleOutcome, DeliberationContext};
pub use error::{TaskError, TaskResult};
pub use executor::{ActionExecutor, TaskEffect, TaskExecutor};
