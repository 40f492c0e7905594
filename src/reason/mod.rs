//! Reasoning: condition language and the rule engine.
//!
//! Rules are data, authored outside the deliberation loop and appended to a
//! [`ReasoningEngine`]. During a tick the engine is only read.

pub mod condition;
pub mod engine;

pub use condition::{CompareOp, Condition};
pub use engine::{CombinationStrategy, ReasoningConfig, ReasoningEngine, Rule};
