//! Rich diagnostic error types for the mabos kernel.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Only authoring mistakes and registry
//! misuse surface here: failures inside a tick are handled by the deliberation
//! cycle and reported as events instead.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the mabos kernel.
#[derive(Debug, Error, Diagnostic)]
pub enum MabosError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// Configuration (authoring-time) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("malformed rule condition \"{condition}\": {message}")]
    #[diagnostic(
        code(mabos::config::condition),
        help(
            "Conditions compare a fact against a literal, e.g. `temperature > 30` or \
             `status == \"open\"`. Combine them with `and`, `or`, `not` and parentheses."
        )
    )]
    Condition { condition: String, message: String },

    #[error("rule probability {probability} for action \"{action}\" is outside [0, 1]")]
    #[diagnostic(
        code(mabos::config::probability),
        help("Rule probabilities are confidences; use a value between 0.0 and 1.0 inclusive.")
    )]
    Probability { action: String, probability: f64 },

    #[error("plan \"{plan_id}\" for goal \"{goal_id}\" has no steps")]
    #[diagnostic(
        code(mabos::config::empty_plan),
        help("A plan needs at least one task. Remove the plan or give it a step.")
    )]
    EmptyPlan { plan_id: String, goal_id: String },

    #[error("plan \"{plan_id}\" already exists for goal \"{goal_id}\"")]
    #[diagnostic(
        code(mabos::config::duplicate_plan),
        help("Plan ids must be unique within a goal. Use `update_plan` to replace a plan.")
    )]
    DuplicatePlan { plan_id: String, goal_id: String },

    #[error("plan \"{plan_id}\" has a blank precondition")]
    #[diagnostic(
        code(mabos::config::blank_precondition),
        help(
            "Preconditions are predicate names. An empty list means \"always applicable\"; \
             an empty string inside the list is almost certainly a mistake."
        )
    )]
    BlankPrecondition { plan_id: String },

    #[error("unrecognised action text: \"{text}\"")]
    #[diagnostic(
        code(mabos::config::action),
        help(
            "Known forms: `Move to X`, `Pick up X`, `Put down X`, `Use X`, \
             `Interact with X`, `Communicate X` and `Tell AGENT: X`."
        )
    )]
    UnknownAction { text: String },

    #[error("agent \"{agent_id}\" is declared more than once")]
    #[diagnostic(
        code(mabos::config::duplicate_agent),
        help("Every agent in a scenario needs a distinct id.")
    )]
    DuplicateAgent { agent_id: String },

    #[error("failed to parse scenario: {message}")]
    #[diagnostic(
        code(mabos::config::parse),
        help("Check the scenario TOML syntax against the documented layout.")
    )]
    Parse { message: String },

    #[error("failed to read scenario file: {path}")]
    #[diagnostic(code(mabos::config::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("agent registry is locked while tick {tick} is in progress")]
    #[diagnostic(
        code(mabos::registry::tick_in_progress),
        help(
            "Register or remove agents between `step()` calls, or use \
             `queue_registration` / `queue_removal` to defer to the next tick boundary."
        )
    )]
    TickInProgress { tick: u64 },

    #[error("agent \"{agent_id}\" is already registered")]
    #[diagnostic(
        code(mabos::registry::duplicate),
        help("Remove the existing agent first or choose another id.")
    )]
    DuplicateAgent { agent_id: String },

    #[error("agent \"{agent_id}\" is not registered")]
    #[diagnostic(
        code(mabos::registry::unknown),
        help("List registered agents with `scheduler.agent_ids()`.")
    )]
    UnknownAgent { agent_id: String },
}

/// Convenience alias for configuration errors.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Convenience alias for kernel operations.
pub type MabosResult<T> = std::result::Result<T, MabosError>;
