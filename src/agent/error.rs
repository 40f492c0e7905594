//! Task execution errors.
//!
//! These never escape a tick: the deliberation cycle turns them into an
//! aborted intention and an `IntentionAborted` event.

use miette::Diagnostic;
use thiserror::Error;

use crate::action::ActionKind;

#[derive(Debug, Error, Diagnostic)]
pub enum TaskError {
    #[error("agent lacks the \"{kind}\" capability required by task \"{task}\"")]
    #[diagnostic(
        code(mabos::task::missing_capability),
        help("Add the action kind to the agent's `capabilities`, or give the goal a plan it can perform.")
    )]
    MissingCapability { task: String, kind: ActionKind },

    #[error("task \"{task}\" failed: {message}")]
    #[diagnostic(code(mabos::task::execution))]
    Execution { task: String, message: String },
}

pub type TaskResult<T> = std::result::Result<T, TaskError>;
