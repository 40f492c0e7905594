//! Agent actions as a tagged type.
//!
//! Plans are often authored as free text ("Move to dock", "Pick up crate").
//! That text is parsed once, at authoring time, by [`Action::parse`]; inside
//! the deliberation core an action is always one of the [`Action`] variants.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::message::{AgentId, MessageContent};
use crate::value::Value;
use crate::world::{Relation, WorldMutation, WorldState};

/// Relation written when an agent picks something up.
pub const HOLDS: &str = "holds";
/// Relation written when an agent interacts with an entity.
pub const INTERACTED_WITH: &str = "interacted_with";

/// Something an agent does to its environment or to another agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Move { target: String },
    PickUp { object: String },
    PutDown { object: String },
    UseTool { name: String },
    Interact { entity: String },
    Communicate {
        /// `None` broadcasts to every other agent.
        recipient: Option<AgentId>,
        content: MessageContent,
    },
}

/// Discriminant of [`Action`], used for capability sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Move,
    PickUp,
    PutDown,
    UseTool,
    Interact,
    Communicate,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Move => "move",
            Self::PickUp => "pick_up",
            Self::PutDown => "put_down",
            Self::UseTool => "use_tool",
            Self::Interact => "interact",
            Self::Communicate => "communicate",
        };
        f.write_str(name)
    }
}

static RE_MOVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^move to\s+(.+)$").unwrap());
static RE_PICK_UP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^pick up\s+(.+)$").unwrap());
static RE_PUT_DOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^put down\s+(.+)$").unwrap());
static RE_INTERACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^interact with\s+(.+)$").unwrap());
static RE_USE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^use\s+(.+)$").unwrap());
static RE_TELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^tell\s+([^\s:]+)\s*:\s*(.+)$").unwrap());
static RE_COMMUNICATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^communicate\s+(.+)$").unwrap());

impl Action {
    /// Parse the textual step forms used by plan authors.
    ///
    /// `Tell AGENT: text` addresses one agent; `Communicate text` broadcasts.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let text = text.trim();
        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        };

        if let Some(target) = capture(&RE_MOVE) {
            return Ok(Self::Move { target });
        }
        if let Some(object) = capture(&RE_PICK_UP) {
            return Ok(Self::PickUp { object });
        }
        if let Some(object) = capture(&RE_PUT_DOWN) {
            return Ok(Self::PutDown { object });
        }
        if let Some(entity) = capture(&RE_INTERACT) {
            return Ok(Self::Interact { entity });
        }
        if let Some(name) = capture(&RE_USE) {
            return Ok(Self::UseTool { name });
        }
        if let Some(caps) = RE_TELL.captures(text) {
            return Ok(Self::Communicate {
                recipient: Some(caps[1].to_string()),
                content: MessageContent::text(caps[2].trim()),
            });
        }
        if let Some(message) = capture(&RE_COMMUNICATE) {
            return Ok(Self::Communicate {
                recipient: None,
                content: MessageContent::text(message),
            });
        }
        Err(ConfigError::UnknownAction { text: text.into() })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Move { .. } => ActionKind::Move,
            Self::PickUp { .. } => ActionKind::PickUp,
            Self::PutDown { .. } => ActionKind::PutDown,
            Self::UseTool { .. } => ActionKind::UseTool,
            Self::Interact { .. } => ActionKind::Interact,
            Self::Communicate { .. } => ActionKind::Communicate,
        }
    }

    /// World mutations this action causes when performed by `actor`.
    ///
    /// Evaluated against the world as it stands at apply time, so actions
    /// earlier in the same tick are visible (e.g. a put-down after a move
    /// lands at the new location). Communication changes no world state.
    pub fn mutations(&self, actor: &str, world: &WorldState) -> Vec<WorldMutation> {
        match self {
            Self::Move { target } => vec![WorldMutation::Set {
                key: location_key(actor),
                value: Value::String(target.clone()),
            }],
            Self::PickUp { object } => vec![
                WorldMutation::Relate(Relation::new(actor, HOLDS, object.as_str())),
                WorldMutation::Unset {
                    key: location_key(object),
                },
            ],
            Self::PutDown { object } => {
                let mut out = vec![WorldMutation::Unrelate(Relation::new(
                    actor,
                    HOLDS,
                    object.as_str(),
                ))];
                if let Some(location) = world.get(&location_key(actor)) {
                    out.push(WorldMutation::Set {
                        key: location_key(object),
                        value: location.clone(),
                    });
                }
                out
            }
            Self::UseTool { name } => vec![WorldMutation::Set {
                key: format!("{actor}.last_tool"),
                value: Value::String(name.clone()),
            }],
            Self::Interact { entity } => vec![WorldMutation::Relate(Relation::new(
                actor,
                INTERACTED_WITH,
                entity.as_str(),
            ))],
            Self::Communicate { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move { target } => write!(f, "Move to {target}"),
            Self::PickUp { object } => write!(f, "Pick up {object}"),
            Self::PutDown { object } => write!(f, "Put down {object}"),
            Self::UseTool { name } => write!(f, "Use {name}"),
            Self::Interact { entity } => write!(f, "Interact with {entity}"),
            Self::Communicate {
                recipient: Some(to),
                ..
            } => write!(f, "Tell {to}"),
            Self::Communicate { recipient: None, .. } => write!(f, "Communicate"),
        }
    }
}

/// World variable holding an entity's location.
pub fn location_key(entity: &str) -> String {
    format!("{entity}.location")
}
