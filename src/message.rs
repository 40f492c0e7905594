//! Inter-agent messages.
//!
//! Agents never write into each other's state. A task that communicates emits
//! an [`OutboundMessage`]; the scheduler stamps it into a [`Message`] and
//! delivers it to the addressee's inbox after the world has been updated, so
//! the receiver first sees it on its next perceive.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Agent identifier.
pub type AgentId = String;

/// Payload of an agent-to-agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Free text. The receiver records it as belief `message.<sender>`.
    Text { text: String },
    /// Share a fact. The receiver revises its belief store with it.
    Inform {
        key: String,
        value: Value,
        certainty: f64,
    },
    /// Ask the receiver to take on a desire.
    Request {
        desire_id: String,
        description: String,
        priority: i64,
    },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inform(key: impl Into<String>, value: Value, certainty: f64) -> Self {
        Self::Inform {
            key: key.into(),
            value,
            certainty,
        }
    }

    pub fn request(desire_id: impl Into<String>, description: impl Into<String>, priority: i64) -> Self {
        Self::Request {
            desire_id: desire_id.into(),
            description: description.into(),
            priority,
        }
    }
}

/// A message emitted by an agent during a tick, before routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Addressee; `None` broadcasts to every other registered agent.
    pub to: Option<AgentId>,
    pub content: MessageContent,
}

/// A routed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Scheduler-wide sequence number.
    pub id: u64,
    /// Tick in which the message was sent.
    pub tick: u64,
    pub from: AgentId,
    pub to: AgentId,
    pub content: MessageContent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_serializes_tagged() {
        let msg = MessageContent::inform("door", json!("open"), 0.9);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"inform\""));
        assert!(json.contains("\"key\":\"door\""));
    }

    #[test]
    fn content_deserializes_from_json() {
        let json = r#"{"type":"request","desire_id":"patrol","description":"walk the perimeter","priority":3}"#;
        let msg: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(msg, MessageContent::request("patrol", "walk the perimeter", 3));
    }
}
