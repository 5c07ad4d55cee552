//! Chat messages and the bounded per-room history.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::alert::{AlertCode, AlertMode, AlertSound};
use crate::identity::Identity;

/// A single chat message as carried in a `CHAT_MESSAGE` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub from: String,
    pub from_name: String,
    /// RFC 3339 timestamp set by the sender.
    pub timestamp: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

/// What a message carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageBody {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Alert {
        code_name: String,
        mode: AlertMode,
        color: String,
        sound: AlertSound,
        text: String,
    },
}

impl Message {
    pub fn text(sender: &Identity, text: impl Into<String>) -> Self {
        Self::build(sender, MessageBody::Text { text: text.into() })
    }

    pub fn alert(sender: &Identity, code: &AlertCode) -> Self {
        Self::build(
            sender,
            MessageBody::Alert {
                code_name: code.name.clone(),
                mode: code.mode,
                color: code.color.clone(),
                sound: code.sound,
                text: code.text.clone(),
            },
        )
    }

    fn build(sender: &Identity, body: MessageBody) -> Self {
        Self {
            id: beacon_common::prefixed_id("msg"),
            from: sender.handle.clone(),
            from_name: sender.display_name.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            body,
        }
    }

    /// The human-readable text of the message, whatever its kind.
    pub fn preview(&self) -> &str {
        match &self.body {
            MessageBody::Text { text } | MessageBody::Alert { text, .. } => text,
        }
    }

    pub fn is_call_alert(&self) -> bool {
        matches!(
            self.body,
            MessageBody::Alert {
                mode: AlertMode::Call,
                ..
            }
        )
    }
}

/// Configuration for chat history storage.
#[derive(Debug, Clone)]
pub struct ChatHistoryConfig {
    /// Maximum messages to retain per room.
    pub max_messages_per_room: usize,
}

impl Default for ChatHistoryConfig {
    fn default() -> Self {
        Self {
            max_messages_per_room: 500,
        }
    }
}

/// In-memory chat history, keyed by room id.
///
/// Messages are stored as they are sent or received; there is no
/// persistence and no sync between peers.
#[derive(Debug)]
pub struct ChatHistory {
    config: ChatHistoryConfig,
    rooms: HashMap<String, VecDeque<Message>>,
}

impl ChatHistory {
    pub fn new(config: ChatHistoryConfig) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
        }
    }

    /// Push a message into a room. Oldest messages are evicted when the
    /// buffer is full; a message id already present is not stored twice.
    pub fn push(&mut self, room_id: &str, msg: Message) {
        let buf = self.rooms.entry(room_id.to_string()).or_default();
        if buf.iter().any(|m| m.id == msg.id) {
            return;
        }
        if buf.len() >= self.config.max_messages_per_room {
            buf.pop_front();
        }
        buf.push_back(msg);
    }

    /// Get the most recent `limit` messages from a room (oldest first).
    pub fn recent(&self, room_id: &str, limit: usize) -> Vec<&Message> {
        match self.rooms.get(room_id) {
            Some(buf) => {
                let skip = buf.len().saturating_sub(limit);
                buf.iter().skip(skip).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn all(&self, room_id: &str) -> Vec<&Message> {
        self.recent(room_id, usize::MAX)
    }

    pub fn clear_room(&mut self, room_id: &str) {
        self.rooms.remove(room_id);
    }

    /// Total number of stored messages across all rooms.
    pub fn total_messages(&self) -> usize {
        self.rooms.values().map(|b| b.len()).sum()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(ChatHistoryConfig::default())
    }
}
