//! Conversation log for the active chat session.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Role of a message author, serialized the way chat-completion APIs expect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single entry in the conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(skip, default = "Local::now")]
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Local time the message was created; display only.
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Ordered transcript that always starts with the persona system message.
///
/// Messages are only ever appended. Nothing reorders, deduplicates or edits
/// them; the only way to shrink the log is [`ConversationLog::reset`].
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    /// Create a log holding just the persona prompt.
    pub fn initialize(persona_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::new(Role::System, persona_prompt)],
        }
    }

    /// Append one message. Empty content is accepted as-is.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Drop every message and start over from the persona prompt.
    pub fn reset(&mut self, persona_prompt: impl Into<String>) {
        *self = Self::initialize(persona_prompt);
    }

    /// Full transcript in wire order, system message first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Everything after the system message.
    pub fn turns(&self) -> &[Message] {
        &self.messages[1..]
    }

    pub fn system_prompt(&self) -> &str {
        self.messages[0].content()
    }

    pub fn last(&self) -> &Message {
        // initialize() guarantees at least the system message
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// A log is never empty; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
