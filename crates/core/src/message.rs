//! Turn and session identity types.
//!
//! A [`Turn`] is the one canonical message record used throughout the
//! pipeline: user input, generated replies, clarification requests, and
//! pre-recorded fixture turns all share it. Conversion to the wire format of
//! a completion endpoint happens inside the provider only.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single message in a conversation.
///
/// Turns are appended to a session in insertion order and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// ISO-8601 creation time, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Set on assistant turns that asked the user to clarify instead of answering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_clarification: Option<bool>,
}

impl Turn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
            is_clarification: None,
        }
    }

    /// Create a user turn stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content).stamped()
    }

    /// Create an assistant turn stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content).stamped()
    }

    /// Create an unstamped system turn (prompt scaffolding, never stored).
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create an assistant turn that carries a clarification request.
    pub fn clarification(content: impl Into<String>) -> Self {
        let mut turn = Self::assistant(content);
        turn.is_clarification = Some(true);
        turn
    }

    /// Set an explicit timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    fn stamped(self) -> Self {
        let now = Utc::now().to_rfc3339();
        self.with_timestamp(now)
    }

    /// Whether this turn was a clarification request.
    pub fn is_clarification(&self) -> bool {
        self.is_clarification.unwrap_or(false)
    }
}
