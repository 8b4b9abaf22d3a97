//! Turn and role types for conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[default]
    User,
    Assistant,
}

impl MessageRole {
    /// Get the string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Parse a role tag, coercing unknown tags to `User`.
    ///
    /// Invalid roles are a leniency, not a hard error: the turn is kept
    /// with role `user` and a warning is logged.
    pub fn coerce(tag: &str) -> Self {
        match tag {
            "system" => MessageRole::System,
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            other => {
                tracing::warn!("invalid message role '{}', falling back to 'user'", other);
                MessageRole::User
            }
        }
    }
}

/// One role-tagged message unit in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn timestamped now.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a new system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// Model-facing projection of a turn: role and content only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ApiMessage {
    /// Create a new API message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ApiMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Render turns as a human-readable history block, one `[role]: content`
/// line per turn.
pub fn format_turns(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("[{}]: {}", turn.role.as_str(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_coercion() {
        assert_eq!(MessageRole::coerce("assistant"), MessageRole::Assistant);
        assert_eq!(MessageRole::coerce("system"), MessageRole::System);
        assert_eq!(MessageRole::coerce("user"), MessageRole::User);
        assert_eq!(MessageRole::coerce("robot"), MessageRole::User);
        assert_eq!(MessageRole::coerce(""), MessageRole::User);
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_format_turns() {
        let turns = vec![Turn::user("hi"), Turn::assistant("hello")];
        assert_eq!(format_turns(&turns), "[user]: hi\n[assistant]: hello");
    }

    #[test]
    fn test_format_turns_empty() {
        assert_eq!(format_turns(&[]), "");
    }

    #[test]
    fn test_api_message_from_turn() {
        let turn = Turn::assistant("hello");
        let msg = ApiMessage::from(&turn);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, "hello");
    }
}
