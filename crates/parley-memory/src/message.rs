//! Message types stored in conversation memory

use crate::MemoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who contributed a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Stored (lowercase) value
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Display label used when rendering history
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(MemoryError::InvalidRole(other.to_string())),
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = MemoryError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A single message in the conversation window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(role: Role, content: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.trim().to_string(),
            timestamp,
        }
    }
}

/// Loosely-shaped message used for export and restore.
///
/// Every field is optional so that hand-edited or foreign history can be
/// deserialized first and validated afterwards by
/// [`ConversationStore::restore`](crate::ConversationStore::restore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
            timestamp: None,
        }
    }
}

impl From<&Message> for MessageRecord {
    fn from(message: &Message) -> Self {
        Self {
            role: Some(message.role.as_str().to_string()),
            content: Some(message.content.clone()),
            timestamp: Some(message.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!(Role::try_from("assistant").unwrap(), Role::Assistant);

        // Case-sensitive, no aliases
        assert_eq!(
            "User".parse::<Role>(),
            Err(MemoryError::InvalidRole("User".to_string()))
        );
        assert!("system".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.label(), "User");
        assert_eq!(Role::Assistant.label(), "Assistant");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_message_content_trimmed() {
        let msg = Message::new(Role::User, "  hello there \n", Utc::now());
        assert_eq!(msg.content, "hello there");
    }

    #[test]
    fn test_record_deserializes_partial_input() {
        let record: MessageRecord = serde_json::from_str(r#"{"role":"user"}"#).unwrap();
        assert_eq!(record.role.as_deref(), Some("user"));
        assert!(record.content.is_none());
        assert!(record.timestamp.is_none());
    }
}
