//! Message types for a session history.
//!
//! A [`Message`] carries its stable `original_index` plus fields derived from its content
//! (token count, importance, essential flag, kind). Derived fields are computed by the
//! history store when the message is created, merged or compressed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parses a role name case-insensitively; `None` for anything outside system/user/assistant.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse message category, derived from role and content.
///
/// Informational only (stats, `score` output); importance scoring does not read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    UserQuery,
    SystemResponse,
    CodeExecution,
    ImportantDecision,
    ErrorHandling,
}

impl MessageKind {
    /// Classifies a message from its role and content.
    pub fn classify(role: Role, content: &str) -> Self {
        let lower = content.to_lowercase();
        match role {
            Role::System => Self::SystemResponse,
            Role::User => {
                if lower.contains("error") || lower.contains("help") {
                    Self::ErrorHandling
                } else if lower.contains("config") || lower.contains("setting") {
                    Self::ImportantDecision
                } else {
                    Self::UserQuery
                }
            }
            Role::Assistant => {
                if content.contains("```") {
                    Self::CodeExecution
                } else if lower.contains("important") || lower.contains("warning") {
                    Self::ImportantDecision
                } else {
                    Self::SystemResponse
                }
            }
        }
    }
}

/// A validated item ready to be appended to a history.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl NewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// An item as handed over by a host, before validation.
///
/// Same shape as one line of a persisted session log: `{role, content, timestamp}`.
/// Missing fields are kept as `None` so `record_items` can report them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawItem {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
            timestamp: None,
        }
    }
}

/// One message in a session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Assigned once at append time; strictly increasing along the history, never reused.
    pub original_index: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub importance: f64,
    pub essential: bool,
    pub token_count: usize,
    pub kind: MessageKind,
    /// Set once the compression pass has shortened this message.
    #[serde(default)]
    pub compressed: bool,
}

impl Message {
    pub fn chars(&self) -> usize {
        self.content.chars().count()
    }
}
