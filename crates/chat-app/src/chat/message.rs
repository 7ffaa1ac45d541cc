use std::fmt;
use std::time::SystemTime;

use murmur_llm::{ProviderMessage, Role};
use uuid::Uuid;

pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";
pub const DEFAULT_ERROR_NOTICE: &str = "Sorry, an error occurred. Please try again.";

/// Stable identifier for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Time-ordered identifier assigned at creation.
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier for one request/response cycle.
///
/// Allocated monotonically per controller so late completions can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl TurnId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "turn-{}", self.0)
    }
}

/// Lifecycle status for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    /// Transient placeholder shown while `TurnId` awaits its response.
    Loading(TurnId),
    Done,
    /// Displayed as the fixed notice; the payload is diagnostic detail only.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: SystemTime,
    pub status: MessageStatus,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            id: MessageId::new_v7(),
            role,
            content: content.into(),
            timestamp: SystemTime::now(),
            status,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, MessageStatus::Done)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, MessageStatus::Done)
    }

    /// Creates the empty assistant entry displayed while a turn is in flight.
    pub fn placeholder(turn: TurnId) -> Self {
        Self::new(Role::Assistant, String::new(), MessageStatus::Loading(turn))
    }

    pub fn error_notice(notice: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(
            Role::Assistant,
            notice,
            MessageStatus::Error(detail.into()),
        )
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, MessageStatus::Loading(_))
    }

    pub fn to_provider_message(&self) -> ProviderMessage {
        ProviderMessage::new(self.role, self.content.clone())
    }
}

/// User-facing strings the controller writes into the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notices {
    pub greeting: String,
    pub error_notice: String,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            error_notice: DEFAULT_ERROR_NOTICE.to_string(),
        }
    }
}
