use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::ChatError;

/// Author of a conversation message
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label shown above the message in the history view
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "TravelBot",
        }
    }
}

/// One turn of the conversation, serialized exactly as the endpoint expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Lifecycle of a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingResponse,
    Streaming,
    Completed,
    Failed,
}

impl SessionState {
    /// Whether an exchange is between send and loop exit
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingResponse | SessionState::Streaming
        )
    }
}

/// Point-in-time view of a session, published after every mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub messages: Vec<Message>,
    pub loading: bool,
    pub state: SessionState,
}

/// Notifications emitted by the session worker, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The user turn was appended and the request is being sent
    UserAppended(Message),
    /// The endpoint accepted the request and an empty assistant turn was opened
    AssistantOpened,
    /// One text fragment was appended to the pending assistant turn
    Delta(String),
    /// Partial assistant output was discarded
    RolledBack,
    /// The stream ended and the assistant turn is final
    Completed,
    /// The exchange failed; reported once
    Failed(ChatError),
    /// The caller aborted the exchange
    Cancelled,
}

impl SessionEvent {
    /// Returns true for the event that closes an exchange
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Completed | SessionEvent::Failed(_) | SessionEvent::Cancelled
        )
    }
}
