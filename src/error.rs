//! Error taxonomy for the chat core.

/// Text shown to the user whenever an exchange fails.
pub const FAILURE_NOTICE: &str = "Failed to get response. Please try again.";

/// Errors surfaced by the conversation, the transport and the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The message was empty after trimming; rejected before any network activity.
    #[error("message is empty")]
    InvalidInput,
    /// A send arrived while another exchange was still loading.
    #[error("an exchange is already in progress")]
    Busy,
    /// A delta arrived with no assistant turn open to receive it.
    #[error("no pending assistant turn")]
    NoPendingTurn,
    /// The endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Transport { status: u16, body: String },
    /// The request could not be sent or the response had no usable body.
    #[error("request failed: {0}")]
    Request(String),
    /// Reading the response body failed mid-stream.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    /// The caller aborted the exchange.
    #[error("exchange cancelled")]
    Cancelled,
}

impl ChatError {
    /// Transport and stream failures end an exchange and trigger rollback.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Request(_) | Self::StreamInterrupted(_)
        )
    }

    /// Message suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        if self.is_fatal() {
            FAILURE_NOTICE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// A data frame whose payload was not a usable chunk. Never leaves the crate.
#[derive(Debug, thiserror::Error)]
#[error("malformed frame payload: {0}")]
pub(crate) struct FrameParseError(#[from] pub(crate) serde_json::Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds() {
        assert!(ChatError::Transport { status: 500, body: String::new() }.is_fatal());
        assert!(ChatError::Request("dns".into()).is_fatal());
        assert!(ChatError::StreamInterrupted("reset".into()).is_fatal());
        assert!(!ChatError::InvalidInput.is_fatal());
        assert!(!ChatError::Busy.is_fatal());
        assert!(!ChatError::Cancelled.is_fatal());
    }

    #[test]
    fn fatal_errors_share_generic_notice() {
        let err = ChatError::Transport {
            status: 401,
            body: "bad key".into(),
        };
        assert_eq!(err.user_message(), FAILURE_NOTICE);
        assert_eq!(ChatError::InvalidInput.user_message(), "message is empty");
    }

    #[test]
    fn transport_display_includes_status() {
        let err = ChatError::Transport {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "endpoint returned HTTP 503: overloaded");
    }
}
