//! Ordered message list with a single pending assistant turn.

use crate::error::ChatError;
use crate::events::{Message, Role};

/// The conversation accumulator.
///
/// Messages are only ever appended. While an assistant reply streams in, the
/// last message is the pending assistant turn and it is the only one that
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Whether the last message is a still-streaming assistant turn
    pending: bool,
    /// Length of the conversation right after the latest user turn
    checkpoint: Option<usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing history; nothing in it is pending.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            pending: false,
            checkpoint: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Text of the pending assistant turn, if one is open
    pub fn pending_text(&self) -> Option<&str> {
        if self.pending {
            self.messages.last().map(|m| m.content.as_str())
        } else {
            None
        }
    }

    /// Append a user turn and remember this point for rollback.
    pub fn append_user(&mut self, text: &str) -> Result<(), ChatError> {
        if self.pending {
            return Err(ChatError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidInput);
        }

        self.messages.push(Message::user(text));
        self.checkpoint = Some(self.messages.len());
        Ok(())
    }

    /// Open an empty assistant turn at the end of the conversation.
    pub fn open_pending_assistant(&mut self) -> Result<(), ChatError> {
        if self.pending {
            return Err(ChatError::Busy);
        }
        self.messages.push(Message::assistant(String::new()));
        self.pending = true;
        Ok(())
    }

    /// Append `text` to the pending assistant turn.
    pub fn apply_delta(&mut self, text: &str) -> Result<(), ChatError> {
        if !self.pending {
            return Err(ChatError::NoPendingTurn);
        }
        match self.messages.last_mut() {
            Some(message) if message.role == Role::Assistant => {
                message.content.push_str(text);
                Ok(())
            }
            _ => Err(ChatError::NoPendingTurn),
        }
    }

    /// Mark the pending assistant turn as final.
    pub fn complete_pending(&mut self) {
        self.pending = false;
        self.checkpoint = None;
    }

    /// Drop everything after the latest user turn, including any partial
    /// assistant output. Returns true if a message was removed.
    pub fn rollback_to_user_turn(&mut self) -> bool {
        self.pending = false;
        let Some(checkpoint) = self.checkpoint.take() else {
            return false;
        };
        let removed = self.messages.len() > checkpoint;
        self.messages.truncate(checkpoint);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_user_trims_and_rejects_blank() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.append_user("   \n\t"), Err(ChatError::InvalidInput));
        assert!(conversation.is_empty());

        conversation.append_user("  hi  ").unwrap();
        assert_eq!(conversation.messages(), &[Message::user("hi")]);
    }

    #[test]
    fn deltas_accumulate_on_pending_turn() {
        let mut conversation = Conversation::new();
        conversation.append_user("hi").unwrap();
        conversation.open_pending_assistant().unwrap();
        assert_eq!(conversation.pending_text(), Some(""));

        conversation.apply_delta("Hel").unwrap();
        conversation.apply_delta("lo").unwrap();
        conversation.complete_pending();

        assert_eq!(
            conversation.messages(),
            &[Message::user("hi"), Message::assistant("Hello")]
        );
        assert!(!conversation.has_pending());
        assert_eq!(conversation.pending_text(), None);
    }

    #[test]
    fn delta_without_pending_turn_fails() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.apply_delta("x"), Err(ChatError::NoPendingTurn));

        conversation.append_user("hi").unwrap();
        assert_eq!(conversation.apply_delta("x"), Err(ChatError::NoPendingTurn));
    }

    #[test]
    fn at_most_one_pending_turn() {
        let mut conversation = Conversation::new();
        conversation.append_user("hi").unwrap();
        conversation.open_pending_assistant().unwrap();
        assert_eq!(conversation.open_pending_assistant(), Err(ChatError::Busy));
        assert_eq!(conversation.append_user("again"), Err(ChatError::Busy));
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn rollback_restores_state_after_user_turn() {
        let prior = vec![Message::user("a"), Message::assistant("b")];
        let mut conversation = Conversation::from_messages(prior.clone());
        conversation.append_user("hi").unwrap();
        let after_user = conversation.messages().to_vec();

        conversation.open_pending_assistant().unwrap();
        conversation.apply_delta("partial").unwrap();
        assert!(conversation.rollback_to_user_turn());

        assert_eq!(conversation.messages(), after_user.as_slice());
        assert!(!conversation.has_pending());
        assert_eq!(&conversation.messages()[..2], prior.as_slice());
    }

    #[test]
    fn rollback_before_assistant_opened_is_a_no_op() {
        let mut conversation = Conversation::new();
        conversation.append_user("hi").unwrap();
        assert!(!conversation.rollback_to_user_turn());
        assert_eq!(conversation.messages(), &[Message::user("hi")]);
    }

    #[test]
    fn completed_turn_is_not_rolled_back() {
        let mut conversation = Conversation::new();
        conversation.append_user("hi").unwrap();
        conversation.open_pending_assistant().unwrap();
        conversation.apply_delta("done").unwrap();
        conversation.complete_pending();

        assert!(!conversation.rollback_to_user_turn());
        assert_eq!(conversation.len(), 2);
    }
}
