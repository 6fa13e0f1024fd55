//! Conversation UI components for the chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod quick_actions;

pub use commands::{SlashCommand, get_help_text, parse_slash_command};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use manager::{ConversationAction, ConversationManager, Notice};
pub use quick_actions::{QuickAction, quick_actions_line};
