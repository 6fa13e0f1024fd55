//! TravelBot: a terminal chat client that streams replies from an
//! SSE chat endpoint.

pub mod commands;
pub mod config;
pub mod conversation;
pub mod delta;
pub mod error;
pub mod events;
pub mod llm;
pub mod session;
pub mod streaming;
pub mod tui;
pub mod ui;

pub use config::Config;
pub use conversation::Conversation;
pub use error::{ChatError, FAILURE_NOTICE};
pub use events::{Message, Role, SessionEvent, SessionState, Snapshot};
pub use llm::{ByteStream, ChatTransport, LlmClient};
pub use session::{ChatSession, SessionHandle};
pub use streaming::{Frame, FrameDecoder};
