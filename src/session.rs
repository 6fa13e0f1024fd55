//! The stream session controller.
//!
//! [`ChatSession`] runs one exchange at a time: it appends the user turn,
//! opens the response stream, folds every decoded delta into the pending
//! assistant turn and rolls back on failure. [`SessionHandle`] puts a session
//! on its own task so a renderer can keep drawing while a reply streams in;
//! the worker task is the only writer of the conversation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::delta::extract_delta;
use crate::error::ChatError;
use crate::events::{Message, SessionEvent, SessionState, Snapshot};
use crate::llm::ChatTransport;
use crate::streaming::{Frame, FrameDecoder};

/// Owns the conversation and drives exchanges against a transport
pub struct ChatSession<T> {
    transport: T,
    conversation: Conversation,
    state: SessionState,
    loading: Arc<AtomicBool>,
    snapshots: watch::Sender<Snapshot>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_history(transport, Vec::new())
    }

    /// Start from a prior conversation
    pub fn with_history(transport: T, messages: Vec<Message>) -> Self {
        let conversation = Conversation::from_messages(messages);
        let (snapshots, _) = watch::channel(Snapshot {
            messages: conversation.messages().to_vec(),
            loading: false,
            state: SessionState::Idle,
        });

        Self {
            transport,
            conversation,
            state: SessionState::Idle,
            loading: Arc::new(AtomicBool::new(false)),
            snapshots,
            events: None,
        }
    }

    /// Emit a [`SessionEvent`] for every step of each exchange
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn conversation(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            messages: self.conversation.messages().to_vec(),
            loading: self.is_loading(),
            state: self.state,
        }
    }

    /// Receiver that always holds the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Run one exchange to completion.
    ///
    /// Blank text fails with [`ChatError::InvalidInput`] and a send while
    /// loading fails with [`ChatError::Busy`]; neither touches the
    /// conversation. Any other failure leaves the conversation exactly as it
    /// was right after the user turn was appended.
    pub async fn exchange(&mut self, text: &str, cancel: &CancellationToken) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidInput);
        }
        if self.loading.swap(true, Ordering::SeqCst) {
            return Err(ChatError::Busy);
        }
        self.drive(text, cancel).await
    }

    fn loading_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.loading)
    }

    /// Exchange body; the loading flag is already set by the caller.
    async fn drive(&mut self, text: &str, cancel: &CancellationToken) -> Result<(), ChatError> {
        let span = info_span!("exchange", id = %Uuid::new_v4());
        let result = self.stream_reply(text, cancel).instrument(span.clone()).await;
        let _entered = span.enter();

        match &result {
            Ok(deltas) => {
                self.conversation.complete_pending();
                self.state = SessionState::Completed;
                info!(deltas, "exchange completed");
            }
            Err(err) => {
                if self.conversation.rollback_to_user_turn() {
                    self.emit(SessionEvent::RolledBack);
                }
                self.state = SessionState::Failed;
                match err {
                    ChatError::Cancelled => debug!("exchange cancelled by caller"),
                    err => warn!(error = %err, "exchange failed"),
                }
            }
        }

        self.loading.store(false, Ordering::SeqCst);
        self.publish();
        self.emit(match &result {
            Ok(_) => SessionEvent::Completed,
            Err(ChatError::Cancelled) => SessionEvent::Cancelled,
            Err(err) => SessionEvent::Failed(err.clone()),
        });

        result.map(|_| ())
    }

    /// Send the request and fold the reply into the conversation. Returns the
    /// number of deltas applied.
    async fn stream_reply(&mut self, text: &str, cancel: &CancellationToken) -> Result<usize, ChatError> {
        self.conversation.append_user(text)?;
        self.state = SessionState::AwaitingResponse;
        self.publish();
        self.emit(SessionEvent::UserAppended(Message::user(text)));

        let history = self.conversation.messages().to_vec();
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            opened = self.transport.open_stream(&history) => opened?,
        };

        self.conversation.open_pending_assistant()?;
        self.state = SessionState::Streaming;
        self.publish();
        self.emit(SessionEvent::AssistantOpened);

        let mut decoder = FrameDecoder::new();
        let mut deltas = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                next = stream.next() => next,
            };

            let frames = match next {
                Some(Ok(chunk)) => decoder.push(&chunk),
                Some(Err(err)) => return Err(interrupted(err)),
                None => {
                    let frames = decoder.finish();
                    deltas += self.apply_frames(frames)?;
                    break;
                }
            };
            deltas += self.apply_frames(frames)?;
        }

        Ok(deltas)
    }

    fn apply_frames(&mut self, frames: Vec<Frame>) -> Result<usize, ChatError> {
        let mut applied = 0;
        for frame in frames {
            let payload = match frame {
                Frame::Data(payload) => payload,
                Frame::Done => {
                    debug!("termination marker received, draining until end of stream");
                    continue;
                }
            };
            if let Some(text) = extract_delta(&payload) {
                self.conversation.apply_delta(&text)?;
                applied += 1;
                self.publish();
                self.emit(SessionEvent::Delta(text));
            }
        }
        Ok(applied)
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Errors while reading the body all count as an interrupted stream.
fn interrupted(err: ChatError) -> ChatError {
    match err {
        ChatError::StreamInterrupted(_) => err,
        other => ChatError::StreamInterrupted(other.to_string()),
    }
}

enum Command {
    Send {
        text: String,
        cancel: CancellationToken,
    },
}

/// Caller-facing handle to a session running on its own task
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    loading: Arc<AtomicBool>,
    snapshots: watch::Receiver<Snapshot>,
    current: Arc<Mutex<CancellationToken>>,
}

impl SessionHandle {
    /// Spawn a worker for a fresh session over `transport`
    pub fn spawn<T: ChatTransport>(
        transport: T,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::spawn_session(ChatSession::new(transport))
    }

    /// Spawn a worker that owns `session`
    pub fn spawn_session<T: ChatTransport>(
        session: ChatSession<T>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();

        let mut session = session.with_events(event_tx);
        let loading = session.loading_flag();
        let snapshots = session.subscribe();

        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    Command::Send { text, cancel } => {
                        // outcome is reported through the event channel
                        let _ = session.drive(&text, &cancel).await;
                    }
                }
            }
            debug!("session worker stopped");
        });

        let handle = Self {
            commands: command_tx,
            loading,
            snapshots,
            current: Arc::new(Mutex::new(CancellationToken::new())),
        };
        (handle, event_rx)
    }

    /// Start an exchange without waiting for it.
    ///
    /// Returns [`ChatError::InvalidInput`] for blank text and
    /// [`ChatError::Busy`] while another exchange is loading; in both cases
    /// nothing is sent and the conversation is untouched.
    pub fn send(&self, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidInput);
        }
        // the token is swapped under the same lock `cancel` takes, so a cancel
        // racing this send always sees the new exchange's token
        let cancel = CancellationToken::new();
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if self
                .loading
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("send rejected while loading");
                return Err(ChatError::Busy);
            }
            *current = cancel.clone();
        }

        let command = Command::Send {
            text: text.to_string(),
            cancel,
        };
        if self.commands.send(command).is_err() {
            self.loading.store(false, Ordering::SeqCst);
            return Err(ChatError::Request("session worker has stopped".to_string()));
        }
        Ok(())
    }

    /// Abort the in-flight exchange, if any. The partial reply is rolled back
    /// and a [`SessionEvent::Cancelled`] is emitted instead of a failure.
    pub fn cancel(&self) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_loading() {
            current.cancel();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn conversation(&self) -> Vec<Message> {
        self.snapshots.borrow().messages.clone()
    }

    /// Receiver that always holds the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Resolve once no exchange is loading
    pub async fn wait_idle(&self) {
        let mut snapshots = self.snapshots.clone();
        while self.is_loading() {
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    }
}
