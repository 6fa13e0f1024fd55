use crate::error::ChatError;
use crate::events::SessionEvent;
use crate::session::SessionHandle;
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, ConversationHistory, QuickAction, SlashCommand,
    get_help_text, quick_actions_line,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use tracing::debug;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Single-line message shown above the composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Info(String),
}

/// Manages the conversation flow and UI components
pub struct ConversationManager {
    session: SessionHandle,
    composer: ConversationComposer,
    notice: Option<Notice>,
    show_quick_actions: bool,
    tick: usize,
}

impl ConversationManager {
    pub fn new(session: SessionHandle, show_quick_actions: bool) -> Self {
        Self {
            session,
            composer: ConversationComposer::new(),
            notice: None,
            show_quick_actions,
            tick: 0,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Send text through the session's loading gate
    pub fn submit(&mut self, text: &str) {
        match self.session.send(text) {
            Ok(()) => {
                self.notice = None;
                self.composer.set_disabled(true);
            }
            Err(ChatError::Busy) => {
                self.notice = Some(Notice::Info(
                    "Still answering, press Esc to stop the current reply.".to_string(),
                ));
            }
            Err(err) => self.notice = Some(Notice::Error(err.user_message())),
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.session.cancel();
            return ConversationAction::Exit;
        }

        match key.code {
            KeyCode::Esc => {
                self.stop();
                return ConversationAction::None;
            }
            KeyCode::F(number) => {
                if let Some(action) = QuickAction::from_key_number(number) {
                    debug!(action = action.label(), "quick action selected");
                    self.submit(action.query());
                }
                return ConversationAction::None;
            }
            _ => {}
        }

        self.composer.set_disabled(self.session.is_loading());
        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.submit(&text);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// React to one notification from the session worker
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match &event {
            SessionEvent::Failed(err) => {
                self.notice = Some(Notice::Error(format!("Error: {}", err.user_message())));
            }
            SessionEvent::Cancelled => {
                self.notice = Some(Notice::Info("Reply stopped.".to_string()));
            }
            _ => {}
        }
        if event.is_terminal() {
            self.composer.set_disabled(false);
        }
    }

    /// Advance the typing animation
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    fn stop(&mut self) {
        if self.session.is_loading() {
            self.session.cancel();
        }
    }

    fn handle_slash_command(&mut self, command: SlashCommand) -> ConversationAction {
        match command {
            SlashCommand::Stop => {
                self.stop();
                ConversationAction::None
            }
            SlashCommand::Help => {
                self.notice = Some(Notice::Info(get_help_text()));
                ConversationAction::None
            }
            SlashCommand::Bye => {
                self.session.cancel();
                ConversationAction::Exit
            }
        }
    }

    /// Render the conversation UI components
    pub fn render(&self, frame: &mut Frame) {
        let snapshot = self.session.snapshot();
        let loading = self.session.is_loading();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // History
                Constraint::Length(1), // Quick actions
                Constraint::Length(1), // Notice
                Constraint::Length(3), // Composer
            ])
            .split(frame.size());

        frame.render_widget(
            ConversationHistory::new(&snapshot.messages).loading(loading, self.tick),
            chunks[0],
        );

        if self.show_quick_actions {
            frame.render_widget(Paragraph::new(quick_actions_line(loading)), chunks[1]);
        }

        if let Some(notice) = &self.notice {
            let line = match notice {
                Notice::Error(text) => Line::from(Span::styled(text.clone(), Style::default().fg(Color::Red))),
                Notice::Info(text) => Line::from(Span::styled(text.clone(), Style::default().fg(Color::Yellow))),
            };
            frame.render_widget(Paragraph::new(line), chunks[2]);
        }

        frame.render_widget(&self.composer, chunks[3]);
    }
}
