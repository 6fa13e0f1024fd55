use crate::ui::conversation::commands::{SlashCommand, parse_slash_command};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const PLACEHOLDER: &str = "Ask me anything about travel...";

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(SlashCommand),
    None,
}

/// Text being typed and the cursor position, in characters
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    pub cursor_position: usize,
}

impl TextAreaState {
    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let index = self.byte_index();
        self.content.insert(index, c);
        self.cursor_position += 1;
    }

    fn delete_before_cursor(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        self.cursor_position -= 1;
        let index = self.byte_index();
        self.content.remove(index);
    }

    fn delete_at_cursor(&mut self) {
        if self.cursor_position < self.char_count() {
            let index = self.byte_index();
            self.content.remove(index);
        }
    }

    fn take(&mut self) -> String {
        self.cursor_position = 0;
        std::mem::take(&mut self.content)
    }
}

/// Message input at the bottom of the screen
#[derive(Debug, Clone, Default)]
pub struct ConversationComposer {
    state: TextAreaState,
    disabled: bool,
}

impl ConversationComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// While disabled, editing keys are ignored and nothing can be submitted
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn clear(&mut self) {
        self.state = TextAreaState::default();
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        // slash commands stay usable while a reply streams in
        if self.disabled {
            if key.code == KeyCode::Enter {
                if let Some(command) = parse_slash_command(&self.state.content) {
                    self.state.take();
                    return ComposerResult::Command(command);
                }
                return ComposerResult::None;
            }
            if !self.state.content.starts_with('/') && key.code != KeyCode::Char('/') {
                return ComposerResult::None;
            }
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.state.insert_char('\n');
                } else if !self.state.content.trim().is_empty() {
                    let content = self.state.take();
                    if let Some(command) = parse_slash_command(&content) {
                        return ComposerResult::Command(command);
                    }
                    return ComposerResult::Submitted(content.trim().to_string());
                }
            }
            KeyCode::Char(c) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    if c == 'u' {
                        self.clear();
                    }
                } else {
                    self.state.insert_char(c);
                }
            }
            KeyCode::Backspace => self.state.delete_before_cursor(),
            KeyCode::Delete => self.state.delete_at_cursor(),
            KeyCode::Left => {
                self.state.cursor_position = self.state.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                self.state.cursor_position = (self.state.cursor_position + 1).min(self.state.char_count());
            }
            KeyCode::Home => self.state.cursor_position = 0,
            KeyCode::End => self.state.cursor_position = self.state.char_count(),
            _ => {}
        }

        ComposerResult::None
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (title, border_style) = if self.disabled {
            (" Waiting for reply... ", Style::default().fg(Color::DarkGray))
        } else {
            (" Message ", Style::default().fg(Color::Green))
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                PLACEHOLDER,
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let mut content = self.state.content.clone();
        if !self.disabled {
            content.insert(self.state.byte_index(), '▌');
        }

        // show the last lines when the message is taller than the box
        let text_lines: Vec<&str> = content.split('\n').collect();
        let height = inner_area.height as usize;
        let start = text_lines.len().saturating_sub(height);
        for (i, line_text) in text_lines.iter().skip(start).enumerate() {
            let line = Line::from(vec![Span::raw(*line_text)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}
