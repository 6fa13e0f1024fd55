//! Conversation history display component

use crate::events::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const TYPING_FRAMES: [&str; 3] = ["●  ·  ·", "·  ●  ·", "·  ·  ●"];

/// Read-only view of the conversation, bottom-anchored like a chat log
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    loading: bool,
    tick: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            loading: false,
            tick: 0,
        }
    }

    /// Show the streaming cursor and typing indicator
    pub fn loading(mut self, loading: bool, tick: usize) -> Self {
        self.loading = loading;
        self.tick = tick;
        self
    }

    /// All lines for the current messages at the given width
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        let last = self.messages.len().saturating_sub(1);

        for (index, message) in self.messages.iter().enumerate() {
            let streaming = self.loading && index == last && message.role == Role::Assistant;
            all_lines.extend(self.render_message(message, width, streaming));
            all_lines.push(Line::from(""));
        }

        if self.loading {
            all_lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", Role::Assistant.display_name()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    TYPING_FRAMES[self.tick % TYPING_FRAMES.len()],
                    Style::default().fg(Color::Cyan),
                ),
            ]));
        }

        all_lines
    }

    fn render_message(&self, message: &Message, width: u16, streaming: bool) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let header_style = match message.role {
            Role::User => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            Role::Assistant => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        };
        lines.push(Line::from(vec![
            Span::styled(message.role.display_name().to_string(), header_style),
            Span::styled(" ────", Style::default().fg(Color::DarkGray)),
        ]));

        let content_style = match message.role {
            Role::User => Style::default().fg(Color::White),
            Role::Assistant => Style::default().fg(Color::Gray),
        };
        let content_lines = wrap_text(&message.content, width.saturating_sub(2) as usize);
        let count = content_lines.len();
        for (i, content_line) in content_lines.into_iter().enumerate() {
            let mut spans = vec![Span::raw("  "), Span::styled(content_line, content_style)];
            if streaming && i + 1 == count {
                spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
            }
            lines.push(Line::from(spans));
        }

        lines
    }

    fn welcome_lines() -> Vec<Line<'static>> {
        vec![
            Line::from(Span::styled(
                "Start Your Journey",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Ask me anything about travel, destinations, or trip planning!",
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to send, Shift+Enter for a new line, /help for more.",
                Style::default().fg(Color::DarkGray),
            )),
        ]
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title(" TravelBot ");
        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = if self.messages.is_empty() && !self.loading {
            Self::welcome_lines()
        } else {
            self.lines(inner_area.width)
        };

        // keep the newest lines visible
        let height = inner_area.height as usize;
        let start = if self.messages.is_empty() {
            0
        } else {
            all_lines.len().saturating_sub(height)
        };

        for (i, line) in all_lines.iter().skip(start).take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Wrap text to `width` columns, keeping explicit line breaks and the
/// leading indentation of each paragraph
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let body = paragraph.trim_start();
        let mut indent = &paragraph[..paragraph.len() - body.len()];
        let mut indent_len = indent.chars().count();
        // an indent that fills the row leaves no room for text
        if indent_len >= width {
            indent = "";
            indent_len = 0;
        }

        let mut current_line = indent.to_string();
        let mut current_len = indent_len;
        let mut has_word = false;

        for word in body.split_whitespace() {
            let mut word = word.to_string();
            let mut word_len = word.chars().count();

            if has_word && current_len + 1 + word_len > width {
                lines.push(std::mem::replace(&mut current_line, indent.to_string()));
                current_len = indent_len;
                has_word = false;
            }

            // hard-split words that cannot fit on any line
            let room = width - indent_len;
            while word_len > room {
                let head: String = word.chars().take(room).collect();
                word = word.chars().skip(room).collect();
                word_len -= room;
                if has_word {
                    lines.push(std::mem::replace(&mut current_line, indent.to_string()));
                    current_len = indent_len;
                    has_word = false;
                }
                lines.push(format!("{indent}{head}"));
            }

            if has_word {
                current_line.push(' ');
                current_len += 1;
            }
            current_line.push_str(&word);
            current_len += word_len;
            has_word = true;
        }

        lines.push(current_line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(widget: ConversationHistory<'_>, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        (0..height)
            .map(|y| (0..width).map(|x| buf.get(x, y).symbol()).collect::<String>())
            .collect()
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn wrap_keeps_newlines_and_width() {
        assert_eq!(
            wrap_text("one two three\n\nfour", 7),
            vec!["one two", "three", "", "four"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn wrap_keeps_paragraph_indentation() {
        assert_eq!(
            wrap_text("Day 1:\n  - Louvre", 40),
            vec!["Day 1:", "  - Louvre"]
        );
        assert_eq!(
            wrap_text("  - Musee d'Orsay and Seine cruise", 16),
            vec!["  - Musee", "  d'Orsay and", "  Seine cruise"]
        );
        assert_eq!(wrap_text("    abcdefgh", 8), vec!["    abcd", "    efgh"]);
    }

    #[test]
    fn empty_history_shows_welcome() {
        let rows = rendered(ConversationHistory::new(&[]), 70, 8);
        assert!(rows.iter().any(|r| r.contains("Start Your Journey")));
    }

    #[test]
    fn messages_render_with_role_labels() {
        let messages = vec![Message::user("hi"), Message::assistant("Hello")];
        let rows = rendered(ConversationHistory::new(&messages), 30, 10);
        let joined = rows.join("\n");
        assert!(joined.contains("You"));
        assert!(joined.contains("hi"));
        assert!(joined.contains("TravelBot"));
        assert!(joined.contains("Hello"));
    }

    #[test]
    fn streaming_turn_gets_cursor_and_typing_row() {
        let messages = vec![Message::user("hi"), Message::assistant("Hel")];
        let history = ConversationHistory::new(&messages).loading(true, 1);
        let lines: Vec<String> = history.lines(30).iter().map(line_text).collect();

        assert!(lines.iter().any(|l| l == "  Hel▋"));
        assert_eq!(lines.last().map(String::as_str), Some("TravelBot ·  ●  ·"));
    }

    #[test]
    fn finished_turn_has_no_cursor() {
        let messages = vec![Message::user("hi"), Message::assistant("Hello")];
        let lines: Vec<String> = ConversationHistory::new(&messages)
            .lines(30)
            .iter()
            .map(line_text)
            .collect();
        assert!(!lines.iter().any(|l| l.contains('▋')));
    }

    #[test]
    fn long_history_is_bottom_anchored() {
        let messages: Vec<Message> = (0..10).map(|i| Message::user(format!("msg{i}"))).collect();
        let rows = rendered(ConversationHistory::new(&messages), 20, 6);
        let joined = rows.join("\n");
        assert!(joined.contains("msg9"));
        assert!(!joined.contains("msg0"));
    }
}
