//! Chat transcript display

use crate::conversation::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Renders the visible turns, newest at the bottom
pub struct HistoryView<'a> {
    pub turns: &'a [Message],
    pub pending: bool,
    /// Turn indices whose text is a flattened failure
    pub error_turns: &'a [usize],
    pub assistant_name: &'a str,
    /// Lines scrolled up from the bottom
    pub scroll: usize,
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL);
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.turns.is_empty() && !self.pending {
            let hint = Line::from(vec![Span::styled(
                "Enter 发送  Shift+Enter 换行  / 命令",
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &hint, inner_area.width);
            return;
        }

        let width = inner_area.width.saturating_sub(2) as usize;
        let mut all_lines: Vec<Line> = Vec::new();
        for (index, message) in self.turns.iter().enumerate() {
            let is_error = self.error_turns.contains(&index);
            all_lines.extend(render_message(message, self.assistant_name, width, is_error));
            all_lines.push(Line::from(""));
        }

        if self.pending {
            all_lines.push(Line::from(vec![
                Span::styled("🐱 ", Style::default().fg(Color::Green)),
                Span::styled(thinking_dots(), Style::default().fg(Color::Yellow)),
            ]));
        }

        let height = inner_area.height as usize;
        let end = all_lines.len().saturating_sub(self.scroll);
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn render_message(
    message: &Message,
    assistant_name: &str,
    width: usize,
    is_error: bool,
) -> Vec<Line<'static>> {
    let (icon, label) = match message.role() {
        Role::User => ("👤", "你"),
        Role::Assistant => ("🐱", assistant_name),
        Role::System => ("⚙️", "system"),
    };

    let timestamp = message.timestamp().format("%H:%M:%S").to_string();
    let mut lines = vec![Line::from(vec![Span::styled(
        format!("{icon} {label} {timestamp}"),
        Style::default().fg(Color::DarkGray),
    )])];

    let style = content_style(message.role(), is_error);
    for content_line in wrap_text(message.content(), width) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, style),
        ]));
    }

    lines
}

fn content_style(role: Role, is_error: bool) -> Style {
    if is_error {
        return Style::default().fg(Color::Red);
    }
    match role {
        Role::User => Style::default().fg(Color::Blue),
        Role::Assistant => Style::default().fg(Color::Green),
        Role::System => Style::default().fg(Color::Yellow),
    }
}

fn thinking_dots() -> &'static str {
    let tick = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300;
    match tick % 4 {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "",
    }
}

/// Wrap text by display width, keeping explicit newlines and inner spacing.
///
/// Chinese text has no spaces to break on, so lines are cut by column count
/// with wide characters counted as two.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for c in raw_line.chars() {
            let w = c.width().unwrap_or(0);
            if current_width + w > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += w;
        }
        lines.push(current);
    }

    lines
}
