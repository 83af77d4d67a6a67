use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::ui::conversation::history::wrap_text;

/// "About" panel with persona notes and key hints
pub struct Sidebar<'a> {
    pub about: &'a [String],
    pub turn_count: usize,
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("关于这个 AI 分身");
        let inner = block.inner(area);
        block.render(area, buf);

        let width = inner.width as usize;
        let mut lines: Vec<Line> = Vec::new();
        for entry in self.about {
            for wrapped in wrap_text(entry, width) {
                lines.push(Line::from(Span::raw(wrapped)));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} 条消息", self.turn_count),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Ctrl+L 清空对话",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            "Ctrl+C 退出",
            Style::default().fg(Color::DarkGray),
        )));

        for (i, line) in lines.iter().take(inner.height as usize).enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }
    }
}
