use crate::ui::conversation::commands::{
    CommandEntry, SlashCommand, command_entries, parse_slash_command,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(SlashCommand),
    None,
}

/// Single-input chat composer with a slash-command palette.
///
/// The cursor counts characters, not bytes, so multi-byte input such as
/// Chinese edits correctly.
#[derive(Debug, Clone)]
pub struct Composer {
    content: String,
    cursor: usize,
    placeholder: String,
    enabled: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl Composer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            enabled: true,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if self.show_command_palette && self.apply_selected_command() {
                    if let Some(command) = parse_slash_command(&self.content) {
                        self.clear();
                        return ComposerResult::Command(command);
                    }
                } else if !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    self.close_command_palette();
                    return match parse_slash_command(&content) {
                        Some(command) => ComposerResult::Command(command),
                        None => ComposerResult::Submitted(content),
                    };
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(_)
                if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {}
            KeyCode::Char(c) => {
                self.insert_char(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let idx = self.byte_index(self.cursor);
                    self.content.remove(idx);
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let idx = self.byte_index(self.cursor);
                    self.content.remove(idx);
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.char_count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_count(),
            _ => {}
        }

        ComposerResult::None
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_pos)
            .map(|(idx, _)| idx)
            .unwrap_or(self.content.len())
    }

    fn insert_char(&mut self, c: char) {
        let idx = self.byte_index(self.cursor);
        self.content.insert(idx, c);
        self.cursor += 1;
    }

    /// Open, refresh or close the palette to match the current content
    fn sync_command_palette(&mut self) {
        let is_command = self.content.starts_with('/') && !self.content.contains(char::is_whitespace);
        if !is_command {
            self.close_command_palette();
            return;
        }
        if !self.show_command_palette {
            self.show_command_palette = true;
            self.selected_command = Some(0);
        }
        self.refresh_command_palette();
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index).copied())
        else {
            return false;
        };

        self.content = format!("/{}", entry.keyword);
        self.cursor = self.char_count();
        self.close_command_palette();
        true
    }

    /// Disabled composers render greyed out; the caller stops routing keys
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.close_command_palette();
    }

    /// Rows the palette wants above the composer, zero when closed
    pub fn palette_height(&self) -> u16 {
        if self.show_command_palette {
            (self.filtered_commands.len().min(5) + 2) as u16
        } else {
            0
        }
    }

    pub fn palette(&self) -> CommandPalette<'_> {
        CommandPalette(self)
    }
}

impl Widget for &Composer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(if self.enabled { "💬" } else { "⏳" })
            .style(if self.enabled {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let mut content = self.content.clone();
        if self.enabled {
            content.insert(self.byte_index(self.cursor), '▌');
        }

        for (i, line_text) in content.split('\n').enumerate() {
            if i >= inner_area.height as usize {
                break;
            }
            let line = Line::from(vec![Span::raw(line_text)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}

/// Slash-command list drawn above the composer while typing a command
pub struct CommandPalette<'a>(&'a Composer);

impl Widget for CommandPalette<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let composer = self.0;
        if !composer.show_command_palette {
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Commands")
            .style(Style::default().fg(Color::Blue));
        let inner = block.inner(area);
        block.render(area, buf);

        for (index, entry) in composer.filtered_commands.iter().enumerate() {
            if index >= inner.height as usize {
                break;
            }

            let style = if composer.selected_command == Some(index) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let line = Line::from(vec![
                Span::styled(format!("/{}", entry.keyword), style),
                Span::raw("  "),
                Span::styled(entry.description, Style::default().fg(Color::Gray)),
            ]);
            buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(composer: &mut Composer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn submits_multibyte_text_with_cursor_edits() {
        let mut composer = Composer::new("说点什么...");
        type_str(&mut composer, "你好啊");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        type_str(&mut composer, "们");
        assert_eq!(composer.content(), "你们啊");

        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::Submitted("你们啊".to_string()));
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn blank_input_is_not_submitted() {
        let mut composer = Composer::new("");
        type_str(&mut composer, "   ");
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
    }

    #[test]
    fn palette_filters_and_submits_command() {
        let mut composer = Composer::new("");
        type_str(&mut composer, "/c");
        assert!(composer.is_palette_open());

        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::Command(SlashCommand::Clear));
        assert!(!composer.is_palette_open());
    }

    #[test]
    fn typed_command_with_argument_is_parsed() {
        let mut composer = Composer::new("");
        type_str(&mut composer, "/quit now");
        assert!(!composer.is_palette_open());
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Command(SlashCommand::Quit)
        );
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = Composer::new("");
        type_str(&mut composer, "a");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_str(&mut composer, "b");
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn control_and_alt_chords_do_not_type() {
        let mut composer = Composer::new("");
        type_str(&mut composer, "x");
        composer.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        composer.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::ALT));
        composer.handle_key(KeyEvent::new(KeyCode::Char('Y'), KeyModifiers::SHIFT));
        assert_eq!(composer.content(), "xY");
    }
}
