use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use std::io;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::UiConfig;
use crate::session::{ChatSession, CompletedTurn};
use crate::ui::conversation::{
    Composer, ComposerResult, HistoryView, Sidebar, SlashCommand, get_help_text,
};

const TICK: Duration = Duration::from_millis(100);
const SCROLL_STEP: usize = 5;

/// Actions the chat screen can ask the event loop to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    None,
    Exit,
}

/// Chat screen state: the session plus everything needed to draw it
pub struct App {
    ui: UiConfig,
    session: ChatSession,
    composer: Composer,
    /// Task running the pending completion; aborted when the chat is cleared
    inflight: Option<JoinHandle<CompletedTurn>>,
    /// Indices into `session.log().turns()` holding flattened failures
    error_turns: Vec<usize>,
    notice: Option<String>,
    scroll: usize,
}

impl App {
    pub fn new(ui: UiConfig, session: ChatSession) -> Self {
        let composer = Composer::new(ui.placeholder.clone());
        Self {
            ui,
            session,
            composer,
            inflight: None,
            error_turns: Vec::new(),
            notice: None,
            scroll: 0,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.kind != KeyEventKind::Press {
            return AppAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return AppAction::Exit,
                KeyCode::Char('l') => {
                    self.clear();
                    return AppAction::None;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::PageUp => {
                self.scroll += SCROLL_STEP;
                return AppAction::None;
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(SCROLL_STEP);
                return AppAction::None;
            }
            _ => {}
        }

        // input stays disabled until the reply lands
        if self.session.is_pending() {
            return AppAction::None;
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.submit(text);
                AppAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => AppAction::None,
        }
    }

    fn submit(&mut self, text: String) {
        let Some(turn) = self.session.begin(text) else {
            return;
        };

        self.inflight = Some(tokio::spawn(turn.run()));
        self.notice = None;
        self.scroll = 0;
        self.composer.set_enabled(false);
    }

    /// Pick up the completion once its task has finished (called from the main loop)
    pub async fn poll_completion(&mut self) {
        if self.inflight.as_ref().is_some_and(JoinHandle::is_finished) {
            self.wait_for_reply().await;
        }
    }

    /// Wait for the in-flight completion, if any, and record it
    pub async fn wait_for_reply(&mut self) {
        if let Some(handle) = self.inflight.take() {
            match handle.await {
                Ok(completed) => {
                    if let Some(exchange) = self.session.finish(completed) {
                        if exchange.is_error() {
                            self.error_turns.push(self.session.log().turns().len() - 1);
                        }
                    }
                }
                Err(err) => {
                    // the task is gone either way, so the turn can be dropped
                    if err.is_panic() {
                        tracing::error!("completion task panicked");
                        self.notice = Some("请求中断了 再试一次".to_string());
                    }
                    self.session.abandon_pending();
                }
            }
        }
        self.composer.set_enabled(!self.session.is_pending());
    }

    fn clear(&mut self) {
        if let Some(handle) = &self.inflight {
            handle.abort();
        }
        self.session.reset();
        self.error_turns.clear();
        self.composer.clear();
        self.composer.set_enabled(!self.session.is_pending());
        self.scroll = 0;
        self.notice = Some("对话已清空".to_string());
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: SlashCommand) -> AppAction {
        match command {
            SlashCommand::Clear => {
                self.clear();
                AppAction::None
            }
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                AppAction::None
            }
            SlashCommand::Quit => AppAction::Exit,
        }
    }

    /// Render the whole chat screen
    pub fn draw(&self, frame: &mut Frame) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(30), Constraint::Length(28)])
            .split(frame.size());

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),                            // Title
                Constraint::Min(5),                               // History
                Constraint::Length(self.composer.palette_height()), // Palette
                Constraint::Length(3),                            // Composer
                Constraint::Length(1),                            // Status
            ])
            .split(columns[0]);

        let header = vec![
            Line::from(Span::styled(
                self.ui.title.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                self.ui.subtitle.as_str(),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        for (i, line) in header.iter().enumerate() {
            if (i as u16) < rows[0].height {
                frame
                    .buffer_mut()
                    .set_line(rows[0].x, rows[0].y + i as u16, line, rows[0].width);
            }
        }

        frame.render_widget(
            HistoryView {
                turns: self.session.log().turns(),
                pending: self.session.is_pending(),
                error_turns: &self.error_turns,
                assistant_name: &self.ui.assistant_name,
                scroll: self.scroll,
            },
            rows[1],
        );
        frame.render_widget(self.composer.palette(), rows[2]);
        frame.render_widget(&self.composer, rows[3]);

        let status = match &self.notice {
            Some(notice) => Span::styled(notice.as_str(), Style::default().fg(Color::Yellow)),
            None if self.session.is_pending() => {
                Span::styled("...", Style::default().fg(Color::DarkGray))
            }
            None => Span::styled(
                "Enter 发送  /help 帮助  PgUp/PgDn 滚动",
                Style::default().fg(Color::DarkGray),
            ),
        };
        frame
            .buffer_mut()
            .set_line(rows[4].x, rows[4].y, &Line::from(status), rows[4].width);

        frame.render_widget(
            Sidebar {
                about: &self.ui.about,
                turn_count: self.session.log().turns().len(),
            },
            columns[1],
        );
    }

    async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            self.poll_completion().await;
            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key) == AppAction::Exit {
                        return Ok(());
                    }
                }
            }
            tokio::task::yield_now().await;
        }
    }
}

/// Run the chat screen until the user quits, restoring the terminal afterwards
pub async fn run(ui: UiConfig, session: ChatSession) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(ui, session);
    let result = app.event_loop(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
