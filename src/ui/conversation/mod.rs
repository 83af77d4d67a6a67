//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod sidebar;

pub use commands::{SlashCommand, get_help_text};
pub use composer::{Composer, ComposerResult};
pub use history::HistoryView;
pub use sidebar::Sidebar;
