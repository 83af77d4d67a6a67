use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Clear the conversation
    Clear,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Clear => "清空对话",
            SlashCommand::Help => "显示可用命令",
            SlashCommand::Quit => "退出",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let head = input.strip_prefix('/')?.split_whitespace().next()?;

    SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "exit" | "bye" => Some(SlashCommand::Quit),
            "c" | "reset" | "new" => Some(SlashCommand::Clear),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::new();
    for entry in command_entries() {
        help.push_str(&format!("/{} {}  ", entry.keyword, entry.description));
    }
    help.push_str("Ctrl+L 清空  Ctrl+C 退出");
    help
}
