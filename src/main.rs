use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use persona_chat::config::Config;
use persona_chat::llm::CompletionClient;
use persona_chat::secrets::{self, ApiKey, SecretStore};
use persona_chat::session::ChatSession;
use persona_chat::{commands, persona, ui};

#[derive(Parser)]
#[command(name = "persona-chat")]
#[command(version)]
#[command(about = "Chat with an LLM persona from the terminal", long_about = None)]
struct Cli {
    /// Path to config.toml (default: ~/.persona-chat/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Line-based chat on stdin/stdout
    Repl,
    /// Show resolved configuration
    Config {
        /// Write a default config.toml if there is none yet
        #[arg(long)]
        init: bool,
    },
}

fn init_logging(config: &Config, verbose: bool, to_file: bool) -> Result<()> {
    let default_level = if verbose { "persona_chat=debug" } else { "persona_chat=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    if to_file {
        // the chat screen owns the terminal, so logs go to a file
        fs::create_dir_all(&config.home)
            .with_context(|| format!("Failed to create {}", config.home.display()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log_path())
            .context("Failed to open log file")?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn build_session(config: &Config) -> Result<ChatSession> {
    let store = SecretStore::load(&config.secrets_path())?;
    let api_key = match secrets::resolve_api_key(&store, &config.api_key_env) {
        Some((key, source)) => {
            tracing::info!(%source, "API key resolved");
            key
        }
        None => {
            tracing::warn!(
                name = %config.api_key_env,
                "no API key found; requests will be sent without credentials"
            );
            ApiKey::default()
        }
    };

    let persona = persona::load(config)?;
    let client = CompletionClient::from_config(config, api_key)?;
    Ok(ChatSession::new(persona, Arc::new(client)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let command = cli.command.unwrap_or(Commands::Chat);
    init_logging(&config, cli.verbose, matches!(command, Commands::Chat))?;

    match command {
        Commands::Chat => {
            let session = build_session(&config)?;
            ui::run(config.ui.clone(), session).await?;
        }
        Commands::Ask { message } => {
            let mut session = build_session(&config)?;
            commands::ask(&mut session, &message.join(" ")).await?;
        }
        Commands::Repl => {
            let mut session = build_session(&config)?;
            commands::repl(&mut session, &config).await?;
        }
        Commands::Config { init } => {
            if init {
                commands::init_config(&config)?;
            }
            commands::show_config(&config)?;
        }
    }

    Ok(())
}
