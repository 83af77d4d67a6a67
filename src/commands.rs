use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

use crate::config::Config;
use crate::secrets::{self, SecretStore};
use crate::session::ChatSession;

/// Send one message and print the reply
pub async fn ask(session: &mut ChatSession, message: &str) -> Result<()> {
    if let Some(exchange) = session.submit(message).await {
        println!("{}", exchange.reply);
    }
    Ok(())
}

/// What one read from the REPL's input produced
#[derive(Debug, PartialEq, Eq)]
enum ReadLine {
    Line,
    /// Bytes that were not UTF-8; the line has been consumed
    Invalid,
    Eof,
}

fn read_line(input: &mut impl BufRead, line: &mut String) -> Result<ReadLine> {
    line.clear();
    match input.read_line(line) {
        Ok(0) => Ok(ReadLine::Eof),
        Ok(_) => Ok(ReadLine::Line),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            tracing::warn!("skipping input line that is not valid UTF-8");
            line.clear();
            Ok(ReadLine::Invalid)
        }
        Err(err) => Err(err).context("Failed to read user input"),
    }
}

/// Line-oriented chat on stdin/stdout
pub async fn repl(session: &mut ChatSession, config: &Config) -> Result<()> {
    println!("{}", config.ui.title);
    println!("{}", config.ui.subtitle);
    println!("{}", "=".repeat(50));
    println!("/clear 清空对话   /quit 退出");
    println!();

    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        match read_line(&mut io::stdin().lock(), &mut line)? {
            ReadLine::Eof => break,
            ReadLine::Invalid => {
                println!("⚠️  这一行不是有效的 UTF-8 已跳过");
                continue;
            }
            ReadLine::Line => {}
        }
        let text = line.trim_end_matches(['\r', '\n']);

        match text.trim() {
            "" => continue,
            "/quit" | "/q" | "/exit" => break,
            "/clear" => {
                session.reset();
                println!("🧹 对话已清空");
                continue;
            }
            _ => {}
        }

        if let Some(exchange) = session.submit(text.to_string()).await {
            println!("{}", exchange.reply);
            println!();
        }
    }

    Ok(())
}

/// Write a default `config.toml` unless one already exists
pub fn init_config(config: &Config) -> Result<()> {
    let path = config.config_path();
    if path.exists() {
        println!("⚠️  {} already exists, leaving it alone", path.display());
        return Ok(());
    }
    config.save()?;
    tracing::info!(path = %path.display(), "wrote default configuration");
    println!("✅ Wrote {}", path.display());
    Ok(())
}

/// Print the resolved settings, never the key itself
pub fn show_config(config: &Config) -> Result<()> {
    let store = SecretStore::load(&config.secrets_path())?;
    let key_status = match secrets::resolve_api_key(&store, &config.api_key_env) {
        Some((_, source)) => format!("found in {source}"),
        None => "not set".to_string(),
    };

    println!("⚙️  persona-chat configuration");
    println!("{}", "=".repeat(50));
    println!("   📄 Config:      {}", config.config_path().display());
    println!("   🔐 Secrets:     {}", config.secrets_path().display());
    println!("   🌐 Endpoint:    {}", config.endpoint);
    println!("   🤖 Model:       {}", config.model);
    println!(
        "   🎛  Sampling:    max_tokens={} temperature={} top_p={}",
        config.sampling.max_tokens, config.sampling.temperature, config.sampling.top_p
    );
    println!("   ⏱  Timeout:     {}s", config.timeout_secs);
    println!("   🔑 {}: {}", config.api_key_env, key_status);
    match &config.persona_file {
        Some(path) => println!("   🎭 Persona:     {}", path.display()),
        None => println!("   🎭 Persona:     built-in"),
    }
    println!("   📝 Log file:    {}", config.log_path().display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn invalid_utf8_line_is_skipped_not_fatal() {
        let mut input = Cursor::new(b"ok\n\xff\xfe\nnext\n".to_vec());
        let mut line = String::new();

        assert_eq!(read_line(&mut input, &mut line).unwrap(), ReadLine::Line);
        assert_eq!(line, "ok\n");
        assert_eq!(read_line(&mut input, &mut line).unwrap(), ReadLine::Invalid);
        assert!(line.is_empty());
        assert_eq!(read_line(&mut input, &mut line).unwrap(), ReadLine::Line);
        assert_eq!(line, "next\n");
        assert_eq!(read_line(&mut input, &mut line).unwrap(), ReadLine::Eof);
    }

    #[test]
    fn init_config_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        init_config(&config).unwrap();
        let written = Config::load_from(&config.config_path()).unwrap();
        assert_eq!(written.model, config.model);
        assert_eq!(written.sampling, config.sampling);

        fs::write(config.config_path(), "model = \"mine\"\n").unwrap();
        init_config(&config).unwrap();
        let kept = fs::read_to_string(config.config_path()).unwrap();
        assert_eq!(kept, "model = \"mine\"\n");
    }
}
