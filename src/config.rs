use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://integrate.api.nvidia.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta/llama-4-maverick-17b-128e-instruct";
pub const DEFAULT_API_KEY_ENV: &str = "NVIDIA_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completions endpoint URL
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Name looked up in the secrets store and then in the environment
    pub api_key_env: String,

    /// Whole-request timeout, in seconds
    pub timeout_secs: u64,

    /// Optional file replacing the built-in persona prompt
    pub persona_file: Option<PathBuf>,

    /// Secrets store; defaults to `secrets.toml` next to the config file
    pub secrets_file: Option<PathBuf>,

    pub sampling: SamplingConfig,

    pub ui: UiConfig,

    /// Directory holding config, secrets and logs
    #[serde(skip)]
    pub home: PathBuf,
}

/// Generation parameters for the completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub subtitle: String,
    pub placeholder: String,
    /// Label on assistant messages
    pub assistant_name: String,
    /// Lines shown in the sidebar
    pub about: Vec<String>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.9,
            top_p: 1.0,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "🐱 Cica的 AI 分身".to_string(),
            subtitle: "一个高冷的 AI 女生 | 只和熟人多说话 | 爱猫爱吐槽".to_string(),
            placeholder: "说点什么...".to_string(),
            assistant_name: "Cica".to_string(),
            about: vec![
                "这是Cica的 AI 分身".to_string(),
                String::new(),
                "性格特点".to_string(),
                "- 超级高冷".to_string(),
                "- 对陌生人很冷淡".to_string(),
                "- 熟人会多聊".to_string(),
                "- 爱聊猫猫琥珀".to_string(),
                "- 爱吐槽工作".to_string(),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 30,
            persona_file: None,
            secrets_file: None,
            sampling: SamplingConfig::default(),
            ui: UiConfig::default(),
            home: default_home(),
        }
    }
}

/// `~/.persona-chat`, or a relative fallback when there is no home directory.
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".persona-chat")
}

impl Config {
    /// Load `config.toml` from the default home directory
    pub fn load() -> Result<Self> {
        Self::load_from(&default_home().join("config.toml"))
    }

    /// Load configuration from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        config.home = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Save configuration to `config.toml` in the home directory
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home)
            .with_context(|| format!("Failed to create {}", self.home.display()))?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.config_path(), content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.secrets_file
            .clone()
            .unwrap_or_else(|| self.home.join("secrets.toml"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join("persona-chat.log")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
