use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::services::conversation::{
    DEFAULT_CONTEXT_WINDOW, DEFAULT_FOLLOW_UP_TEMPLATE, DEFAULT_MAX_HISTORY, MAX_CONTEXT_WINDOW,
    MIN_CONTEXT_WINDOW,
};

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/settings";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub conversation: ConversationConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationConfig {
    /// Exchanges kept per session before the oldest are evicted
    pub max_history: usize,
    /// Exchanges surfaced as context for a new query (1..=10)
    pub context_window: usize,
    /// Rewrite applied to follow-up questions.
    /// Placeholders: `{last_question}`, `{question}`
    pub follow_up_template: String,
    /// 0 = unlimited
    pub max_sessions: usize,
    /// Refuse new sessions at or above this system memory usage
    pub memory_limit_percent: f64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            context_window: DEFAULT_CONTEXT_WINDOW,
            follow_up_template: DEFAULT_FOLLOW_UP_TEMPLATE.to_string(),
            max_sessions: 0,
            memory_limit_percent: 90.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Daily rolling log files are written here when set
    #[serde(default)]
    pub directory: Option<String>,
}

impl Settings {
    /// Load from `config/settings.*` (optional) and `APP__*` environment variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var("RAG_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = ConversationConfig::default();
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("conversation.max_history", defaults.max_history as i64)?
            .set_default("conversation.context_window", defaults.context_window as i64)?
            .set_default("conversation.follow_up_template", defaults.follow_up_template)?
            .set_default("conversation.max_sessions", defaults.max_sessions as i64)?
            .set_default("conversation.memory_limit_percent", defaults.memory_limit_percent)?
            .set_default("llm.base_url", "https://api.openai.com")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.temperature", 0.0)?
            .set_default("llm.max_tokens", 2048)?
            .set_default("llm.timeout_seconds", 60)?
            .set_default("logging.format", "pretty")?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.conversation.max_history == 0 {
            bail!("conversation.max_history must be at least 1");
        }

        let window = self.conversation.context_window;
        if !(MIN_CONTEXT_WINDOW..=MAX_CONTEXT_WINDOW).contains(&window) {
            bail!(
                "conversation.context_window must be in [{}, {}], got {}",
                MIN_CONTEXT_WINDOW,
                MAX_CONTEXT_WINDOW,
                window
            );
        }

        if !(0.0..=100.0).contains(&self.conversation.memory_limit_percent) {
            bail!("conversation.memory_limit_percent must be a percentage");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn log_directory(&self) -> Option<PathBuf> {
        self.logging.directory.as_ref().map(PathBuf::from)
    }
}
