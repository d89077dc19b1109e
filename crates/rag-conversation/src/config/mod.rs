pub mod settings;

pub use settings::{
    ConversationConfig, LlmConfig, LogFormat, LoggingConfig, ServerConfig, Settings,
    DEFAULT_CONFIG_PATH,
};
