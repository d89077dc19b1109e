pub mod ask_service;
pub mod conversation;
pub mod llm_service;
pub mod prompt_builder;

pub use ask_service::AskService;
pub use conversation::ConversationManager;
pub use llm_service::{LlmProvider, LlmService};
pub use prompt_builder::PromptBuilder;
