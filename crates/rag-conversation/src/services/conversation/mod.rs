//! Conversation memory management module
//!
//! Provides in-memory conversation state management with:
//! - Thread-safe session store (DashMap + per-session locks)
//! - Capacity-bounded exchange logs
//! - Context window transcripts
//! - Follow-up detection and query enhancement
//! - Snapshot export/import and file persistence

mod active;
mod cache;
mod context_window;
mod exchange_log;
mod follow_up;
pub mod manager;
pub mod persistence;
mod query_enhancer;
mod session;
pub mod types;

pub use active::ActiveConversation;
pub use cache::{generate_session_id, SessionStore, SharedSession, StoreLimits, StoreStats};
pub use context_window::ContextWindow;
pub use exchange_log::ExchangeLog;
pub use follow_up::{FollowUpDetector, FOLLOW_UP_INDICATORS};
pub use manager::ConversationManager;
pub use query_enhancer::{QueryEnhancer, DEFAULT_FOLLOW_UP_TEMPLATE, INDONESIAN_FOLLOW_UP_TEMPLATE};
pub use session::Session;
pub use types::{
    ConversationSnapshot, ConversationSummary, Exchange, PreparedQuery, SessionId,
    DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_HISTORY, MAX_CONTEXT_WINDOW, MIN_CONTEXT_WINDOW,
};
