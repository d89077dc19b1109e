pub mod error;
pub mod logger;

pub use error::{ApiError, ConversationError, ConversationResult};
pub use logger::{init_logger, LogTarget};
