use chrono::Utc;
use uuid::Uuid;

use crate::utils::error::{ConversationError, ConversationResult};

use super::context_window::ContextWindow;
use super::exchange_log::ExchangeLog;
use super::types::{
    ConversationSnapshot, ConversationSummary, Exchange, SessionId, MAX_CONTEXT_WINDOW,
    MIN_CONTEXT_WINDOW,
};

/// One conversation thread with its own bounded history
#[derive(Debug, Clone)]
pub struct Session {
    session_id: SessionId,
    /// Rotated on clear, so a cleared session differs from a fresh one
    thread_id: Uuid,
    log: ExchangeLog,
    context_window: usize,
    /// Set once the session is removed from the store
    pub(crate) deleted: bool,
}

impl Session {
    pub fn new(session_id: SessionId, max_history: usize, context_window: usize) -> Self {
        Self {
            session_id,
            thread_id: Uuid::new_v4(),
            log: ExchangeLog::new(max_history),
            context_window: context_window.clamp(MIN_CONTEXT_WINDOW, MAX_CONTEXT_WINDOW),
            deleted: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn thread_id(&self) -> Uuid {
        self.thread_id
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    pub fn max_history(&self) -> usize {
        self.log.max_history()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn last_question(&self) -> &str {
        self.log.last_question()
    }

    pub fn last_answer(&self) -> &str {
        self.log.last_answer()
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.log.all()
    }

    /// Transcript of the last `n` exchanges (session window when `None`)
    pub fn context(&self, n: Option<usize>) -> String {
        ContextWindow::render(&self.log, n.unwrap_or(self.context_window))
    }

    pub fn append(&mut self, question: String, answer: String, sources: Vec<String>) -> usize {
        self.log.append(question, answer, sources)
    }

    pub fn set_context_window(&mut self, n: usize) -> ConversationResult<()> {
        validate_context_window(n)?;
        self.context_window = n;
        Ok(())
    }

    /// Empty the log and start a new thread under the same id
    pub fn reset(&mut self) {
        self.log.clear();
        self.thread_id = Uuid::new_v4();
    }

    /// Overwrite the log from a snapshot. Returns how many of the oldest
    /// exchanges did not fit into `max_history`.
    pub fn restore(&mut self, history: Vec<Exchange>) -> usize {
        self.thread_id = Uuid::new_v4();
        self.log.replace(history)
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: self.session_id.clone(),
            history: self.log.all(),
            saved_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            session_id: self.session_id.clone(),
            turn_count: self.log.len(),
            last_question: self.log.last_question().to_string(),
            created_at: self.log.first().map(|e| e.timestamp),
        }
    }
}

pub fn validate_context_window(n: usize) -> ConversationResult<()> {
    if !(MIN_CONTEXT_WINDOW..=MAX_CONTEXT_WINDOW).contains(&n) {
        return Err(ConversationError::InvalidArgument(format!(
            "context_window must be between {} and {}, got {}",
            MIN_CONTEXT_WINDOW, MAX_CONTEXT_WINDOW, n
        )));
    }
    Ok(())
}
