use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::utils::error::{ConversationError, ConversationResult};

use super::manager::ConversationManager;
use super::persistence::{load_snapshot, save_snapshot};
use super::types::{Exchange, SessionId};

/// Single-user view over the store with one "current" conversation.
///
/// Unlike the keyed API, clearing here starts a brand-new session id, so an
/// export saved before the clear never mixes with turns recorded after it.
pub struct ActiveConversation {
    manager: Arc<ConversationManager>,
    session_id: SessionId,
}

impl ActiveConversation {
    /// Bind to `session_id` (or a generated one)
    pub fn start(manager: Arc<ConversationManager>, session_id: Option<&str>) -> ConversationResult<Self> {
        let session_id = manager.resolve_session(session_id)?;
        Ok(Self {
            manager,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn manager(&self) -> &Arc<ConversationManager> {
        &self.manager
    }

    pub fn history(&self) -> ConversationResult<Vec<Exchange>> {
        self.manager.get_history(&self.session_id)
    }

    pub fn context_window(&self) -> ConversationResult<usize> {
        self.manager.context_window(&self.session_id)
    }

    pub fn set_context_window(&self, n: usize) -> ConversationResult<()> {
        self.manager.set_context_window(&self.session_id, n)
    }

    /// Drop the history and move to a freshly generated session id
    pub fn clear(&mut self) -> ConversationResult<&str> {
        self.session_id = self.manager.rotate(&self.session_id)?;
        Ok(&self.session_id)
    }

    pub fn save(&self, path: Option<&Path>) -> ConversationResult<PathBuf> {
        let snapshot = self.manager.export(&self.session_id)?;
        save_snapshot(&snapshot, path)
    }

    /// Replace the current conversation with one loaded from disk
    pub fn load(&mut self, path: &Path) -> ConversationResult<&str> {
        let snapshot = load_snapshot(path)?;
        let loaded_id = self.manager.import(snapshot)?;

        if loaded_id != self.session_id {
            // The previous conversation is no longer reachable from here
            match self.manager.delete(&self.session_id) {
                Ok(()) | Err(ConversationError::NotFound(_)) => {}
                Err(e) => warn!("Failed to drop conversation {}: {}", self.session_id, e),
            }
            self.session_id = loaded_id;
        }

        info!("Active conversation is now {}", self.session_id);
        Ok(&self.session_id)
    }
}
