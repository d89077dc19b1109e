use axum::extract::FromRef;
use std::sync::Arc;

use crate::services::{AskService, ConversationManager};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation_manager: Arc<ConversationManager>,
    pub ask_service: Arc<AskService>,
}

impl AppState {
    pub fn new(ask_service: Arc<AskService>) -> Self {
        Self {
            conversation_manager: ask_service.manager().clone(),
            ask_service,
        }
    }
}

impl FromRef<AppState> for Arc<ConversationManager> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_manager.clone()
    }
}

impl FromRef<AppState> for Arc<AskService> {
    fn from_ref(state: &AppState) -> Self {
        state.ask_service.clone()
    }
}
