use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::chat::*;
use crate::services::conversation::{ConversationManager, ConversationSnapshot};
use crate::utils::error::{ApiError, ConversationError};

pub async fn list_conversations_handler(
    State(manager): State<Arc<ConversationManager>>,
) -> Json<ConversationListResponse> {
    let conversations = manager.list_sessions();
    Json(ConversationListResponse {
        total: conversations.len(),
        conversations,
    })
}

pub async fn resolve_session_handler(
    State(manager): State<Arc<ConversationManager>>,
    body: Option<Json<ResolveSessionRequest>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let session_id = manager.resolve_session(request.session_id.as_deref())?;
    Ok(Json(SessionResponse { session_id }))
}

pub async fn get_history_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = manager.get_history(&session_id)?;
    Ok(Json(HistoryResponse {
        conversation_id: session_id,
        total_turns: history.len(),
        history,
    }))
}

pub async fn delete_conversation_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    manager.delete(&session_id)?;
    Ok(Json(MessageResponse {
        message: format!("Conversation {} deleted successfully", session_id),
    }))
}

pub async fn clear_conversation_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    manager.clear(&session_id)?;
    Ok(Json(MessageResponse {
        message: format!("Conversation {} cleared", session_id),
    }))
}

pub async fn prepare_query_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
    Json(request): Json<PrepareQueryRequest>,
) -> Result<Json<PrepareQueryResponse>, ApiError> {
    let prepared = manager.prepare_query(&session_id, &request.question)?;
    Ok(Json(PrepareQueryResponse {
        session_id,
        enhanced_question: prepared.enhanced_question,
        context_used: prepared.context_used,
        follow_up: prepared.follow_up,
    }))
}

pub async fn record_turn_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
    Json(request): Json<RecordTurnRequest>,
) -> Result<Json<RecordTurnResponse>, ApiError> {
    let turn_number = manager.record_turn(&session_id, &request.question, &request.answer, request.sources)?;
    Ok(Json(RecordTurnResponse {
        session_id,
        turn_number,
    }))
}

pub async fn set_context_window_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
    Json(request): Json<ContextWindowRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    manager.set_context_window(&session_id, request.context_window)?;
    Ok(Json(MessageResponse {
        message: format!("Context window set to {}", request.context_window),
    }))
}

pub async fn export_conversation_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationSnapshot>, ApiError> {
    Ok(Json(manager.export(&session_id)?))
}

/// Takes the raw body so any malformed snapshot surfaces as InvalidFormat
pub async fn import_conversation_handler(
    State(manager): State<Arc<ConversationManager>>,
    body: Bytes,
) -> Result<Json<SessionResponse>, ApiError> {
    let raw = std::str::from_utf8(&body)
        .map_err(|e| ConversationError::InvalidFormat(format!("snapshot is not UTF-8: {}", e)))?;
    let session_id = manager.import_json(raw)?;
    info!("Imported conversation {}", session_id);
    Ok(Json(SessionResponse { session_id }))
}
