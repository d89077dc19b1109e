use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

use crate::models::chat::{AnswerResponse, AskRequest};
use crate::services::AskService;
use crate::utils::error::ApiError;

/// Ask question with optional conversation context
pub async fn ask_handler(
    State(ask_service): State<Arc<AskService>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    info!(
        "Ask request: conversation={:?}, question_len={}, documents={}",
        request.conversation_id,
        request.question.len(),
        request.documents.len()
    );

    let response = ask_service
        .ask(
            request.conversation_id.as_deref(),
            &request.question,
            &request.documents,
        )
        .await?;

    Ok(Json(response))
}
