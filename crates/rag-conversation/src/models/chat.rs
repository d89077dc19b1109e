use serde::{Deserialize, Serialize};

use crate::services::conversation::{ConversationSummary, Exchange};

// ===== LLM MESSAGES =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system", "user" atau "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Default, Deserialize)]
pub struct ResolveSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PrepareQueryRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordTurnRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContextWindowRequest {
    pub context_window: usize,
}

/// A reference document retrieved by the caller
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferenceDocument {
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub doc_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub documents: Vec<ReferenceDocument>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrepareQueryResponse {
    pub session_id: String,
    pub enhanced_question: String,
    pub context_used: bool,
    pub follow_up: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordTurnResponse {
    pub session_id: String,
    pub turn_number: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub conversation_id: String,
    pub history: Vec<Exchange>,
    pub total_turns: usize,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceInfo {
    pub filename: String,
    pub preview: String, // first 200 chars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub conversation_id: String,
    pub question: String,
    pub enhanced_question: String,
    pub sources: Vec<SourceInfo>,
    pub turn_number: usize,
}
