use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::models::chat::{AnswerResponse, ReferenceDocument, SourceInfo};
use crate::services::conversation::ConversationManager;
use crate::services::llm_service::LlmProvider;
use crate::services::prompt_builder::PromptBuilder;
use crate::utils::error::ConversationResult;

pub const NO_DOCUMENTS_ANSWER: &str = "No relevant documents found for your question.";

const PREVIEW_CHARS: usize = 200;

/// Orchestrates one question/answer turn around the conversation core.
///
/// Retrieval stays with the caller: it passes the documents it found for the
/// enhanced question. The turn is always recorded, with an error placeholder
/// as the answer when generation fails.
pub struct AskService {
    manager: Arc<ConversationManager>,
    llm: Arc<dyn LlmProvider>,
}

impl AskService {
    pub fn new(manager: Arc<ConversationManager>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { manager, llm }
    }

    pub fn manager(&self) -> &Arc<ConversationManager> {
        &self.manager
    }

    pub async fn ask(
        &self,
        conversation_id: Option<&str>,
        question: &str,
        documents: &[ReferenceDocument],
    ) -> ConversationResult<AnswerResponse> {
        let start_time = Instant::now();

        let conversation_id = self.manager.resolve_session(conversation_id)?;
        let prepared = self.manager.prepare_query(&conversation_id, question)?;

        if prepared.follow_up {
            info!("Detected follow-up question, enhancing context");
        }

        let answer = if documents.is_empty() {
            NO_DOCUMENTS_ANSWER.to_string()
        } else {
            let messages = PromptBuilder::build(question, &prepared.context, documents);
            match self.llm.generate(&messages).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!("Error generating answer for {}: {}", conversation_id, e);
                    format!("Error generating answer: {}", e)
                }
            }
        };

        let source_names: Vec<String> = documents.iter().map(|doc| doc.filename.clone()).collect();
        let turn_number = self
            .manager
            .record_turn(&conversation_id, question, &answer, source_names)?;

        info!(
            "Answered turn {} in {} ({} documents, {}ms)",
            turn_number,
            conversation_id,
            documents.len(),
            start_time.elapsed().as_millis()
        );

        Ok(AnswerResponse {
            answer,
            conversation_id,
            question: question.to_string(),
            enhanced_question: prepared.enhanced_question,
            sources: documents.iter().map(source_info).collect(),
            turn_number,
        })
    }
}

fn source_info(doc: &ReferenceDocument) -> SourceInfo {
    let preview = if doc.content.chars().count() > PREVIEW_CHARS {
        format!("{}...", doc.content.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        doc.content.clone()
    };

    SourceInfo {
        filename: doc.filename.clone(),
        preview,
        doc_id: doc.doc_id.clone(),
    }
}
