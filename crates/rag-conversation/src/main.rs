use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use rag_conversation::config::Settings;
use rag_conversation::handlers::build_router;
use rag_conversation::services::{AskService, ConversationManager, LlmService};
use rag_conversation::state::AppState;
use rag_conversation::utils::{init_logger, LogTarget};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging (keep the guard alive for file output)
    let _guard = init_logger(&settings.logging, LogTarget::Stdout, "rag-conversation")?;

    info!("🚀 Starting RAG conversation server...");
    info!(
        "✅ Configuration loaded (max_history={}, context_window={})",
        settings.conversation.max_history, settings.conversation.context_window
    );

    // Initialize services
    let conversation_manager = Arc::new(ConversationManager::new(&settings.conversation));
    let llm_service = Arc::new(LlmService::new(settings.llm.clone())?);
    info!("✅ LLM client ready ({} @ {})", settings.llm.model, settings.llm.base_url);

    let ask_service = Arc::new(AskService::new(conversation_manager, llm_service));

    // Build router
    let app = build_router(AppState::new(ask_service));

    // Server address
    let addr: SocketAddr = settings.bind_address().parse()?;
    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
