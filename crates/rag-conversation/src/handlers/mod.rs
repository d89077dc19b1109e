pub mod ask;
pub mod conversation;
pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let conversation_routes = Router::new()
        .route(
            "/api/conversations",
            get(conversation::list_conversations_handler)
                .post(conversation::resolve_session_handler),
        )
        .route(
            "/api/conversations/import",
            post(conversation::import_conversation_handler),
        )
        .route(
            "/api/conversations/{id}",
            get(conversation::get_history_handler)
                .delete(conversation::delete_conversation_handler),
        )
        .route(
            "/api/conversations/{id}/clear",
            post(conversation::clear_conversation_handler),
        )
        .route(
            "/api/conversations/{id}/prepare",
            post(conversation::prepare_query_handler),
        )
        .route(
            "/api/conversations/{id}/turns",
            post(conversation::record_turn_handler),
        )
        .route(
            "/api/conversations/{id}/context-window",
            put(conversation::set_context_window_handler),
        )
        .route(
            "/api/conversations/{id}/export",
            get(conversation::export_conversation_handler),
        )
        .route("/api/ask", post(ask::ask_handler))
        .route("/api/stats", get(health::stats_handler));

    Router::new()
        .merge(public_routes)
        .merge(conversation_routes)
        .with_state(state)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}
