//! Axum router configuration with middleware.
//!
//! JSON API under `/api/v1/`, legacy plain-text routes at the root.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/agents", get(handlers::agents::list_agents))
        .route("/agents/{agent}", get(handlers::agents::get_agent))
        .route("/agents/{agent}/chat", post(handlers::chat::chat))
        .route("/agents/{agent}/chat/stream", post(handlers::chat::stream_chat))
        .route(
            "/conversations/{id}",
            delete(handlers::conversation::clear_conversation),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .route("/ai", get(handlers::legacy::ask))
        .route("/{conversation_id}/ai", get(handlers::legacy::ask_in_conversation))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
