//! DELETE /api/v1/conversations/{id} - forget a conversation's messages.

use std::time::Instant;

use axum::extract::{Path, State};
use serde::Serialize;

use parlor_types::conversation::ConversationId;

use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearedConversation {
    pub conversation_id: ConversationId,
    /// Messages removed; 0 for an id never seen.
    pub cleared: usize,
}

pub async fn clear_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<ClearedConversation> {
    let start = Instant::now();
    let conversation_id = ConversationId::from(id);
    let cleared = state.orchestrator.memory().clear(&conversation_id);
    tracing::info!(conversation_id = %conversation_id, cleared, "conversation cleared");
    ApiResponse::success(
        ClearedConversation {
            conversation_id,
            cleared,
        },
        start,
    )
}
