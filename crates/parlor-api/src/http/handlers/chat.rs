//! Chat endpoints.
//!
//! - POST /api/v1/agents/{agent}/chat         - one turn, JSON response
//! - POST /api/v1/agents/{agent}/chat/stream  - one turn as Server-Sent Events
//!
//! SSE event types:
//! - `fragment` - incremental text: `{ "text": "..." }`
//! - `done`     - end of turn: `{ "content": "...", "conversation_id": ... }`
//! - `error`    - turn failed: `{ "code": "...", "message": "..." }`
//!
//! A client that disconnects drops the turn; nothing is recorded in memory.

use std::collections::HashMap;
use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use parlor_core::agent::{TurnEvent, TurnRequest};
use parlor_types::conversation::ConversationId;
use parlor_types::llm::Usage;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Without an id the turn is stateless.
    pub conversation_id: Option<String>,
    pub message: String,
    /// Persona placeholder values, e.g. `{"voice": "pirate"}`.
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ChatRequest {
    fn into_turn(self) -> Result<TurnRequest, AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        Ok(TurnRequest {
            conversation_id: self
                .conversation_id
                .filter(|id| !id.is_empty())
                .map(ConversationId::from),
            message: self.message,
            params: self.params,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    /// Set when the exchange was recorded in memory.
    pub conversation_id: Option<ConversationId>,
    pub tool_rounds: u32,
    pub usage: Usage,
}

pub async fn chat(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<ApiResponse<ChatResponse>, AppError> {
    let start = Instant::now();
    let agent = state.catalog.get(&agent)?;
    let request = body.into_turn()?;

    // Fires if the client goes away and axum drops this future.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = state.orchestrator.run_turn(&agent, request, &cancel).await?;

    Ok(ApiResponse::success(
        ChatResponse {
            content: outcome.content,
            conversation_id: outcome.conversation_id,
            tool_rounds: outcome.tool_rounds,
            usage: outcome.usage,
        },
        start,
    ))
}

pub async fn stream_chat(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let agent = state.catalog.get(&agent)?;
    let request = body.into_turn()?;
    let conversation_id = request.conversation_id.clone();

    let cancel = CancellationToken::new();
    let mut turn = state.orchestrator.stream_turn(agent, request, cancel.clone());

    let sse_stream = async_stream::stream! {
        let _guard = cancel.drop_guard();

        while let Some(item) = turn.next().await {
            match item {
                Ok(TurnEvent::Fragment(text)) => {
                    let data = serde_json::json!({ "text": text });
                    yield Ok::<_, Infallible>(Event::default().event("fragment").data(data.to_string()));
                }
                Ok(TurnEvent::End { content }) => {
                    let data = serde_json::json!({
                        "content": content,
                        "conversation_id": conversation_id,
                    });
                    yield Ok(Event::default().event("done").data(data.to_string()));
                }
                Err(e) => {
                    let err = AppError::from(e);
                    let data = serde_json::json!({ "code": err.code(), "message": err.message() });
                    yield Ok(Event::default().event("error").data(data.to_string()));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
