//! Plain-text assistant endpoints.
//!
//! - GET /ai?prompt=...                              - stateless
//! - GET /{conversation_id}/ai?prompt=...&voice=...  - remembers the last
//!   100 messages of the conversation
//!
//! Both answer with the bare completion text.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use parlor_core::agent::TurnRequest;
use parlor_infra::agents::assistant;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    pub prompt: String,
    /// Falls back to the persona default ("Normal man") when absent.
    pub voice: Option<String>,
}

pub async fn ask(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> Result<String, AppError> {
    tracing::info!(prompt = %query.prompt, "legacy prompt");
    run(&state, None, query).await
}

pub async fn ask_in_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<PromptQuery>,
) -> Result<String, AppError> {
    tracing::info!(
        conversation_id = %conversation_id,
        voice = query.voice.as_deref().unwrap_or(assistant::DEFAULT_VOICE),
        prompt = %query.prompt,
        "legacy prompt"
    );
    run(&state, Some(conversation_id), query).await
}

async fn run(state: &AppState, conversation_id: Option<String>, query: PromptQuery) -> Result<String, AppError> {
    let agent = state.catalog.get(assistant::AGENT_NAME)?;

    let mut request = TurnRequest::new(query.prompt);
    if let Some(id) = conversation_id {
        request = request.conversation(id);
    }
    if let Some(voice) = query.voice {
        request = request.param(assistant::VOICE_PLACEHOLDER, voice);
    }

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let outcome = state.orchestrator.run_turn(&agent, request, &cancel).await?;
    Ok(outcome.content)
}
