//! Agent listing.
//!
//! - GET /api/v1/agents          - every persona
//! - GET /api/v1/agents/{agent}  - one persona

use std::time::Instant;

use axum::extract::{Path, State};

use parlor_types::agent::AgentSummary;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub async fn list_agents(State(state): State<AppState>) -> ApiResponse<Vec<AgentSummary>> {
    let start = Instant::now();
    ApiResponse::success(state.catalog.summaries(), start).with_link("self", "/api/v1/agents")
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<ApiResponse<AgentSummary>, AppError> {
    let start = Instant::now();
    let agent = state.catalog.get(&name)?;
    Ok(ApiResponse::success(agent.summary(), start)
        .with_link("chat", &format!("/api/v1/agents/{name}/chat")))
}
