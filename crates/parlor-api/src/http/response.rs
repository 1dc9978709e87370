//! Envelope response format for JSON API responses.
//!
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 },
//!   "errors": []
//! }
//! ```

use std::collections::HashMap;
use std::time::Instant;

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Envelope around every JSON body the API returns.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// The payload. `null` on errors.
    pub data: Option<T>,

    /// Per-request metadata.
    pub meta: ApiMeta,

    /// Error list, empty on success.
    pub errors: Vec<ApiErrorDetail>,

    /// Related resource links, omitted when empty.
    #[serde(rename = "_links", skip_serializing_if = "HashMap::is_empty")]
    pub links: HashMap<String, String>,
}

/// Metadata attached to every envelope.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unique id for correlating the response with logs.
    pub request_id: String,
    /// RFC 3339 time the response was built.
    pub timestamp: String,
    /// Time spent in the handler, in milliseconds.
    pub response_time_ms: u64,
}

impl ApiMeta {
    fn new(response_time_ms: u64) -> Self {
        Self {
            request_id: uuid::Uuid::now_v7().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }
}

/// One entry in the envelope's error list.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable code, e.g. `AGENT_NOT_FOUND`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success envelope; `started` is when the handler began.
    pub fn success(data: T, started: Instant) -> Self {
        Self {
            data: Some(data),
            meta: ApiMeta::new(started.elapsed().as_millis() as u64),
            errors: Vec::new(),
            links: HashMap::new(),
        }
    }

    pub fn with_link(mut self, rel: &str, href: &str) -> Self {
        self.links.insert(rel.to_string(), href.to_string());
        self
    }
}

impl ApiResponse<()> {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            data: None,
            meta: ApiMeta::new(0),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
            }],
            links: HashMap::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
