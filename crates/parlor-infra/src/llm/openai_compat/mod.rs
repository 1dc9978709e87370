//! OpenAI-compatible completion provider.
//!
//! A single [`OpenAiCompatibleProvider`] talks to any server exposing the
//! `/chat/completions` endpoint (OpenAI, Azure-style proxies, Ollama, vLLM)
//! through a configurable base URL. Function tools are sent in the request
//! and tool calls are read back from both plain and SSE responses.
//!
//! The API key is wrapped in [`SecretString`] and is only exposed when
//! building the `Authorization` header.

pub mod streaming;
pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use parlor_core::llm::provider::{CompletionStream, LlmProvider};
use parlor_types::config::ProviderSettings;
use parlor_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, Usage,
};

use self::streaming::create_chat_stream;
use self::types::{ChatRequest, ChatResponse, WireToolCall, stop_reason};

/// Provider for any OpenAI-compatible chat completions API.
///
/// Does NOT derive Debug: the struct holds the API key.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    provider_name: String,
    capabilities: ProviderCapabilities,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from settings. `api_key` may be `None` for local
    /// servers that do not authenticate.
    pub fn new(settings: &ProviderSettings, api_key: Option<SecretString>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            provider_name: settings.name.clone(),
            capabilities: ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                max_context_tokens: 128_000,
                max_output_tokens: 16_384,
            },
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatRequest::from_completion(request, false);

        let mut builder = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;
        let response = error_for_status(response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        into_completion(chat, &request.model)
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> CompletionStream {
        let body = ChatRequest::from_completion(&request, true);
        create_chat_stream(self.client.clone(), self.url(), self.api_key.clone(), body)
    }
}

fn into_completion(chat: ChatResponse, requested_model: &str) -> Result<CompletionResponse, LlmError> {
    let choice = chat
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Deserialization("response has no choices".to_string()))?;

    let model = if chat.model.is_empty() {
        requested_model.to_string()
    } else {
        chat.model
    };

    Ok(CompletionResponse {
        id: chat.id,
        content: choice.message.content.unwrap_or_default(),
        model,
        stop_reason: stop_reason(choice.finish_reason.as_deref()),
        usage: chat.usage.map(Usage::from).unwrap_or_default(),
        tool_calls: choice
            .message
            .tool_calls
            .into_iter()
            .map(WireToolCall::into_request)
            .collect(),
    })
}

/// Map non-2xx responses to [`LlmError`].
pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_ms = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs * 1000);
    let error_body = response.text().await.unwrap_or_default();

    Err(match status.as_u16() {
        401 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited { retry_after_ms },
        400 => LlmError::InvalidRequest(error_body),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {error_body}"),
        },
    })
}
