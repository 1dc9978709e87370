//! The completion-service port.

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use parlor_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent,
};

/// Events from one streamed completion, ending with [`StreamEvent::Done`].
///
/// Boxed and `'static` so it can outlive the provider borrow and cross the
/// type-erased [`BoxLlmProvider`](super::box_provider::BoxLlmProvider).
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// A completion service: turns an ordered message sequence plus the bound
/// tool definitions into either final text or tool-call requests
/// (see [`CompletionResponse::requests_tools`]).
///
/// The core never retries a failed call. Implementations that want retries
/// do them internally and surface only the final error.
///
/// [`CompletionResponse::requests_tools`]: parlor_types::llm::CompletionResponse::requests_tools
pub trait LlmProvider: Send + Sync {
    /// Short provider name recorded on spans (e.g. "openai").
    fn name(&self) -> &str;

    fn capabilities(&self) -> &ProviderCapabilities;

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Each call opens a fresh stream, so a turn can be restarted by calling
    /// it again with the same request.
    fn stream(&self, request: CompletionRequest) -> CompletionStream;
}
