//! Type-erased completion provider.
//!
//! [`LlmProvider`] returns `impl Future`, which rules out `dyn LlmProvider`.
//! [`ErasedProvider`] is the object-safe mirror with a boxed future, blanket
//! implemented for every provider, and [`BoxLlmProvider`] is the handle the
//! orchestrator holds.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parlor_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

use super::provider::{CompletionStream, LlmProvider};

type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

/// Object-safe mirror of [`LlmProvider`].
pub trait ErasedProvider: Send + Sync {
    fn erased_name(&self) -> &str;

    fn erased_capabilities(&self) -> &ProviderCapabilities;

    fn erased_complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;

    fn erased_stream(&self, request: CompletionRequest) -> CompletionStream;
}

impl<P: LlmProvider> ErasedProvider for P {
    fn erased_name(&self) -> &str {
        self.name()
    }

    fn erased_capabilities(&self) -> &ProviderCapabilities {
        self.capabilities()
    }

    fn erased_complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(self.complete(request))
    }

    fn erased_stream(&self, request: CompletionRequest) -> CompletionStream {
        self.stream(request)
    }
}

/// Provider chosen at runtime (from config) behind one concrete type.
///
/// Clones share the same underlying provider and its HTTP client.
#[derive(Clone)]
pub struct BoxLlmProvider {
    inner: Arc<dyn ErasedProvider>,
}

impl BoxLlmProvider {
    pub fn new<P: LlmProvider + 'static>(provider: P) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.erased_name()
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.inner.erased_capabilities()
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.inner.erased_complete(request).await
    }

    pub fn stream(&self, request: CompletionRequest) -> CompletionStream {
        self.inner.erased_stream(request)
    }
}

impl fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoxLlmProvider").field(&self.name()).finish()
    }
}
