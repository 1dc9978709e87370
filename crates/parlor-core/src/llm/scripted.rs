//! Replaying completion provider for tests.
//!
//! `ScriptedProvider` answers from a queue of canned replies and records every
//! request it receives. When the queue is empty it falls back to an optional
//! responder closure, which lets concurrency tests drive many turns without
//! scripting each one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parlor_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason,
    StreamEvent, ToolCallRequest, Usage,
};

use super::provider::{CompletionStream, LlmProvider};

/// One canned completion outcome.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    ToolCalls(Vec<ToolCallRequest>),
    /// Text streamed ahead of tool calls in the same round.
    TextThenToolCalls(String, Vec<ToolCallRequest>),
    Fail(String),
    /// Never resolves; used to exercise cancellation.
    Pending,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }

    /// A single tool call with the given id, name and JSON arguments.
    pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> Self {
        ScriptedReply::ToolCalls(vec![ToolCallRequest {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }])
    }

    /// `text`, then a single tool call, in one round.
    pub fn text_then_tool_call(text: &str, id: &str, name: &str, arguments: serde_json::Value) -> Self {
        match Self::tool_call(id, name, arguments) {
            ScriptedReply::ToolCalls(calls) => ScriptedReply::TextThenToolCalls(text.to_string(), calls),
            other => other,
        }
    }
}

type Responder = dyn Fn(&CompletionRequest) -> ScriptedReply + Send + Sync;

struct Inner {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    responder: Option<Box<Responder>>,
    delay: Option<Duration>,
    capabilities: ProviderCapabilities,
}

/// Test double for the completion service. Clones share state.
#[derive(Clone)]
pub struct ScriptedProvider {
    inner: Arc<Inner>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self::build(replies, None, None)
    }

    /// Answer every request through `responder`.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> ScriptedReply + Send + Sync + 'static,
    {
        Self::build(Vec::new(), Some(Box::new(responder)), None)
    }

    /// Sleep this long before answering each `complete` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.delay = Some(delay);
        }
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    fn build(
        replies: Vec<ScriptedReply>,
        responder: Option<Box<Responder>>,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                responder,
                delay,
                capabilities: ProviderCapabilities {
                    streaming: true,
                    tool_calling: true,
                    max_context_tokens: 128_000,
                    max_output_tokens: 4_096,
                },
            }),
        }
    }

    fn next_reply(&self, request: &CompletionRequest) -> ScriptedReply {
        self.inner.requests.lock().unwrap().push(request.clone());
        if let Some(reply) = self.inner.replies.lock().unwrap().pop_front() {
            return reply;
        }
        match &self.inner.responder {
            Some(responder) => responder(request),
            None => ScriptedReply::Fail("script exhausted".to_string()),
        }
    }

    fn usage() -> Usage {
        Usage {
            input_tokens: 10,
            output_tokens: 5,
        }
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.inner.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let reply = self.next_reply(request);
        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }

        let (content, tool_calls, stop_reason) = match reply {
            ScriptedReply::Text(text) => (text, Vec::new(), StopReason::EndTurn),
            ScriptedReply::ToolCalls(calls) => (String::new(), calls, StopReason::ToolUse),
            ScriptedReply::TextThenToolCalls(text, calls) => (text, calls, StopReason::ToolUse),
            ScriptedReply::Fail(message) => return Err(LlmError::Provider { message }),
            ScriptedReply::Pending => std::future::pending().await,
        };

        Ok(CompletionResponse {
            id: "scripted".to_string(),
            content,
            model: request.model.clone(),
            stop_reason,
            usage: Self::usage(),
            tool_calls,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> CompletionStream {
        let reply = self.next_reply(&request);
        let usage = Self::usage();

        Box::pin(async_stream::stream! {
            yield Ok(StreamEvent::Connected);
            match reply {
                ScriptedReply::Text(text) => {
                    for piece in text.split_inclusive(' ') {
                        yield Ok(StreamEvent::TextDelta { text: piece.to_string() });
                    }
                    yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn });
                }
                ScriptedReply::ToolCalls(calls) => {
                    for call in calls {
                        yield Ok(StreamEvent::ToolUseComplete {
                            id: call.id,
                            name: call.name,
                            input: call.arguments,
                        });
                    }
                    yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::ToolUse });
                }
                ScriptedReply::TextThenToolCalls(text, calls) => {
                    for piece in text.split_inclusive(' ') {
                        yield Ok(StreamEvent::TextDelta { text: piece.to_string() });
                    }
                    for call in calls {
                        yield Ok(StreamEvent::ToolUseComplete {
                            id: call.id,
                            name: call.name,
                            input: call.arguments,
                        });
                    }
                    yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::ToolUse });
                }
                ScriptedReply::Fail(message) => {
                    yield Err(LlmError::Stream(message));
                    return;
                }
                ScriptedReply::Pending => {
                    std::future::pending::<()>().await;
                }
            }
            yield Ok(StreamEvent::Usage(usage));
            yield Ok(StreamEvent::Done);
        })
    }
}
