//! Streaming turns.
//!
//! `stream_turn` runs the same state machine as `run_turn` but drives the
//! provider's streaming endpoint. The stream ends with exactly one
//! `TurnEvent::End`, or with an error.
//!
//! A round's text is held back until the round finishes without tool calls,
//! so the fragments always concatenate to the `End` content. Text the model
//! writes alongside a tool call stays inside the tool round.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use parlor_types::error::TurnError;
use parlor_types::llm::{StreamEvent, ToolCallRequest, Usage};

use super::definition::AgentDefinition;
use super::orchestrator::{TurnOrchestrator, TurnRequest, turn_span};

/// One item of a streamed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// A piece of assistant text.
    Fragment(String),
    /// End of turn. `content` is the final answer as recorded in memory.
    End { content: String },
}

pub type TurnStream = Pin<Box<dyn Stream<Item = Result<TurnEvent, TurnError>> + Send + 'static>>;

/// Outcome of draining one provider stream.
struct RoundResult {
    text: String,
    /// Deltas in arrival order, released only if the round is final.
    pieces: Vec<String>,
    calls: Vec<ToolCallRequest>,
}

impl TurnOrchestrator {
    /// Start a streamed turn.
    ///
    /// Nothing happens until the stream is polled. Dropping the stream or
    /// cancelling `cancel` aborts the turn without touching memory; each call
    /// starts a fresh turn.
    pub fn stream_turn(
        &self,
        agent: Arc<AgentDefinition>,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> TurnStream {
        let this = self.clone();
        let span = turn_span(&agent, &request);

        Box::pin(async_stream::stream! {
            let mut turn = match this.prepare(&agent, &request).instrument(span.clone()).await {
                Ok(turn) => turn,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let mut usage = Usage::default();
            let mut tool_rounds = 0u32;

            let content = loop {
                let completion = this.completion_request(&agent, &turn, true);
                let complete_span = info_span!(
                    parent: &span,
                    "gen_ai.complete",
                    gen_ai.system = this.provider.name(),
                    gen_ai.request.model = %completion.model,
                    gen_ai.request.stream = true,
                    round = tool_rounds,
                );
                let mut events = this.provider.stream(completion);
                let mut round = RoundResult { text: String::new(), pieces: Vec::new(), calls: Vec::new() };

                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        event = events.next().instrument(complete_span.clone()) => Some(event),
                    };
                    let Some(event) = next else {
                        warn!(parent: &span, "streamed turn cancelled");
                        yield Err(TurnError::Cancelled);
                        return;
                    };
                    match event {
                        None | Some(Ok(StreamEvent::Done)) => break,
                        Some(Ok(StreamEvent::TextDelta { text })) => {
                            round.text.push_str(&text);
                            round.pieces.push(text);
                        }
                        Some(Ok(StreamEvent::ToolUseComplete { id, name, input })) => {
                            round.calls.push(ToolCallRequest { id, name, arguments: input });
                        }
                        Some(Ok(StreamEvent::Usage(u))) => usage.accumulate(&u),
                        Some(Ok(StreamEvent::Connected | StreamEvent::MessageDelta { .. })) => {}
                        Some(Err(e)) => {
                            warn!(parent: &span, error = %e, "completion stream failed");
                            yield Err(TurnError::Transport(e));
                            return;
                        }
                    }
                }

                if round.calls.is_empty() {
                    for piece in round.pieces {
                        yield Ok(TurnEvent::Fragment(piece));
                    }
                    break round.text;
                }
                if tool_rounds >= this.settings.max_tool_rounds {
                    warn!(parent: &span, limit = this.settings.max_tool_rounds, "tool loop overflow");
                    yield Err(TurnError::ToolLoopOverflow { limit: this.settings.max_tool_rounds });
                    return;
                }
                tool_rounds += 1;

                let tool_round = this.run_tool_round(
                    &agent,
                    &mut turn.messages,
                    round.text,
                    round.calls,
                    tool_rounds,
                );
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tool_round.instrument(span.clone()) => false,
                };
                if cancelled {
                    warn!(parent: &span, "streamed turn cancelled during tool round");
                    yield Err(TurnError::Cancelled);
                    return;
                }
            };

            this.record(turn.memory.take(), &request.message, &content);
            info!(
                parent: &span,
                tool_rounds,
                recalled = turn.recalled,
                output_tokens = usage.output_tokens,
                "streamed turn completed"
            );

            yield Ok(TurnEvent::End { content });
        })
    }
}
