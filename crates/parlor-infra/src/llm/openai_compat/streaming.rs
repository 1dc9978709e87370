//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Tool call arguments arrive as partial JSON fragments across multiple
//! streaming chunks (keyed by tool call index). These are accumulated and
//! emitted as [`StreamEvent::ToolUseComplete`] when a finish_reason arrives
//! or the stream ends.

use std::collections::BTreeMap;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use parlor_core::llm::provider::CompletionStream;
use parlor_types::llm::{LlmError, StreamEvent, Usage};

use super::error_for_status;
use super::types::{ChatChunk, ChatRequest, parse_arguments, stop_reason};

/// Accumulates partial JSON fragments for a tool call during streaming.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    json_buffer: String,
}

/// Per-stream state: pending tool calls, keyed (and ordered) by index.
#[derive(Debug, Default)]
pub(crate) struct ChunkAssembler {
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
}

impl ChunkAssembler {
    /// Events produced by one chunk, in emission order.
    pub(crate) fn push(&mut self, chunk: ChatChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                events.push(StreamEvent::TextDelta { text });
            }

            for tc in choice.delta.tool_calls {
                let acc = self.tool_calls.entry(tc.index).or_default();
                if let Some(id) = tc.id.filter(|id| !id.is_empty()) {
                    acc.id = id;
                }
                if let Some(function) = tc.function {
                    if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                        acc.name = name;
                    }
                    if let Some(fragment) = function.arguments {
                        acc.json_buffer.push_str(&fragment);
                    }
                }
            }

            if let Some(reason) = choice.finish_reason {
                events.extend(self.drain_tool_calls());
                events.push(StreamEvent::MessageDelta {
                    stop_reason: stop_reason(Some(&reason)),
                });
            }
        }

        // The final chunk carries usage with an empty choices array.
        if let Some(usage) = chunk.usage {
            events.push(StreamEvent::Usage(Usage::from(usage)));
        }

        events
    }

    /// Flush tool calls the provider never closed with a finish_reason.
    pub(crate) fn finish(&mut self) -> Vec<StreamEvent> {
        self.drain_tool_calls()
    }

    fn drain_tool_calls(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.tool_calls)
            .into_values()
            .map(|acc| StreamEvent::ToolUseComplete {
                input: parse_arguments(&acc.json_buffer),
                id: acc.id,
                name: acc.name,
            })
            .collect()
    }
}

/// Open a streaming chat completion and map it to [`StreamEvent`]s.
///
/// The returned stream emits events in this order:
/// 1. `Connected` -- once the HTTP response is accepted
/// 2. `TextDelta` -- for each text content chunk
/// 3. `ToolUseComplete` -- when tool call JSON is fully assembled
/// 4. `MessageDelta` -- with the stop reason when finish_reason appears
/// 5. `Usage` -- token usage (requested via `stream_options.include_usage`)
/// 6. `Done` -- after `[DONE]` or the end of the body
pub fn create_chat_stream(
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
    body: ChatRequest,
) -> CompletionStream {
    Box::pin(async_stream::stream! {
        let mut builder = client.post(&url).json(&body);
        if let Some(key) = &api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                yield Err(LlmError::Provider { message: format!("HTTP request failed: {e}") });
                return;
            }
        };
        let response = match error_for_status(response).await {
            Ok(response) => response,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        yield Ok(StreamEvent::Connected);

        let mut assembler = ChunkAssembler::default();
        let mut sse = response.bytes_stream().eventsource();

        while let Some(event) = sse.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(LlmError::Stream(e.to_string()));
                    return;
                }
            };
            if event.data.trim() == "[DONE]" {
                break;
            }
            if event.data.trim().is_empty() {
                continue;
            }
            let chunk: ChatChunk = match serde_json::from_str(&event.data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LlmError::Deserialization(format!("invalid stream chunk: {e}")));
                    return;
                }
            };
            for ev in assembler.push(chunk) {
                yield Ok(ev);
            }
        }

        for ev in assembler.finish() {
            yield Ok(ev);
        }
        yield Ok(StreamEvent::Done);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::llm::StopReason;
    use serde_json::json;

    fn chunk(value: serde_json::Value) -> ChatChunk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_deltas_pass_through() {
        let mut asm = ChunkAssembler::default();
        let events = asm.push(chunk(json!({
            "choices": [{"index": 0, "delta": {"content": "Hello"}, "finish_reason": null}]
        })));
        assert!(matches!(&events[..], [StreamEvent::TextDelta { text }] if text == "Hello"));
    }

    #[test]
    fn tool_call_fragments_are_assembled() {
        let mut asm = ChunkAssembler::default();
        asm.push(chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "id": "call_1", "type": "function",
             "function": {"name": "get_booking_details", "arguments": "{\"booking"}}
        ]}}]})));
        asm.push(chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "Number\":\"ABC123\"}"}}
        ]}}]})));
        let events = asm.push(chunk(json!({
            "choices": [{"delta": {}, "finish_reason": "tool_calls"}]
        })));

        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::ToolUseComplete { id, name, input } => {
                assert_eq!(id, "call_1");
                assert_eq!(name, "get_booking_details");
                assert_eq!(input, &json!({"bookingNumber": "ABC123"}));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            events[1],
            StreamEvent::MessageDelta { stop_reason: StopReason::ToolUse }
        ));
    }

    #[test]
    fn parallel_tool_calls_keep_index_order() {
        let mut asm = ChunkAssembler::default();
        asm.push(chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"index": 1, "id": "b", "function": {"name": "list_events", "arguments": "{}"}},
            {"index": 0, "id": "a", "function": {"name": "get_current_date", "arguments": ""}}
        ]}}]})));
        let events = asm.finish();
        let ids: Vec<&str> = events
            .iter()
            .map(|e| match e {
                StreamEvent::ToolUseComplete { id, .. } => id.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn usage_chunk_maps_tokens() {
        let mut asm = ChunkAssembler::default();
        let events = asm.push(chunk(json!({
            "choices": [],
            "usage": {"prompt_tokens": 21, "completion_tokens": 9}
        })));
        assert!(matches!(
            events[0],
            StreamEvent::Usage(Usage { input_tokens: 21, output_tokens: 9 })
        ));
    }
}
