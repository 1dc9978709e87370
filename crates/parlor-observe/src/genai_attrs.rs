//! OpenTelemetry GenAI attribute names used by Parlor spans.
//!
//! `tracing` field names must be literal at the macro call site, so the
//! core writes them out by hand; these constants are the reference list.
//! The span names also select which spans reach the OpenTelemetry exporter.

// --- Span names ---

/// One user turn, from template resolution to the memory append.
pub const SPAN_TURN: &str = "gen_ai.turn";

/// One call to the completion service.
pub const SPAN_COMPLETE: &str = "gen_ai.complete";

/// One dispatched tool call.
pub const SPAN_TOOL: &str = "gen_ai.tool";

/// Spans exported through OpenTelemetry; everything else stays in the log.
pub const EXPORTED_SPANS: [&str; 3] = [SPAN_TURN, SPAN_COMPLETE, SPAN_TOOL];

// --- Request attributes ---

/// Provider name (e.g. "openai").
pub const GEN_AI_SYSTEM: &str = "gen_ai.system";

pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// Whether the completion was requested as a stream.
pub const GEN_AI_REQUEST_STREAM: &str = "gen_ai.request.stream";

// --- Response attributes ---

pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// Finish reason reported by the provider (e.g. "end_turn", "tool_use").
pub const GEN_AI_RESPONSE_FINISH_REASON: &str = "gen_ai.response.finish_reason";

// --- Agent and tool attributes ---

/// Persona name (e.g. "airline").
pub const GEN_AI_AGENT_NAME: &str = "gen_ai.agent.name";

pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";

/// Provider-assigned id of the tool call.
pub const GEN_AI_TOOL_CALL_ID: &str = "gen_ai.tool.call.id";

/// Caller-supplied conversation id; absent for stateless turns.
pub const CONVERSATION_ID: &str = "conversation_id";
