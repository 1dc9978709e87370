//! Turn orchestration.
//!
//! A turn moves through `Resolving -> Invoking -> (ToolRequested <-> Invoking)*
//! -> Completed | Failed`:
//!
//! 1. resolve the persona template from caller parameters
//! 2. for memory-enabled agents, take the conversation's turn permit and
//!    recall the bounded window
//! 3. call the completion service; while it asks for tools, dispatch them and
//!    feed the results back, up to `max_tool_rounds` rounds
//! 4. record the user/assistant exchange in one append and release the permit
//!
//! Every `.await` happens before step 4, so a cancelled or failed turn leaves
//! memory untouched.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use parlor_types::config::RuntimeConfig;
use parlor_types::conversation::ConversationId;
use parlor_types::error::TurnError;
use parlor_types::llm::{CompletionRequest, CompletionResponse, Message, ToolCallRequest, Usage};

use crate::llm::box_provider::BoxLlmProvider;
use crate::memory::{ConversationMemoryStore, TurnPermit};
use crate::tool::ToolDispatcher;

use super::definition::AgentDefinition;

/// Knobs shared by every turn.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    /// Tool-call rounds allowed per turn. One more request for tools fails
    /// the turn with `ToolLoopOverflow`.
    pub max_tool_rounds: u32,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            max_tool_rounds: config.orchestrator.max_tool_rounds,
            max_tokens: config.orchestrator.max_tokens,
            temperature: config.orchestrator.temperature,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

/// One inbound user message.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Without an id the turn is stateless regardless of the agent's policy.
    pub conversation_id: Option<ConversationId>,
    pub message: String,
    pub params: HashMap<String, String>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn conversation(mut self, id: impl Into<ConversationId>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub content: String,
    /// Set when the exchange was recorded in memory.
    pub conversation_id: Option<ConversationId>,
    pub tool_rounds: u32,
    pub recalled: usize,
    pub usage: Usage,
}

/// Turn state prepared before the first completion call.
pub(crate) struct PreparedTurn {
    pub system: String,
    pub messages: Vec<Message>,
    pub recalled: usize,
    /// Conversation to record into, with the permit serializing it.
    pub memory: Option<(ConversationId, TurnPermit)>,
}

/// Drives turns for any agent against one completion provider and one
/// memory store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TurnOrchestrator {
    pub(crate) provider: Arc<BoxLlmProvider>,
    pub(crate) memory: Arc<ConversationMemoryStore>,
    pub(crate) dispatcher: ToolDispatcher,
    pub(crate) settings: OrchestratorSettings,
}

impl TurnOrchestrator {
    pub fn new(
        provider: Arc<BoxLlmProvider>,
        memory: Arc<ConversationMemoryStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            memory,
            dispatcher: ToolDispatcher::new(),
            settings,
        }
    }

    pub fn memory(&self) -> &Arc<ConversationMemoryStore> {
        &self.memory
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run one turn to completion.
    ///
    /// Cancelling `cancel` aborts the in-flight completion call or tool loop
    /// and returns `TurnError::Cancelled` with memory unchanged.
    pub async fn run_turn(
        &self,
        agent: &AgentDefinition,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let span = turn_span(agent, &request);

        async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("turn cancelled");
                    Err(TurnError::Cancelled)
                }
                result = self.execute(agent, request) => result,
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        agent: &AgentDefinition,
        request: TurnRequest,
    ) -> Result<TurnOutcome, TurnError> {
        let mut turn = self.prepare(agent, &request).await?;
        let mut usage = Usage::default();
        let mut tool_rounds = 0u32;

        let final_response = loop {
            let completion = self.completion_request(agent, &turn, false);
            let response = self.complete(&completion, tool_rounds).await?;
            usage.accumulate(&response.usage);

            if !response.requests_tools() {
                break response;
            }
            if tool_rounds >= self.settings.max_tool_rounds {
                warn!(limit = self.settings.max_tool_rounds, "tool loop overflow");
                return Err(TurnError::ToolLoopOverflow {
                    limit: self.settings.max_tool_rounds,
                });
            }
            tool_rounds += 1;
            self.run_tool_round(
                agent,
                &mut turn.messages,
                response.content,
                response.tool_calls,
                tool_rounds,
            )
            .await;
        };

        let conversation_id = self.record(turn.memory, &request.message, &final_response.content);

        info!(
            tool_rounds,
            recalled = turn.recalled,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "turn completed"
        );

        Ok(TurnOutcome {
            content: final_response.content,
            conversation_id,
            tool_rounds,
            recalled: turn.recalled,
            usage,
        })
    }

    /// Resolve the template, then (for memory-enabled agents) wait for the
    /// conversation's permit and recall its window.
    pub(crate) async fn prepare(
        &self,
        agent: &AgentDefinition,
        request: &TurnRequest,
    ) -> Result<PreparedTurn, TurnError> {
        let system = agent.render_prompt(&request.params)?;

        let mut messages = Vec::new();
        let mut memory = None;
        let mut recalled = 0;

        if let (Some(recall_size), Some(id)) = (agent.memory().recall_size(), &request.conversation_id) {
            let permit = self.memory.begin_turn(id).await;
            let window = self.memory.recall(id, recall_size);
            recalled = window.len();
            debug!(conversation_id = %id, recalled, "recalled conversation window");
            messages.extend(window);
            memory = Some((id.clone(), permit));
        }

        messages.push(Message::user(request.message.clone()));

        Ok(PreparedTurn {
            system,
            messages,
            recalled,
            memory,
        })
    }

    pub(crate) fn completion_request(
        &self,
        agent: &AgentDefinition,
        turn: &PreparedTurn,
        stream: bool,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: turn.messages.clone(),
            system: Some(turn.system.clone()),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream,
            tools: agent.tools().definitions(),
        }
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        round: u32,
    ) -> Result<CompletionResponse, TurnError> {
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = false,
            round,
        );

        let response = self.provider.complete(request).instrument(span).await?;
        debug!(
            round,
            stop_reason = %response.stop_reason,
            tool_calls = response.tool_calls.len(),
            "completion received"
        );
        Ok(response)
    }

    /// Dispatch every call of one round and append the assistant tool-call
    /// message plus one tool-role result per call.
    pub(crate) async fn run_tool_round(
        &self,
        agent: &AgentDefinition,
        messages: &mut Vec<Message>,
        content: String,
        calls: Vec<ToolCallRequest>,
        round: u32,
    ) {
        debug!(round, calls = calls.len(), "dispatching tool calls");
        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            let result = self.dispatcher.dispatch(call, agent.tools()).await;
            results.push(Message::tool_result(call.id.clone(), result.to_content()));
        }
        messages.push(Message::assistant_tool_calls(content, calls));
        messages.extend(results);
    }

    /// Append the final exchange and release the permit.
    ///
    /// Must stay synchronous: no `.await` between the final completion and
    /// this append.
    pub(crate) fn record(
        &self,
        memory: Option<(ConversationId, TurnPermit)>,
        user_message: &str,
        assistant_content: &str,
    ) -> Option<ConversationId> {
        let (id, permit) = memory?;
        self.memory.append_exchange(
            &id,
            Message::user(user_message),
            Message::assistant(assistant_content),
        );
        drop(permit);
        Some(id)
    }
}

pub(crate) fn turn_span(agent: &AgentDefinition, request: &TurnRequest) -> Span {
    info_span!(
        "gen_ai.turn",
        gen_ai.agent.name = %agent.name(),
        conversation_id = request.conversation_id.as_ref().map(ConversationId::as_str),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parlor_types::agent::{MemoryPolicy, PlaceholderSpec};
    use parlor_types::error::TemplateError;
    use parlor_types::llm::{LlmError, MessageRole};
    use parlor_types::tool::{DomainError, ParamType};
    use serde_json::{Value, json};

    use crate::llm::scripted::{ScriptedProvider, ScriptedReply};
    use crate::tool::{ToolSpec, tool_fn};

    fn orchestrator(provider: ScriptedProvider) -> TurnOrchestrator {
        TurnOrchestrator::new(
            Arc::new(BoxLlmProvider::new(provider)),
            Arc::new(ConversationMemoryStore::new()),
            OrchestratorSettings::default(),
        )
    }

    fn airline() -> AgentDefinition {
        let lookup = ToolSpec::new(
            "get_booking_details",
            "Look up a booking",
            tool_fn(|args| async move {
                let number = args.str("bookingNumber")?;
                if number == "ABC123" {
                    Ok(json!({
                        "bookingNumber": "ABC123",
                        "customer": "John Smith",
                        "status": "CONFIRMED"
                    }))
                } else {
                    Err(DomainError::not_found(format!("Booking {number} not found")))
                }
            }),
        )
        .required("bookingNumber", ParamType::String, "Booking reference")
        .optional("name", ParamType::String, "Customer name");

        AgentDefinition::builder("airline")
            .system_prompt("You are a customer support agent of an airline.")
            .tool(lookup)
            .memory(MemoryPolicy::per_conversation())
            .build()
            .unwrap()
    }

    fn assistant() -> AgentDefinition {
        AgentDefinition::builder("assistant")
            .system_prompt("You are a friendly chat bot that answers question in the voice of a {voice}")
            .placeholder(PlaceholderSpec::with_default("voice", "Normal man"))
            .memory(MemoryPolicy::per_conversation())
            .build()
            .unwrap()
    }

    fn tool_message(request: &CompletionRequest) -> &Message {
        request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Tool)
            .expect("tool message")
    }

    #[tokio::test]
    async fn test_booking_lookup_scenario() {
        let provider = ScriptedProvider::new(vec![
            ScriptedReply::tool_call(
                "call_1",
                "get_booking_details",
                json!({"bookingNumber": "ABC123", "name": "John Smith"}),
            ),
            ScriptedReply::text("Your booking ABC123 is CONFIRMED."),
        ]);
        let orch = orchestrator(provider.clone());
        let agent = airline();

        let outcome = orch
            .run_turn(
                &agent,
                TurnRequest::new("What's my booking ABC123 under John Smith?").conversation("u1"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.content.contains("CONFIRMED"));
        assert_eq!(outcome.tool_rounds, 1);
        assert_eq!(orch.memory().len(&"u1".into()), 2);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        let result = tool_message(&requests[1]);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
        assert!(result.content.contains("CONFIRMED"));
    }

    #[tokio::test]
    async fn test_second_turn_recalls_prior_exchange() {
        let provider = ScriptedProvider::new(vec![
            ScriptedReply::text("Your booking ABC123 is CONFIRMED."),
            ScriptedReply::text("Which booking should I cancel?"),
        ]);
        let orch = orchestrator(provider.clone());
        let agent = airline();
        let cancel = CancellationToken::new();

        orch.run_turn(
            &agent,
            TurnRequest::new("What's my booking ABC123 under John Smith?").conversation("u1"),
            &cancel,
        )
        .await
        .unwrap();
        let second = orch
            .run_turn(&agent, TurnRequest::new("Cancel it").conversation("u1"), &cancel)
            .await
            .unwrap();

        assert_eq!(second.recalled, 2);
        let sent = &provider.requests()[1].messages;
        let contents: Vec<&str> = sent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "What's my booking ABC123 under John Smith?",
                "Your booking ABC123 is CONFIRMED.",
                "Cancel it",
            ]
        );
        assert_eq!(orch.memory().len(&"u1".into()), 4);
    }

    #[tokio::test]
    async fn test_invalid_argument_is_recoverable() {
        let provider = ScriptedProvider::new(vec![
            ScriptedReply::tool_call("call_1", "get_booking_details", json!({"bookingNumber": ""})),
            ScriptedReply::text("Could you give me your booking number?"),
        ]);
        let orch = orchestrator(provider.clone());

        let outcome = orch
            .run_turn(
                &airline(),
                TurnRequest::new("Show my booking").conversation("u2"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.content, "Could you give me your booking number?");
        let requests = provider.requests();
        let result = tool_message(&requests[1]);
        let payload: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(payload["error"]["kind"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_voice_default_substituted() {
        let provider = ScriptedProvider::new(vec![ScriptedReply::text("Hello there.")]);
        let orch = orchestrator(provider.clone());

        orch.run_turn(&assistant(), TurnRequest::new("Hi"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            provider.requests()[0].system.as_deref(),
            Some("You are a friendly chat bot that answers question in the voice of a Normal man")
        );
    }

    #[tokio::test]
    async fn test_missing_required_placeholder_fails_without_calling_provider() {
        let provider = ScriptedProvider::new(vec![ScriptedReply::text("unused")]);
        let orch = orchestrator(provider.clone());
        let agent = AgentDefinition::builder("hr")
            .system_prompt("You assist {employee}")
            .memory(MemoryPolicy::per_conversation())
            .build()
            .unwrap();

        let err = orch
            .run_turn(&agent, TurnRequest::new("hi").conversation("u3"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TurnError::Template(TemplateError::MissingPlaceholder(ref name)) if name == "employee"
        ));
        assert!(provider.requests().is_empty());
        assert_eq!(orch.memory().len(&"u3".into()), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_memory_untouched() {
        let provider = ScriptedProvider::new(vec![ScriptedReply::Fail("connection refused".into())]);
        let orch = orchestrator(provider);

        let err = orch
            .run_turn(&airline(), TurnRequest::new("hi").conversation("u4"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Transport(LlmError::Provider { .. })));
        assert_eq!(err.category(), "transport_error");
        assert_eq!(orch.memory().len(&"u4".into()), 0);
    }

    #[tokio::test]
    async fn test_tool_loop_overflow() {
        let provider = ScriptedProvider::from_fn(|_| {
            ScriptedReply::tool_call("again", "get_booking_details", json!({"bookingNumber": "ABC123"}))
        });
        let orch = TurnOrchestrator::new(
            Arc::new(BoxLlmProvider::new(provider.clone())),
            Arc::new(ConversationMemoryStore::new()),
            OrchestratorSettings {
                max_tool_rounds: 2,
                ..OrchestratorSettings::default()
            },
        );

        let err = orch
            .run_turn(&airline(), TurnRequest::new("loop").conversation("u5"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::ToolLoopOverflow { limit: 2 }));
        // initial call + two tool rounds
        assert_eq!(provider.requests().len(), 3);
        assert_eq!(orch.memory().len(&"u5".into()), 0);
    }

    #[tokio::test]
    async fn test_cancellation_leaves_memory_untouched() {
        let provider = ScriptedProvider::new(vec![ScriptedReply::Pending]);
        let orch = orchestrator(provider);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orch
            .run_turn(&airline(), TurnRequest::new("hi").conversation("u6"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Cancelled));
        assert_eq!(orch.memory().len(&"u6".into()), 0);

        // The permit was released with the cancelled future.
        let permit = tokio::time::timeout(
            Duration::from_millis(100),
            orch.memory().begin_turn(&"u6".into()),
        )
        .await;
        assert!(permit.is_ok());
    }

    #[tokio::test]
    async fn test_no_conversation_id_is_stateless() {
        let provider = ScriptedProvider::new(vec![ScriptedReply::text("a"), ScriptedReply::text("b")]);
        let orch = orchestrator(provider.clone());
        let agent = assistant();
        let cancel = CancellationToken::new();

        let first = orch.run_turn(&agent, TurnRequest::new("one"), &cancel).await.unwrap();
        orch.run_turn(&agent, TurnRequest::new("two"), &cancel).await.unwrap();

        assert!(first.conversation_id.is_none());
        assert_eq!(provider.requests()[1].messages.len(), 1);
        assert_eq!(orch.memory().conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_policy_none_ignores_conversation_id() {
        let provider = ScriptedProvider::new(vec![ScriptedReply::text("ok")]);
        let orch = orchestrator(provider);
        let agent = AgentDefinition::builder("oneshot")
            .system_prompt("Answer briefly.")
            .build()
            .unwrap();

        let outcome = orch
            .run_turn(&agent, TurnRequest::new("hi").conversation("u7"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.conversation_id.is_none());
        assert_eq!(orch.memory().len(&"u7".into()), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_same_conversation_serialize() {
        let provider = ScriptedProvider::from_fn(|req| {
            let last = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            ScriptedReply::text(format!("re: {last}"))
        })
        .with_delay(Duration::from_millis(5));
        let orch = orchestrator(provider);
        let agent = Arc::new(airline());

        let mut handles = Vec::new();
        for i in 0..8 {
            let orch = orch.clone();
            let agent = agent.clone();
            handles.push(tokio::spawn(async move {
                orch.run_turn(
                    &agent,
                    TurnRequest::new(format!("msg {i}")).conversation("shared"),
                    &CancellationToken::new(),
                )
                .await
                .unwrap()
            }));
        }
        let mut recalled = Vec::new();
        for h in handles {
            recalled.push(h.await.unwrap().recalled);
        }

        let log = orch.memory().recall(&"shared".into(), 100);
        assert_eq!(log.len(), 16);
        for pair in log.messages().chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
            assert_eq!(pair[1].content, format!("re: {}", pair[0].content));
        }

        // Each turn saw every earlier exchange exactly once.
        recalled.sort_unstable();
        assert_eq!(recalled, (0..8).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_conversations_stay_isolated() {
        let provider = ScriptedProvider::from_fn(|req| {
            let last = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            ScriptedReply::text(format!("re: {last}"))
        });
        let orch = orchestrator(provider);
        let agent = Arc::new(airline());

        let mut handles = Vec::new();
        for conv in ["a", "b"] {
            for i in 0..5 {
                let orch = orch.clone();
                let agent = agent.clone();
                handles.push(tokio::spawn(async move {
                    orch.run_turn(
                        &agent,
                        TurnRequest::new(format!("{conv}-{i}")).conversation(conv),
                        &CancellationToken::new(),
                    )
                    .await
                    .unwrap()
                }));
            }
        }
        for h in handles {
            h.await.unwrap();
        }

        for conv in ["a", "b"] {
            let log = orch.memory().recall(&conv.into(), 100);
            assert_eq!(log.len(), 10);
            assert!(log.iter().all(|m| m.content.contains(&format!("{conv}-"))));
        }
    }
}
