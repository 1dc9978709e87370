//! The shipped personas and the catalog that holds them.
//!
//! Each persona module exposes an `agent(..)` constructor over its simulated
//! backend plus the backend type itself, so tests and embedders can seed
//! their own data.

pub mod airline;
pub mod assistant;
pub mod calendar;
pub mod hr;

use std::sync::Arc;

use chrono::NaiveDate;

use parlor_core::agent::AgentCatalog;
use parlor_types::config::RuntimeConfig;
use parlor_types::error::AgentBuildError;

use self::airline::BookingDesk;
use self::calendar::EventBook;
use self::hr::HrDirectory;

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Build the catalog of every shipped persona with freshly seeded backends.
pub fn build_catalog(config: &RuntimeConfig) -> Result<AgentCatalog, AgentBuildError> {
    build_catalog_with_clock(config, local_today)
}

/// Same as [`build_catalog`] with the date-aware backends reading `clock`.
pub fn build_catalog_with_clock(
    config: &RuntimeConfig,
    clock: fn() -> NaiveDate,
) -> Result<AgentCatalog, AgentBuildError> {
    let recall = config.memory.default_recall_size;

    let mut catalog = AgentCatalog::new();
    catalog.register(assistant::agent(recall)?)?;
    catalog.register(airline::agent(Arc::new(BookingDesk::seeded_with_clock(clock)), recall)?)?;
    catalog.register(hr::agent(Arc::new(HrDirectory::seeded()), recall)?)?;
    catalog.register(calendar::agent(Arc::new(EventBook::with_clock(clock)), recall)?)?;

    tracing::info!(agents = catalog.len(), recall, "agent catalog ready");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    use parlor_core::agent::{OrchestratorSettings, TurnOrchestrator, TurnRequest};
    use parlor_core::llm::box_provider::BoxLlmProvider;
    use parlor_core::llm::scripted::{ScriptedProvider, ScriptedReply};
    use parlor_core::memory::ConversationMemoryStore;
    use parlor_types::conversation::ConversationId;
    use parlor_types::llm::MessageRole;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn orchestrator(provider: ScriptedProvider) -> TurnOrchestrator {
        TurnOrchestrator::new(
            Arc::new(BoxLlmProvider::new(provider)),
            Arc::new(ConversationMemoryStore::new()),
            OrchestratorSettings::default(),
        )
    }

    #[test]
    fn catalog_holds_all_personas() {
        let catalog = build_catalog_with_clock(&RuntimeConfig::default(), today).unwrap();
        assert_eq!(catalog.names(), vec!["assistant", "airline", "hr", "calendar"]);
        assert!(catalog.get("weather").is_err());
    }

    #[tokio::test]
    async fn booking_lookup_end_to_end() {
        let catalog = build_catalog_with_clock(&RuntimeConfig::default(), today).unwrap();
        let airline = catalog.get("airline").unwrap();

        let provider = ScriptedProvider::new(vec![
            ScriptedReply::tool_call(
                "call_1",
                "get_booking_details",
                json!({"bookingNumber": "ABC123", "firstName": "John", "lastName": "Smith"}),
            ),
            ScriptedReply::text("Your booking ABC123 is CONFIRMED for 2026-10-29."),
        ]);
        let orchestrator = orchestrator(provider.clone());

        let outcome = orchestrator
            .run_turn(
                &airline,
                TurnRequest::new("What's my booking ABC123 under John Smith?").conversation("u1"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.content.contains("CONFIRMED"));
        assert_eq!(outcome.tool_rounds, 1);
        assert_eq!(orchestrator.memory().len(&ConversationId::from("u1")), 2);

        let second = &provider.requests()[1];
        assert!(second.system.as_deref().unwrap().contains("Today is 2026-10-19."));
        let tool_message = second.messages.last().unwrap();
        assert_eq!(tool_message.role, MessageRole::Tool);
        assert!(tool_message.content.contains("\"status\":\"CONFIRMED\""));
    }

    #[tokio::test]
    async fn domain_failure_reaches_model_as_data() {
        let catalog = build_catalog_with_clock(&RuntimeConfig::default(), today).unwrap();
        let airline = catalog.get("airline").unwrap();

        let provider = ScriptedProvider::new(vec![
            ScriptedReply::tool_call(
                "call_1",
                "cancel_booking",
                json!({"bookingNumber": "XYZ000", "firstName": "John", "lastName": "Smith"}),
            ),
            ScriptedReply::text("I could not find that booking. Could you check the number?"),
        ]);
        let orchestrator = orchestrator(provider.clone());

        let outcome = orchestrator
            .run_turn(&airline, TurnRequest::new("Cancel XYZ000"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.content.contains("could not find"));
        let tool_message = provider.requests()[1].messages.last().unwrap().clone();
        let payload: serde_json::Value = serde_json::from_str(&tool_message.content).unwrap();
        assert_eq!(payload["error"]["kind"], "domain_error");
        assert_eq!(payload["error"]["status"], "not_found");
    }

    #[tokio::test]
    async fn assistant_uses_default_voice() {
        let catalog = build_catalog_with_clock(&RuntimeConfig::default(), today).unwrap();
        let assistant = catalog.get("assistant").unwrap();

        let provider = ScriptedProvider::new(vec![ScriptedReply::text("Hello there!")]);
        let orchestrator = orchestrator(provider.clone());
        orchestrator
            .run_turn(&assistant, TurnRequest::new("Hi"), &CancellationToken::new())
            .await
            .unwrap();

        let system = provider.requests()[0].system.clone().unwrap();
        assert!(system.ends_with("voice of a Normal man"));
        assert!(provider.requests()[0].tools.is_empty());
    }
}
