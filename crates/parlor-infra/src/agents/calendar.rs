//! Calendar persona over a simulated, process-local event book.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use serde_json::{Value, json};

use parlor_core::agent::AgentDefinition;
use parlor_core::tool::{ToolArguments, ToolSpec, tool_fn};
use parlor_types::agent::MemoryPolicy;
use parlor_types::error::AgentBuildError;
use parlor_types::tool::{DomainError, ParamType};

pub const AGENT_NAME: &str = "calendar";

const SYSTEM_PROMPT: &str = "\
You are a calendar assistant. Use get_current_date to resolve relative dates \
such as \"tomorrow\" or \"next Monday\" before listing or creating events. \
Confirm the title, date and time with the user before creating an event.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: u64,
    pub title: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub duration_minutes: u32,
}

/// Events ordered by insertion. A single `RwLock` keeps ids dense.
#[derive(Debug)]
pub struct EventBook {
    events: RwLock<Vec<CalendarEvent>>,
    clock: fn() -> NaiveDate,
}

impl EventBook {
    /// Book whose notion of "today" comes from `clock`.
    pub fn with_clock(clock: fn() -> NaiveDate) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            clock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Events on `date`, earliest start time first (untimed events last).
    pub fn on(&self, date: NaiveDate) -> Vec<CalendarEvent> {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<CalendarEvent> = events.iter().filter(|e| e.date == date).cloned().collect();
        found.sort_by(|a, b| match (&a.start_time, &b.start_time) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        found
    }

    pub fn create(
        &self,
        title: &str,
        date: NaiveDate,
        start_time: Option<&str>,
        duration_minutes: u32,
    ) -> Result<CalendarEvent, DomainError> {
        let title = title.trim();
        if date < self.today() {
            return Err(DomainError::bad_input(format!("{date} is in the past")));
        }
        let start_time = start_time.map(parse_time).transpose()?;
        if duration_minutes == 0 {
            return Err(DomainError::bad_input("duration must be at least one minute"));
        }

        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let clash = events.iter().any(|e| {
            e.date == date && e.title.eq_ignore_ascii_case(title) && e.start_time == start_time
        });
        if clash {
            return Err(DomainError::conflict(format!(
                "'{title}' is already on the calendar for {date}"
            )));
        }

        let event = CalendarEvent {
            id: events.len() as u64 + 1,
            title: title.to_string(),
            date,
            start_time,
            duration_minutes,
        };
        events.push(event.clone());
        Ok(event)
    }
}

/// Accepts `HH:MM` (24h) and normalizes it.
fn parse_time(raw: &str) -> Result<String, DomainError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| DomainError::bad_input(format!("'{raw}' is not a time in HH:MM form")))
}

async fn get_current_date(book: Arc<EventBook>, _args: ToolArguments) -> Result<Value, DomainError> {
    let today = book.today();
    Ok(json!({ "date": today.format("%Y-%m-%d").to_string(), "weekday": today.format("%A").to_string() }))
}

async fn list_events(book: Arc<EventBook>, args: ToolArguments) -> Result<Value, DomainError> {
    let date = args.opt_date("date")?.unwrap_or_else(|| book.today());
    let events = book.on(date);
    Ok(json!({ "date": date.format("%Y-%m-%d").to_string(), "events": events }))
}

async fn create_event(book: Arc<EventBook>, args: ToolArguments) -> Result<Value, DomainError> {
    let duration = match args.opt_i64("durationMinutes") {
        Some(minutes) => u32::try_from(minutes)
            .map_err(|_| DomainError::bad_input(format!("invalid duration {minutes}")))?,
        None => 30,
    };
    let event = book.create(
        args.str("title")?,
        args.date("date")?,
        args.opt_str("startTime"),
        duration,
    )?;
    tracing::info!(event = event.id, date = %event.date, "calendar event created");
    Ok(serde_json::to_value(event).unwrap_or(Value::Null))
}

pub fn tools(book: &Arc<EventBook>) -> Vec<ToolSpec> {
    let b = Arc::clone(book);
    let current_date = ToolSpec::new(
        "get_current_date",
        "Today's date and weekday",
        tool_fn(move |args| get_current_date(Arc::clone(&b), args)),
    );

    let b = Arc::clone(book);
    let list = ToolSpec::new(
        "list_events",
        "List events on a given day (defaults to today)",
        tool_fn(move |args| list_events(Arc::clone(&b), args)),
    )
    .optional("date", ParamType::Date, "Day to list (YYYY-MM-DD)");

    let b = Arc::clone(book);
    let create = ToolSpec::new(
        "create_event",
        "Create a calendar event",
        tool_fn(move |args| create_event(Arc::clone(&b), args)),
    )
    .required("title", ParamType::String, "Event title")
    .required("date", ParamType::Date, "Event day (YYYY-MM-DD)")
    .optional("startTime", ParamType::String, "Start time, HH:MM 24h")
    .optional("durationMinutes", ParamType::Integer, "Length in minutes (default 30)");

    vec![current_date, list, create]
}

pub fn agent(book: Arc<EventBook>, recall_size: usize) -> Result<AgentDefinition, AgentBuildError> {
    let mut builder = AgentDefinition::builder(AGENT_NAME)
        .description("Calendar assistant: list and create events")
        .system_prompt(SYSTEM_PROMPT)
        .memory(MemoryPolicy::PerConversation { recall_size });
    for spec in tools(&book) {
        builder = builder.tool(spec);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::tool::{ToolDispatcher, ToolRegistry};
    use parlor_types::llm::ToolCallRequest;
    use parlor_types::tool::{DomainStatus, ToolCallResult, ToolFailureKind};

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn book() -> Arc<EventBook> {
        Arc::new(EventBook::with_clock(fixed_today))
    }

    async fn call(book: &Arc<EventBook>, name: &str, arguments: Value) -> ToolCallResult {
        let mut builder = ToolRegistry::builder();
        for spec in tools(book) {
            builder.register(spec).unwrap();
        }
        let call = ToolCallRequest {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments,
        };
        ToolDispatcher::new().dispatch(&call, &builder.build()).await
    }

    #[tokio::test]
    async fn current_date_uses_clock() {
        let result = call(&book(), "get_current_date", Value::Null).await;
        assert_eq!(
            result,
            ToolCallResult::Success(json!({"date": "2026-10-19", "weekday": "Monday"}))
        );
    }

    #[tokio::test]
    async fn create_then_list_sorted_by_time() {
        let book = book();
        for (title, time) in [("Standup", "09:30"), ("Lunch", "12:00"), ("Breakfast", "8:00")] {
            let result = call(
                &book,
                "create_event",
                json!({"title": title, "date": "2026-10-20", "startTime": time}),
            )
            .await;
            assert!(result.is_success(), "{result:?}");
        }

        let listed = call(&book, "list_events", json!({"date": "2026-10-20"})).await;
        let ToolCallResult::Success(value) = listed else {
            panic!("list failed: {listed:?}");
        };
        let titles: Vec<&str> = value["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Breakfast", "Standup", "Lunch"]);
        assert_eq!(value["events"][0]["startTime"], "08:00");
        assert_eq!(value["events"][0]["durationMinutes"], 30);
    }

    #[tokio::test]
    async fn list_defaults_to_today() {
        let book = book();
        book.create("Review", fixed_today(), None, 45).unwrap();
        let result = call(&book, "list_events", json!({})).await;
        let ToolCallResult::Success(value) = result else {
            panic!("list failed");
        };
        assert_eq!(value["date"], "2026-10-19");
        assert_eq!(value["events"][0]["title"], "Review");
    }

    #[tokio::test]
    async fn past_dates_and_bad_times_are_rejected() {
        let book = book();
        let past = call(&book, "create_event", json!({"title": "Retro", "date": "2026-10-01"})).await;
        assert_eq!(
            past.failure_kind(),
            Some(ToolFailureKind::DomainError(DomainStatus::BadInput))
        );

        let bad_time = call(
            &book,
            "create_event",
            json!({"title": "Retro", "date": "2026-10-21", "startTime": "noon"}),
        )
        .await;
        assert_eq!(
            bad_time.failure_kind(),
            Some(ToolFailureKind::DomainError(DomainStatus::BadInput))
        );
    }

    #[test]
    fn duplicate_event_conflicts() {
        let book = book();
        let date = NaiveDate::from_ymd_opt(2026, 10, 22).unwrap();
        book.create("1:1", date, Some("10:00"), 30).unwrap();
        let err = book.create("1:1", date, Some("10:00"), 30).unwrap_err();
        assert_eq!(err.status, DomainStatus::Conflict);
    }
}
