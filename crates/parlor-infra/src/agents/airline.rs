//! Airline customer-support persona backed by a simulated booking desk.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Value, json};

use parlor_core::agent::AgentDefinition;
use parlor_core::tool::{ToolArguments, ToolSpec, tool_fn};
use parlor_types::agent::MemoryPolicy;
use parlor_types::error::AgentBuildError;
use parlor_types::tool::{DomainError, ParamType};

pub const AGENT_NAME: &str = "airline";

const SYSTEM_PROMPT: &str = "\
You are a customer chat support agent of an airline named \"Funnair\". \
Respond in a friendly, helpful, and joyful manner.
Before providing information about a booking or cancelling a booking, you MUST \
always get the following information from the user: booking number, customer \
first name and last name.
Before changing a booking you MUST ensure it is permitted by the terms. \
If there is a charge for the change, you MUST ask the user to consent before proceeding.
Use the provided functions to fetch booking details, change bookings, and cancel bookings.
Today is {current_date}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date: NaiveDate,
    pub from: String,
    pub to: String,
    pub booking_class: String,
    pub status: BookingStatus,
}

/// In-memory booking store. Safe to share across concurrent turns.
#[derive(Debug)]
pub struct BookingDesk {
    bookings: DashMap<String, Booking>,
    clock: fn() -> NaiveDate,
}

impl BookingDesk {
    /// Empty desk whose notion of "today" comes from `clock`.
    pub fn with_clock(clock: fn() -> NaiveDate) -> Self {
        Self {
            bookings: DashMap::new(),
            clock,
        }
    }

    /// Desk with the demo bookings, dated from `clock()` at seeding time.
    /// `ABC123` (John Smith) departs in ten days; `DEF456` (Jane Doe) departs
    /// tomorrow and is inside the change window.
    pub fn seeded_with_clock(clock: fn() -> NaiveDate) -> Self {
        let desk = Self::with_clock(clock);
        let today = desk.today();
        let seed = [
            ("ABC123", "John", "Smith", 10, "LAX", "JFK", "ECONOMY"),
            ("DEF456", "Jane", "Doe", 1, "SFO", "SEA", "BUSINESS"),
            ("GHI789", "Michael", "Johnson", 21, "ORD", "MIA", "PREMIUM_ECONOMY"),
            ("JKL012", "Sarah", "Williams", 35, "BOS", "LHR", "ECONOMY"),
        ];
        for (number, first, last, days, from, to, class) in seed {
            desk.insert(Booking {
                booking_number: number.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                date: today + Duration::days(days),
                from: from.to_string(),
                to: to.to_string(),
                booking_class: class.to_string(),
                status: BookingStatus::Confirmed,
            });
        }
        desk
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub fn insert(&self, booking: Booking) {
        self.bookings.insert(booking.booking_number.clone(), booking);
    }

    pub fn details(&self, number: &str, first: &str, last: &str) -> Result<Booking, DomainError> {
        let booking = self.find(number)?;
        verify_holder(&booking, first, last)?;
        Ok(booking.clone())
    }

    pub fn change(
        &self,
        number: &str,
        first: &str,
        last: &str,
        new_date: NaiveDate,
        from: &str,
        to: &str,
    ) -> Result<Booking, DomainError> {
        let mut booking = self.find(number)?;
        verify_holder(&booking, first, last)?;
        self.ensure_modifiable(&booking, "changed")?;
        let today = self.today();
        if new_date <= today {
            return Err(DomainError::bad_input(format!(
                "New date {new_date} must be after today ({today})"
            )));
        }

        booking.date = new_date;
        booking.from = from.to_string();
        booking.to = to.to_string();
        Ok(booking.clone())
    }

    pub fn cancel(&self, number: &str, first: &str, last: &str) -> Result<Booking, DomainError> {
        let mut booking = self.find(number)?;
        verify_holder(&booking, first, last)?;
        self.ensure_modifiable(&booking, "cancelled")?;
        booking.status = BookingStatus::Cancelled;
        Ok(booking.clone())
    }

    fn find(&self, number: &str) -> Result<dashmap::mapref::one::RefMut<'_, String, Booking>, DomainError> {
        self.bookings
            .get_mut(&number.trim().to_uppercase())
            .ok_or_else(|| DomainError::not_found(format!("Booking {number} not found")))
    }

    fn ensure_modifiable(&self, booking: &Booking, action: &str) -> Result<(), DomainError> {
        if booking.status != BookingStatus::Confirmed {
            return Err(DomainError::conflict(format!(
                "Booking {} is {} and cannot be {action}",
                booking.booking_number, booking.status
            )));
        }
        if booking.date <= self.today() + Duration::days(1) {
            return Err(DomainError::bad_input(format!(
                "Booking {} cannot be {action} within 24 hours of the start date",
                booking.booking_number
            )));
        }
        Ok(())
    }
}

fn verify_holder(booking: &Booking, first: &str, last: &str) -> Result<(), DomainError> {
    let matches = booking.first_name.eq_ignore_ascii_case(first.trim())
        && booking.last_name.eq_ignore_ascii_case(last.trim());
    if matches {
        Ok(())
    } else {
        Err(DomainError::bad_input(format!(
            "Name does not match booking {}",
            booking.booking_number
        )))
    }
}

fn booking_value(booking: &Booking) -> Value {
    serde_json::to_value(booking).unwrap_or(Value::Null)
}

fn holder(args: &ToolArguments) -> Result<(&str, &str, &str), DomainError> {
    Ok((args.str("bookingNumber")?, args.str("firstName")?, args.str("lastName")?))
}

fn with_holder_params(spec: ToolSpec) -> ToolSpec {
    spec.required("bookingNumber", ParamType::String, "Booking reference, e.g. ABC123")
        .required("firstName", ParamType::String, "Customer first name")
        .required("lastName", ParamType::String, "Customer last name")
}

async fn get_booking_details(desk: Arc<BookingDesk>, args: ToolArguments) -> Result<Value, DomainError> {
    let (number, first, last) = holder(&args)?;
    let booking = desk.details(number, first, last)?;
    Ok(booking_value(&booking))
}

async fn change_booking(desk: Arc<BookingDesk>, args: ToolArguments) -> Result<Value, DomainError> {
    let (number, first, last) = holder(&args)?;
    let booking = desk.change(
        number,
        first,
        last,
        args.date("date")?,
        args.str("from")?,
        args.str("to")?,
    )?;
    tracing::info!(booking = %booking.booking_number, date = %booking.date, "booking changed");
    Ok(booking_value(&booking))
}

async fn cancel_booking(desk: Arc<BookingDesk>, args: ToolArguments) -> Result<Value, DomainError> {
    let (number, first, last) = holder(&args)?;
    let booking = desk.cancel(number, first, last)?;
    tracing::info!(booking = %booking.booking_number, "booking cancelled");
    Ok(json!({ "bookingNumber": booking.booking_number, "status": booking.status }))
}

/// The three booking tools bound to `desk`.
pub fn tools(desk: &Arc<BookingDesk>) -> Vec<ToolSpec> {
    let d = Arc::clone(desk);
    let details = with_holder_params(ToolSpec::new(
        "get_booking_details",
        "Get booking details",
        tool_fn(move |args| get_booking_details(Arc::clone(&d), args)),
    ));

    let d = Arc::clone(desk);
    let change = with_holder_params(ToolSpec::new(
        "change_booking",
        "Change booking dates and route",
        tool_fn(move |args| change_booking(Arc::clone(&d), args)),
    ))
    .required("date", ParamType::Date, "New departure date (YYYY-MM-DD)")
    .required("from", ParamType::String, "Departure airport code")
    .required("to", ParamType::String, "Arrival airport code");

    let d = Arc::clone(desk);
    let cancel = with_holder_params(ToolSpec::new(
        "cancel_booking",
        "Cancel booking",
        tool_fn(move |args| cancel_booking(Arc::clone(&d), args)),
    ));

    vec![details, change, cancel]
}

/// Build the airline agent over `desk`.
pub fn agent(desk: Arc<BookingDesk>, recall_size: usize) -> Result<AgentDefinition, AgentBuildError> {
    let clock = desk.clock;
    let mut builder = AgentDefinition::builder(AGENT_NAME)
        .description("Funnair customer support: look up, change and cancel bookings")
        .system_prompt(SYSTEM_PROMPT)
        .turn_param("current_date", move || clock().format("%Y-%m-%d").to_string())
        .memory(MemoryPolicy::PerConversation { recall_size });
    for spec in tools(&desk) {
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
    use std::sync::atomic::{AtomicI64, Ordering};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn registry(desk: &Arc<BookingDesk>) -> ToolRegistry {
        let mut builder = ToolRegistry::builder();
        for spec in tools(desk) {
            builder.register(spec).unwrap();
        }
        builder.build()
    }

    async fn call(desk: &Arc<BookingDesk>, name: &str, arguments: Value) -> ToolCallResult {
        let call = ToolCallRequest {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments,
        };
        ToolDispatcher::new().dispatch(&call, &registry(desk)).await
    }

    fn domain_status(result: &ToolCallResult) -> Option<DomainStatus> {
        match result.failure_kind() {
            Some(ToolFailureKind::DomainError(status)) => Some(status),
            _ => None,
        }
    }

    #[tokio::test]
    async fn details_for_seeded_booking() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(today));
        let result = call(
            &desk,
            "get_booking_details",
            json!({"bookingNumber": "abc123", "firstName": "John", "lastName": "Smith"}),
        )
        .await;

        match result {
            ToolCallResult::Success(value) => {
                assert_eq!(value["status"], "CONFIRMED");
                assert_eq!(value["bookingNumber"], "ABC123");
                assert_eq!(value["date"], "2026-10-29");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_booking_is_not_found() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(today));
        let result = call(
            &desk,
            "get_booking_details",
            json!({"bookingNumber": "ZZZ999", "firstName": "John", "lastName": "Smith"}),
        )
        .await;
        assert_eq!(domain_status(&result), Some(DomainStatus::NotFound));
    }

    #[tokio::test]
    async fn name_mismatch_is_bad_input() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(today));
        let result = call(
            &desk,
            "get_booking_details",
            json!({"bookingNumber": "ABC123", "firstName": "Jane", "lastName": "Smith"}),
        )
        .await;
        assert_eq!(domain_status(&result), Some(DomainStatus::BadInput));
    }

    #[tokio::test]
    async fn change_updates_booking() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(today));
        let result = call(
            &desk,
            "change_booking",
            json!({
                "bookingNumber": "ABC123", "firstName": "John", "lastName": "Smith",
                "date": "2026-11-02", "from": "LAX", "to": "BOS"
            }),
        )
        .await;
        assert!(result.is_success(), "{result:?}");

        let booking = desk.details("ABC123", "John", "Smith").unwrap();
        assert_eq!(booking.to, "BOS");
        assert_eq!(booking.date, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
    }

    #[tokio::test]
    async fn change_inside_24h_window_is_rejected() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(today));
        let result = call(
            &desk,
            "change_booking",
            json!({
                "bookingNumber": "DEF456", "firstName": "Jane", "lastName": "Doe",
                "date": "2026-11-02", "from": "SFO", "to": "SEA"
            }),
        )
        .await;
        assert_eq!(domain_status(&result), Some(DomainStatus::BadInput));
    }

    #[tokio::test]
    async fn change_with_malformed_date_is_invalid_argument() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(today));
        let result = call(
            &desk,
            "change_booking",
            json!({
                "bookingNumber": "ABC123", "firstName": "John", "lastName": "Smith",
                "date": "next tuesday", "from": "LAX", "to": "BOS"
            }),
        )
        .await;
        assert_eq!(result.failure_kind(), Some(ToolFailureKind::InvalidArgument));
    }

    #[tokio::test]
    async fn cancel_twice_conflicts() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(today));
        let args = json!({"bookingNumber": "GHI789", "firstName": "Michael", "lastName": "Johnson"});

        let first = call(&desk, "cancel_booking", args.clone()).await;
        assert_eq!(
            first,
            ToolCallResult::Success(json!({"bookingNumber": "GHI789", "status": "CANCELLED"}))
        );

        let second = call(&desk, "cancel_booking", args).await;
        assert_eq!(domain_status(&second), Some(DomainStatus::Conflict));
    }

    #[test]
    fn agent_binds_three_tools_with_memory() {
        let agent = agent(Arc::new(BookingDesk::seeded_with_clock(today)), 100).unwrap();
        assert_eq!(
            agent.tools().names(),
            vec!["get_booking_details", "change_booking", "cancel_booking"]
        );
        assert_eq!(agent.memory().recall_size(), Some(100));
        let prompt = agent.render_prompt(&Default::default()).unwrap();
        assert!(prompt.contains("Today is 2026-10-19."));
    }

    static DAYS_PASSED: AtomicI64 = AtomicI64::new(0);

    fn advancing_today() -> NaiveDate {
        today() + Duration::days(DAYS_PASSED.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn desk_and_prompt_follow_the_clock() {
        let desk = Arc::new(BookingDesk::seeded_with_clock(advancing_today));
        let agent = agent(Arc::clone(&desk), 10).unwrap();
        let prompt = agent.render_prompt(&Default::default()).unwrap();
        assert!(prompt.contains("Today is 2026-10-19."));

        // GHI789 departs 2026-11-09, outside the change window on the 19th.
        let change = json!({
            "bookingNumber": "GHI789", "firstName": "Michael", "lastName": "Johnson",
            "date": "2026-11-09", "from": "ORD", "to": "MIA"
        });
        assert!(call(&desk, "change_booking", change.clone()).await.is_success());

        DAYS_PASSED.store(20, Ordering::SeqCst);
        let prompt = agent.render_prompt(&Default::default()).unwrap();
        assert!(prompt.contains("Today is 2026-11-08."));

        let result = call(&desk, "change_booking", change).await;
        assert_eq!(domain_status(&result), Some(DomainStatus::BadInput));
    }
}
