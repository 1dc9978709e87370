//! Observability setup for Parlor.
//!
//! - [`tracing_setup`]: subscriber installation (fmt + `EnvFilter`, optional
//!   OpenTelemetry stdout export) and shutdown
//! - [`genai_attrs`]: span and field names shared by every layer

pub mod genai_attrs;
pub mod tracing_setup;
