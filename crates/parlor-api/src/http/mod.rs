//! HTTP layer for Parlor.
//!
//! Axum routes: the versioned JSON API under `/api/v1/`, the two legacy
//! plain-text assistant endpoints, and `/health`. JSON responses use the
//! `{data, meta, errors}` envelope.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
