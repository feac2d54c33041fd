//! Observability for the review service.
//!
//! Prometheus metric definitions and recording helpers. Tracing subscriber
//! setup lives in `common::observability`.

pub mod metrics;
