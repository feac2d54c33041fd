//! Common utilities shared across the review service crates.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for tracing subscriber setup
pub mod observability;

/// Module for secret types that prevent accidental logging
pub mod secret;
