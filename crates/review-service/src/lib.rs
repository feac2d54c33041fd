//! Review Service Library
//!
//! Assigns pull request reviewers within a team and keeps assignments
//! consistent when team members are deactivated:
//!
//! - Team and user management
//! - Randomized reviewer selection on pull request creation
//! - Single reviewer reassignment
//! - Bulk deactivation with atomic reassignment of open reviews
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Domain models and API bodies
//! - `observability` - Prometheus metrics
//! - `repositories` - Storage traits, PostgreSQL and in-memory stores
//! - `routes` - Axum router setup
//! - `services` - Business logic and transaction boundaries

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
