//! # Review Test Utilities
//!
//! Shared test utilities for the review service.
//!
//! This crate provides:
//! - Server test harness (`TestReviewServer` for HTTP tests)
//! - Fixtures that seed teams and pull requests over HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use review_service::repositories::MemoryStore;
//! use review_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestReviewServer::spawn(MemoryStore::new()).await?;
//!     let client = reqwest::Client::new();
//!
//!     seed_team(&client, &server, "backend", &[("u1", "Alice", true)]).await?;
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod server_harness;

pub use fixtures::*;
pub use server_harness::*;
