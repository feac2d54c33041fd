//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports from the [`secrecy`] crate. `SecretString` implements `Debug`
//! with redaction, so a struct deriving `Debug` that holds one (for example a
//! database URL with an embedded password) is safe to log.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let url = SecretString::from("postgresql://app:hunter2@db/reviews");
//! assert!(!format!("{url:?}").contains("hunter2"));
//! assert!(url.expose_secret().starts_with("postgresql://"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
