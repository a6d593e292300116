//! Signature subsystem for WeChat Pay API V3 integrations.
//!
//! Produces RSA-SHA256 signatures over outbound requests and payment
//! invocations, and verifies gateway signatures over callbacks and responses
//! using platform public keys that are fetched lazily and cached per merchant
//! account.
//!
//! # Modules
//!
//! - [`constants`]: Header names and wire-level constants
//! - [`error`]: Error types and error handling utilities
//! - [`request_signing`]: Canonical messages, signing, verification and the platform key cache
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and mocks

pub mod constants;
pub mod error;
pub mod request_signing;
pub mod settings;
