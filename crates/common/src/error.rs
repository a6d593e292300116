//! Error types for signing, verification and platform key resolution.
//!
//! Every fallible operation in this crate returns an
//! [`error_stack::Report<SignatureError>`]; callers branch on
//! [`Report::current_context`](error_stack::Report::current_context) to
//! distinguish malformed input from a genuine integrity problem.

use derive_more::{Display, Error};

use crate::request_signing::AccountKey;

#[derive(Debug, Display, Error)]
pub enum SignatureError {
    /// Key bytes do not decode or parse as the expected RSA key type.
    #[display("Invalid key material: {message}")]
    InvalidKeyMaterial { message: String },

    /// The detached signature is not valid base64.
    #[display("Invalid signature encoding: {message}")]
    InvalidSignatureEncoding { message: String },

    /// The gateway presented a serial number that a fresh key fetch does not know.
    #[display("Unknown platform key serial '{serial}' for account {account}")]
    UnknownKeySerial { account: AccountKey, serial: String },

    /// The key-distribution collaborator was unreachable or returned unusable data.
    #[display("Platform key fetch failed: {message}")]
    KeyFetchFailure { message: String },

    /// The RSA signing primitive itself failed.
    #[display("Signing failed: {message}")]
    SigningFailure { message: String },

    /// A callback request lacks one of the signature headers.
    #[display("Invalid callback: {message}")]
    InvalidCallback { message: String },

    #[display("Configuration error: {message}")]
    Configuration { message: String },
}

impl SignatureError {
    /// Whether this condition should be logged as a potential integrity problem
    /// rather than as an ordinary failure.
    #[must_use]
    pub fn is_security_alert(&self) -> bool {
        matches!(self, Self::UnknownKeySerial { .. })
    }
}
