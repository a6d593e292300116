//! Authenticity check for gateway callbacks and API responses.
//!
//! Ties the platform [`KeyCache`] to [`verify_signature`]: the serial header
//! selects a key, the timestamp, nonce and raw body form the canonical message.

use std::sync::Arc;

use error_stack::Report;
use http::header::HeaderName;
use http::HeaderMap;

use crate::constants::{
    HEADER_WECHATPAY_NONCE, HEADER_WECHATPAY_SERIAL, HEADER_WECHATPAY_SIGNATURE,
    HEADER_WECHATPAY_TIMESTAMP,
};
use crate::error::SignatureError;

use super::{build_callback_message, verify_signature, AccountKey, KeyCache};

/// The four `Wechatpay-*` header values that accompany a signed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackHeaders {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub serial: String,
}

fn required_header(headers: &HeaderMap, name: &HeaderName) -> Result<String, Report<SignatureError>> {
    let value = headers.get(name).ok_or_else(|| {
        Report::new(SignatureError::InvalidCallback {
            message: format!("Missing header {}", name),
        })
    })?;

    value.to_str().map(str::to_string).map_err(|_| {
        Report::new(SignatureError::InvalidCallback {
            message: format!("Header {} is not visible ASCII", name),
        })
    })
}

impl CallbackHeaders {
    /// Extracts the signature headers from a callback request or API response.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidCallback`] if a header is missing or
    /// not valid ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Report<SignatureError>> {
        Ok(Self {
            timestamp: required_header(headers, &HEADER_WECHATPAY_TIMESTAMP)?,
            nonce: required_header(headers, &HEADER_WECHATPAY_NONCE)?,
            signature: required_header(headers, &HEADER_WECHATPAY_SIGNATURE)?,
            serial: required_header(headers, &HEADER_WECHATPAY_SERIAL)?,
        })
    }
}

/// Decides whether a callback body was signed by the gateway.
#[derive(Clone)]
pub struct CallbackVerifier {
    cache: Arc<KeyCache>,
}

impl CallbackVerifier {
    #[must_use]
    pub fn new(cache: Arc<KeyCache>) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Verifies `signature` over `timestamp\nnonce\nbody\n` with the platform
    /// key that `serial` names for `account`.
    ///
    /// `Ok(false)` means the callback must be rejected.
    ///
    /// # Errors
    ///
    /// Propagates key resolution failures ([`SignatureError::UnknownKeySerial`],
    /// [`SignatureError::KeyFetchFailure`]) and malformed input
    /// ([`SignatureError::InvalidKeyMaterial`],
    /// [`SignatureError::InvalidSignatureEncoding`]).
    pub async fn verify_callback(
        &self,
        timestamp: &str,
        nonce: &str,
        signature: &str,
        body: &str,
        account: &AccountKey,
        serial: &str,
    ) -> Result<bool, Report<SignatureError>> {
        let public_key = self.cache.get_public_key(account, serial).await?;
        let message = build_callback_message(timestamp, nonce, body);

        let verified = verify_signature(&message, signature, public_key.as_str())?;
        if !verified {
            log::warn!(
                "Rejected callback for account {}: signature does not match platform key {}",
                account,
                serial
            );
        }
        Ok(verified)
    }

    /// [`verify_callback`](Self::verify_callback) over extracted headers.
    ///
    /// # Errors
    ///
    /// See [`verify_callback`](Self::verify_callback).
    pub async fn verify_headers(
        &self,
        headers: &CallbackHeaders,
        body: &str,
        account: &AccountKey,
    ) -> Result<bool, Report<SignatureError>> {
        self.verify_callback(
            &headers.timestamp,
            &headers.nonce,
            &headers.signature,
            body,
            account,
            &headers.serial,
        )
        .await
    }
}
