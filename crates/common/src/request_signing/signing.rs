//! RSA-SHA256 signing and verification.
//!
//! Signatures are RSASSA-PKCS1-v1_5 over SHA-256 of the UTF-8 message bytes,
//! exchanged as standard base64. Key material is decoded per call and dropped
//! before returning.

use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde::Serialize;
use sha2::Sha256;

use crate::constants::{AUTHORIZATION_SCHEME, INVOCATION_SIGN_TYPE};
use crate::error::SignatureError;
use crate::settings::MerchantSettings;

use super::{
    build_payment_invocation_message, build_request_message, decode_private_key,
    decode_public_key, normalize_key_material,
};

/// Signs `message` with a base64 PKCS#8 RSA private key.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKeyMaterial`] if the key cannot be decoded,
/// or [`SignatureError::SigningFailure`] if the RSA operation fails.
pub fn sign(message: &str, private_key_b64: &str) -> Result<String, Report<SignatureError>> {
    let private_key = decode_private_key(private_key_b64)?;
    let signing_key = SigningKey::<Sha256>::new(private_key);

    let signature = signing_key.try_sign(message.as_bytes()).map_err(|e| {
        Report::new(SignatureError::SigningFailure {
            message: format!("RSA-SHA256 signing operation failed: {}", e),
        })
    })?;

    Ok(general_purpose::STANDARD.encode(signature.to_bytes()))
}

/// Verifies a base64 signature over `message` with a base64 DER public key.
///
/// A well-formed signature that does not match yields `Ok(false)`.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKeyMaterial`] if the public key cannot be
/// parsed, or [`SignatureError::InvalidSignatureEncoding`] if the signature is
/// not base64.
pub fn verify_signature(
    message: &str,
    signature_b64: &str,
    public_key_b64: &str,
) -> Result<bool, Report<SignatureError>> {
    let public_key = decode_public_key(public_key_b64)?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);

    let signature_bytes = general_purpose::STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| {
            Report::new(SignatureError::InvalidSignatureEncoding {
                message: format!("Failed to decode signature: {}", e),
            })
        })?;

    let Ok(signature) = Signature::try_from(signature_bytes.as_slice()) else {
        return Ok(false);
    };

    Ok(verifying_key.verify(message.as_bytes(), &signature).is_ok())
}

/// Client-side payment invocation parameters (`wx.requestPayment` and friends).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationPayload {
    pub app_id: String,
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub sign_type: String,
    pub pay_sign: String,
}

/// Signs outbound material on behalf of one merchant.
///
/// Holds the private key in its encoded form only; each signature decodes it
/// afresh.
pub struct PaymentSigner {
    app_id: String,
    mch_id: String,
    certificate_serial: String,
    private_key_b64: String,
}

impl std::fmt::Debug for PaymentSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSigner")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("certificate_serial", &self.certificate_serial)
            .field("private_key_b64", &"<redacted>")
            .finish()
    }
}

impl PaymentSigner {
    pub fn new(
        app_id: impl Into<String>,
        mch_id: impl Into<String>,
        certificate_serial: impl Into<String>,
        private_key_b64: &str,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            mch_id: mch_id.into(),
            certificate_serial: certificate_serial.into(),
            private_key_b64: normalize_key_material(private_key_b64),
        }
    }

    #[must_use]
    pub fn from_settings(merchant: &MerchantSettings) -> Self {
        Self::new(
            merchant.app_id.clone(),
            merchant.mch_id.clone(),
            merchant.certificate_serial.clone(),
            &merchant.private_key,
        )
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Signs arbitrary text with the merchant key.
    ///
    /// # Errors
    ///
    /// See [`sign`].
    pub fn sign(&self, message: &str) -> Result<String, Report<SignatureError>> {
        sign(message, &self.private_key_b64)
    }

    /// Signature over the payment invocation message for this merchant's app.
    ///
    /// # Errors
    ///
    /// See [`sign`].
    pub fn pay_sign(
        &self,
        timestamp: &str,
        nonce: &str,
        package: &str,
    ) -> Result<String, Report<SignatureError>> {
        let message = build_payment_invocation_message(&self.app_id, timestamp, nonce, package);
        self.sign(&message)
    }

    /// Complete invocation payload ready to hand to the client.
    ///
    /// # Errors
    ///
    /// See [`sign`].
    pub fn invocation_payload(
        &self,
        timestamp: &str,
        nonce: &str,
        package: &str,
    ) -> Result<InvocationPayload, Report<SignatureError>> {
        let pay_sign = self.pay_sign(timestamp, nonce, package)?;

        Ok(InvocationPayload {
            app_id: self.app_id.clone(),
            time_stamp: timestamp.to_string(),
            nonce_str: nonce.to_string(),
            package: package.to_string(),
            sign_type: INVOCATION_SIGN_TYPE.to_string(),
            pay_sign,
        })
    }

    /// `Authorization` header value for an outbound API V3 request.
    ///
    /// # Errors
    ///
    /// See [`sign`].
    pub fn authorization(
        &self,
        method: &str,
        url: &str,
        timestamp: &str,
        nonce: &str,
        body: &str,
    ) -> Result<String, Report<SignatureError>> {
        let message = build_request_message(method, url, timestamp, nonce, body);
        let signature = self.sign(&message)?;

        Ok(format!(
            r#"{} mchid="{}",nonce_str="{}",signature="{}",timestamp="{}",serial_no="{}""#,
            AUTHORIZATION_SCHEME,
            self.mch_id,
            nonce,
            signature,
            timestamp,
            self.certificate_serial
        ))
    }
}
