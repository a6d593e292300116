//! Decoding of RSA key material handed over at the crate boundary.
//!
//! Keys arrive as base64 DER: PKCS#8 for the merchant private key,
//! SubjectPublicKeyInfo (or bare PKCS#1) for platform public keys. Decoded
//! keys are never cached or logged by this module.

use base64::{engine::general_purpose, Engine};
use error_stack::{Report, ResultExt};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::constants::RECOMMENDED_RSA_BITS;
use crate::error::SignatureError;

/// Strips PEM armor lines and whitespace, leaving the base64 body.
///
/// Input that is already bare base64 is returned with whitespace removed.
#[must_use]
pub fn normalize_key_material(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn decode_der(key_b64: &str, kind: &str) -> Result<Vec<u8>, Report<SignatureError>> {
    let normalized = normalize_key_material(key_b64);
    if normalized.is_empty() {
        return Err(Report::new(SignatureError::InvalidKeyMaterial {
            message: format!("{} is empty", kind),
        }));
    }

    general_purpose::STANDARD
        .decode(normalized.as_bytes())
        .change_context(SignatureError::InvalidKeyMaterial {
            message: format!("Failed to decode base64 {}", kind),
        })
}

fn warn_if_weak(bits: usize, kind: &str) {
    if bits < RECOMMENDED_RSA_BITS {
        log::warn!(
            "{} is {} bits, below the recommended {} bits",
            kind,
            bits,
            RECOMMENDED_RSA_BITS
        );
    }
}

/// Decodes base64 PKCS#8 DER into an RSA private key.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKeyMaterial`] if the input is not base64 or
/// the DER is not a PKCS#8 RSA private key.
pub fn decode_private_key(private_key_b64: &str) -> Result<RsaPrivateKey, Report<SignatureError>> {
    let der = decode_der(private_key_b64, "private key")?;
    let key = RsaPrivateKey::from_pkcs8_der(&der).map_err(|e| {
        Report::new(SignatureError::InvalidKeyMaterial {
            message: format!("Failed to parse PKCS#8 RSA private key: {}", e),
        })
    })?;

    warn_if_weak(key.size() * 8, "Merchant private key");
    Ok(key)
}

/// Decodes base64 DER into an RSA public key.
///
/// SubjectPublicKeyInfo is tried first, then a bare PKCS#1 `RSAPublicKey`.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKeyMaterial`] if the input is not base64 or
/// parses as neither format.
pub fn decode_public_key(public_key_b64: &str) -> Result<RsaPublicKey, Report<SignatureError>> {
    let der = decode_der(public_key_b64, "public key")?;
    let key = RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|e| {
            Report::new(SignatureError::InvalidKeyMaterial {
                message: format!("Failed to parse RSA public key: {}", e),
            })
        })?;

    warn_if_weak(key.size() * 8, "Platform public key");
    Ok(key)
}
