//! Merchant-side signing commands.

use std::fs;
use std::path::Path;

use tenpay_sign_common::request_signing::{current_timestamp, generate_nonce, PaymentSigner};

use crate::config::load_settings;
use crate::error::CliError;

fn signer(config: &Path, verbose: bool) -> Result<PaymentSigner, CliError> {
    let settings = load_settings(config, verbose)?;
    Ok(PaymentSigner::from_settings(&settings.merchant))
}

/// Sign arbitrary text with the merchant private key.
pub fn sign_message(config: &Path, message: &str, verbose: bool) -> Result<String, CliError> {
    let signature = signer(config, verbose)?.sign(message)?;
    println!("{}", signature);
    Ok(signature)
}

/// Print the client-side payment invocation payload for a prepay package.
pub fn pay_sign(
    config: &Path,
    package: &str,
    timestamp: Option<String>,
    nonce: Option<String>,
    verbose: bool,
) -> Result<String, CliError> {
    let timestamp = timestamp.unwrap_or_else(current_timestamp);
    let nonce = nonce.unwrap_or_else(generate_nonce);

    let payload = signer(config, verbose)?.invocation_payload(&timestamp, &nonce, package)?;
    let json = serde_json::to_string_pretty(&payload)
        .map_err(|e| CliError::Signature(format!("Failed to serialize payload: {e}")))?;

    println!("{}", json);
    Ok(json)
}

/// Print the `Authorization` header for an outbound API request.
pub fn authorize(
    config: &Path,
    method: &str,
    url: &str,
    body_file: Option<&Path>,
    verbose: bool,
) -> Result<String, CliError> {
    let body = match body_file {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    let method = method.to_ascii_uppercase();

    let header = signer(config, verbose)?.authorization(
        &method,
        url,
        &current_timestamp(),
        &generate_nonce(),
        &body,
    )?;

    println!("{}", header);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{keypair, write_settings};
    use tenpay_sign_common::request_signing::verify_signature;

    #[test]
    fn test_sign_message() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());

        let signature = sign_message(&config, "hello", false).expect("should sign");
        assert!(verify_signature("hello", &signature, &keypair().public_key_b64).unwrap());
    }

    #[test]
    fn test_pay_sign_payload() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());

        let json = pay_sign(
            &config,
            "prepay_id=wx201410272009395522657a690389285100",
            Some("1414561699".into()),
            Some("5K8264ILTKCH16CQ2502SI8ZNMTM67VS".into()),
            false,
        )
        .expect("should build payload");

        let payload: serde_json::Value = serde_json::from_str(&json).expect("should be JSON");
        assert_eq!(payload["appId"], "wx8888888888888888");
        assert_eq!(payload["signType"], "RSA");

        let message = "wx8888888888888888\n1414561699\n5K8264ILTKCH16CQ2502SI8ZNMTM67VS\nprepay_id=wx201410272009395522657a690389285100\n";
        let pay_sign = payload["paySign"].as_str().expect("paySign should be a string");
        assert!(verify_signature(message, pay_sign, &keypair().public_key_b64).unwrap());
    }

    #[test]
    fn test_pay_sign_generates_timestamp_and_nonce() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());

        let json = pay_sign(&config, "prepay_id=xyz", None, None, false).expect("should sign");
        let payload: serde_json::Value = serde_json::from_str(&json).expect("should be JSON");
        assert_eq!(payload["nonceStr"].as_str().map(str::len), Some(32));
        assert!(!payload["timeStamp"].as_str().unwrap_or_default().is_empty());
    }

    #[test]
    fn test_authorize_header() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());

        let header = authorize(&config, "get", "/v3/certificates", None, false)
            .expect("should build header");
        assert!(header.starts_with("WECHATPAY2-SHA256-RSA2048 mchid=\"1900000109\""));
        assert!(header.contains("serial_no=\"1DDE55AD98ED71D6EDD4A4A16996DE7B47773A8C\""));
    }
}
