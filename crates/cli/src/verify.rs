//! Callback verification against a local platform key file.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tenpay_sign_common::request_signing::{
    CallbackVerifier, KeyCache, RefreshPolicy, StaticKeySetFetcher,
};

use crate::config::load_settings;
use crate::error::CliError;

/// Callback fields as they arrived in the gateway's headers.
#[derive(Debug, Clone)]
pub struct CallbackInput {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub serial: String,
}

/// Verify a callback body. A signature mismatch is [`CliError::Rejected`].
pub fn verify_callback(
    config: &Path,
    keys: &Path,
    input: &CallbackInput,
    body_file: &Path,
    verbose: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config, verbose)?;
    let fetcher = StaticKeySetFetcher::from_file(keys)?;
    let cache = KeyCache::with_policy(
        Arc::new(fetcher),
        RefreshPolicy::from(&settings.key_cache),
    );
    let verifier = CallbackVerifier::new(Arc::new(cache));

    let body = fs::read_to_string(body_file)?;
    let account = settings.merchant.account_key();

    log::debug!(
        "Verifying callback for account {} with platform key {}",
        account,
        input.serial
    );

    let verified = futures::executor::block_on(verifier.verify_callback(
        &input.timestamp,
        &input.nonce,
        &input.signature,
        &body,
        &account,
        &input.serial,
    ))?;

    if !verified {
        return Err(CliError::Rejected);
    }

    println!("Callback signature verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{keypair, sign_with, write_keys, write_settings};

    const SERIAL: &str = "5157F09EFDC096DE15EBE81A47057A7232F1B8E1";
    const BODY: &str = r#"{"id":"EV-2018022511223320873","event_type":"TRANSACTION.SUCCESS"}"#;

    fn input(signature: String, serial: &str) -> CallbackInput {
        CallbackInput {
            timestamp: "1554208460".into(),
            nonce: "593BEC0C930BF1AFEB40B4A08C8FB242".into(),
            signature,
            serial: serial.into(),
        }
    }

    fn signed_input() -> CallbackInput {
        let message = format!("1554208460\n593BEC0C930BF1AFEB40B4A08C8FB242\n{}\n", BODY);
        input(sign_with(&message), SERIAL)
    }

    #[test]
    fn test_verify_callback_accepts_signed_body() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());
        let keys = write_keys(dir.path(), SERIAL, &keypair().public_key_b64);
        let body = dir.path().join("body.json");
        fs::write(&body, BODY).expect("should write body");

        verify_callback(&config, &keys, &signed_input(), &body, false)
            .expect("should verify");
    }

    #[test]
    fn test_verify_callback_rejects_tampered_body() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());
        let keys = write_keys(dir.path(), SERIAL, &keypair().public_key_b64);
        let body = dir.path().join("body.json");
        fs::write(&body, BODY.replace("SUCCESS", "REFUND")).expect("should write body");

        let result = verify_callback(&config, &keys, &signed_input(), &body, false);
        assert!(matches!(result, Err(CliError::Rejected)));
        assert_eq!(result.unwrap_err().exit_code(), 2);
    }

    #[test]
    fn test_verify_callback_unknown_serial() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());
        let keys = write_keys(dir.path(), SERIAL, &keypair().public_key_b64);
        let body = dir.path().join("body.json");
        fs::write(&body, BODY).expect("should write body");

        let mut forged = signed_input();
        forged.serial = "FORGED".into();

        let result = verify_callback(&config, &keys, &forged, &body, false);
        match result {
            Err(CliError::Signature(message)) => assert!(message.contains("FORGED")),
            other => panic!("Expected Signature error, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_callback_bad_signature_encoding() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let config = write_settings(dir.path());
        let keys = write_keys(dir.path(), SERIAL, &keypair().public_key_b64);
        let body = dir.path().join("body.json");
        fs::write(&body, BODY).expect("should write body");

        let result = verify_callback(
            &config,
            &keys,
            &input("not base64!".into(), SERIAL),
            &body,
            false,
        );
        assert!(matches!(result, Err(CliError::Signature(_))));
    }
}
