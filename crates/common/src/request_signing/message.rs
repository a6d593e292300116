//! Canonical message construction.
//!
//! WeChat Pay signs newline-joined field lists where every field, including
//! the last, is followed by `\n`. The counterparty rebuilds the identical
//! string, so field order and the trailing terminator are part of the wire
//! contract. Fields are not validated here; empty values are legal.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::constants::NONCE_LENGTH;

fn canonical_message(fields: &[&str]) -> String {
    let capacity = fields.iter().map(|f| f.len() + 1).sum();
    let mut message = String::with_capacity(capacity);
    for field in fields {
        message.push_str(field);
        message.push('\n');
    }
    message
}

/// Message signed for a client-side payment invocation (JSAPI, mini program, app).
#[must_use]
pub fn build_payment_invocation_message(
    app_id: &str,
    timestamp: &str,
    nonce: &str,
    package: &str,
) -> String {
    canonical_message(&[app_id, timestamp, nonce, package])
}

/// Message the gateway signs over a callback or API response.
#[must_use]
pub fn build_callback_message(timestamp: &str, nonce: &str, body: &str) -> String {
    canonical_message(&[timestamp, nonce, body])
}

/// Message a merchant signs for an outbound API request.
///
/// `url` is the absolute path including the query string, e.g.
/// `/v3/certificates?limit=1`. `body` is empty for `GET` requests.
#[must_use]
pub fn build_request_message(
    method: &str,
    url: &str,
    timestamp: &str,
    nonce: &str,
    body: &str,
) -> String {
    canonical_message(&[method, url, timestamp, nonce, body])
}

/// Random alphanumeric nonce suitable for `nonceStr` / `nonce_str`.
#[must_use]
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Current Unix time in seconds, as the gateway expects it.
#[must_use]
pub fn current_timestamp() -> String {
    Utc::now().timestamp().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_invocation_message_exact() {
        let message =
            build_payment_invocation_message("wx123", "1700000000", "abc", "prepay_id=xyz");
        assert_eq!(message, "wx123\n1700000000\nabc\nprepay_id=xyz\n");
    }

    #[test]
    fn test_callback_message_exact() {
        let message = build_callback_message("1700000000", "nonce", r#"{"id":"evt"}"#);
        assert_eq!(message, "1700000000\nnonce\n{\"id\":\"evt\"}\n");
    }

    #[test]
    fn test_request_message_exact() {
        let message = build_request_message(
            "GET",
            "/v3/certificates",
            "1554208460",
            "593BEC0C930BF1AFEB40B4A08C8FB242",
            "",
        );
        assert_eq!(
            message,
            "GET\n/v3/certificates\n1554208460\n593BEC0C930BF1AFEB40B4A08C8FB242\n\n"
        );
    }

    #[test]
    fn test_empty_fields_are_kept() {
        assert_eq!(build_payment_invocation_message("", "", "", ""), "\n\n\n\n");
        assert_eq!(build_callback_message("", "", ""), "\n\n\n");
    }

    #[test]
    fn test_body_with_newlines_is_not_altered() {
        let message = build_callback_message("1", "n", "line one\nline two");
        assert_eq!(message, "1\nn\nline one\nline two\n");
    }

    #[test]
    fn test_generate_nonce() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LENGTH);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(nonce, generate_nonce());
    }

    #[test]
    fn test_current_timestamp_is_unix_seconds() {
        let timestamp: i64 = current_timestamp()
            .parse()
            .expect("should parse timestamp as integer");
        assert!(timestamp > 1_600_000_000);
    }
}
