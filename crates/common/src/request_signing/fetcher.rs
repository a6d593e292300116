//! Key-distribution collaborators.
//!
//! The cache never talks to the gateway itself. It asks a [`KeySetFetcher`]
//! for the full current key set of an account; transport, authentication and
//! certificate decryption live behind that trait.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::SignatureError;

use super::{normalize_key_material, AccountKey, KeySet};

/// Fetches the gateway's currently published platform keys for an account.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Returns every key the gateway currently publishes for `account`.
    ///
    /// # Errors
    ///
    /// Implementations return [`SignatureError::KeyFetchFailure`] when the
    /// gateway cannot be reached or its response is unusable.
    async fn fetch_key_set(&self, account: &AccountKey) -> Result<KeySet, Report<SignatureError>>;
}

/// Serves key sets from memory, typically loaded from a local key file.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySetFetcher {
    accounts: HashMap<AccountKey, KeySet>,
}

#[derive(Debug, Deserialize)]
struct KeyFile {
    #[serde(default)]
    accounts: Vec<KeyFileAccount>,
}

#[derive(Debug, Deserialize)]
struct KeyFileAccount {
    mch_id: String,
    #[serde(default)]
    sub_mch_id: String,
    #[serde(default)]
    keys: HashMap<String, String>,
}

impl StaticKeySetFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account(mut self, account: AccountKey, keys: KeySet) -> Self {
        self.accounts.insert(account, keys);
        self
    }

    /// Parses a key file of the form:
    ///
    /// ```toml
    /// [[accounts]]
    /// mch_id = "1900000109"
    /// sub_mch_id = ""
    ///
    /// [accounts.keys]
    /// "5157F09EFDC096DE15EBE81A47057A72" = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA..."
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<SignatureError>> {
        let file: KeyFile =
            toml::from_str(toml_str).change_context(SignatureError::Configuration {
                message: "Failed to parse platform key file".into(),
            })?;

        let accounts: HashMap<AccountKey, KeySet> = file
            .accounts
            .into_iter()
            .map(|entry| {
                let keys: KeySet = entry
                    .keys
                    .into_iter()
                    .map(|(serial, key)| (serial, normalize_key_material(&key)))
                    .collect();
                (AccountKey::new(entry.mch_id, entry.sub_mch_id), keys)
            })
            .collect();

        Ok(Self { accounts })
    }

    /// Reads and parses a key file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, Report<SignatureError>> {
        let content =
            std::fs::read_to_string(path).change_context(SignatureError::Configuration {
                message: format!("Failed to read platform key file {}", path.display()),
            })?;
        Self::from_toml(&content)
    }
}

#[async_trait]
impl KeySetFetcher for StaticKeySetFetcher {
    async fn fetch_key_set(&self, account: &AccountKey) -> Result<KeySet, Report<SignatureError>> {
        self.accounts.get(account).cloned().ok_or_else(|| {
            Report::new(SignatureError::KeyFetchFailure {
                message: format!("No platform keys configured for account {}", account),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_FILE: &str = r#"
        [[accounts]]
        mch_id = "1900000109"

        [accounts.keys]
        "SERIAL-A" = "MIIBIjAN-a"
        "SERIAL-B" = """
        -----BEGIN PUBLIC KEY-----
        MIIBIjAN
        -b
        -----END PUBLIC KEY-----
        """

        [[accounts]]
        mch_id = "1900000109"
        sub_mch_id = "1900000110"

        [accounts.keys]
        "SERIAL-C" = "MIIBIjAN-c"
        "#;

    #[tokio::test]
    async fn test_from_toml_partitions_accounts() {
        let fetcher = StaticKeySetFetcher::from_toml(KEY_FILE).unwrap();

        let direct = fetcher
            .fetch_key_set(&AccountKey::new("1900000109", ""))
            .await
            .unwrap();
        assert_eq!(direct.len(), 2);
        assert_eq!(direct.get("SERIAL-A").unwrap().as_str(), "MIIBIjAN-a");
        assert_eq!(direct.get("SERIAL-B").unwrap().as_str(), "MIIBIjAN-b");
        assert!(!direct.contains("SERIAL-C"));

        let sub = fetcher
            .fetch_key_set(&AccountKey::new("1900000109", "1900000110"))
            .await
            .unwrap();
        assert_eq!(sub.len(), 1);
        assert!(sub.contains("SERIAL-C"));
    }

    #[tokio::test]
    async fn test_unknown_account_is_fetch_failure() {
        let fetcher = StaticKeySetFetcher::new()
            .with_account(AccountKey::new("1", ""), KeySet::new().with_key("S", "k"));

        let err = fetcher
            .fetch_key_set(&AccountKey::new("2", ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignatureError::KeyFetchFailure { .. }
        ));
    }

    #[test]
    fn test_malformed_key_file() {
        let err = StaticKeySetFetcher::from_toml("[[accounts]]\nkeys = 3").unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignatureError::Configuration { .. }
        ));
    }

    #[test]
    fn test_empty_key_file() {
        assert!(StaticKeySetFetcher::from_toml("").is_ok());
    }
}
