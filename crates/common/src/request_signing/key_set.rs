//! Platform public keys and the account identity that partitions them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Merchant account whose platform key set is being resolved.
///
/// A direct merchant has an empty `sub_mch_id`. Each distinct pair owns an
/// independent key set; lookups never cross accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub mch_id: String,
    #[serde(default)]
    pub sub_mch_id: String,
}

impl AccountKey {
    pub fn new(mch_id: impl Into<String>, sub_mch_id: impl Into<String>) -> Self {
        Self {
            mch_id: mch_id.into(),
            sub_mch_id: sub_mch_id.into(),
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_mch_id.is_empty() {
            write!(f, "{}", self.mch_id)
        } else {
            write!(f, "{}_{}", self.mch_id, self.sub_mch_id)
        }
    }
}

/// Base64 DER of a platform public key. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(Arc<str>);

impl PublicKey {
    pub fn new(key_b64: impl Into<Arc<str>>) -> Self {
        Self(key_b64.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PublicKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PublicKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Serial number → public key for one account, as published by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: HashMap<String, PublicKey>,
}

impl KeySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_key(mut self, serial: impl Into<String>, key: impl Into<PublicKey>) -> Self {
        self.insert(serial, key);
        self
    }

    pub fn insert(&mut self, serial: impl Into<String>, key: impl Into<PublicKey>) {
        self.keys.insert(serial.into(), key.into());
    }

    #[must_use]
    pub fn get(&self, serial: &str) -> Option<&PublicKey> {
        self.keys.get(serial)
    }

    #[must_use]
    pub fn contains(&self, serial: &str) -> bool {
        self.keys.contains_key(serial)
    }

    pub fn serials(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S, K> FromIterator<(S, K)> for KeySet
where
    S: Into<String>,
    K: Into<PublicKey>,
{
    fn from_iter<I: IntoIterator<Item = (S, K)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (serial, key) in iter {
            set.insert(serial, key);
        }
        set
    }
}
