//! Platform public key cache.
//!
//! [`KeyCache`] resolves `(account, serial)` to a platform public key. Each
//! account owns one cached [`KeySet`], replaced wholesale whenever the gateway
//! is asked for the current keys.
//!
//! # Concurrency
//!
//! ```text
//! lookup → read lock on the account's cached set
//!        → hit? return (no await)
//!        → miss: lock the account's flight mutex
//!              → a fetch completed while waiting? reuse its outcome
//!              → otherwise fetch, publish the set, record the outcome
//! ```
//!
//! Every completed fetch bumps a per-account counter. A caller samples the
//! counter before it looks at the cache; if the counter moved by the time it
//! holds the flight mutex, somebody else fetched on its behalf and the
//! recorded outcome (keys or failure) is shared instead of fetching again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use error_stack::Report;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::SignatureError;
use crate::settings::KeyCacheSettings;

use super::{AccountKey, KeySet, KeySetFetcher, PublicKey};

/// When cached key sets are considered out of date.
///
/// The default keeps a fetched set for the life of the cache and refetches
/// only when a serial is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Age after which a cached set is refetched before use.
    pub ttl: Option<Duration>,
    /// Unknown serials against a set younger than this fail without a refetch.
    pub min_refetch_interval: Duration,
}

impl RefreshPolicy {
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    fn is_expired(&self, fetched_at: Instant) -> bool {
        self.ttl.is_some_and(|ttl| fetched_at.elapsed() >= ttl)
    }

    fn refetch_allowed(&self, fetched_at: Instant) -> bool {
        fetched_at.elapsed() >= self.min_refetch_interval
    }
}

impl From<&KeyCacheSettings> for RefreshPolicy {
    fn from(settings: &KeyCacheSettings) -> Self {
        Self {
            ttl: settings.ttl_secs.map(Duration::from_secs),
            min_refetch_interval: Duration::from_secs(settings.min_refetch_interval_secs),
        }
    }
}

#[derive(Clone)]
struct CachedKeySet {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// Outcome of the most recent fetch, shared with callers that waited on it.
#[derive(Default)]
struct FlightRecord {
    outcome: Option<Result<Arc<KeySet>, String>>,
}

#[derive(Default)]
struct AccountSlot {
    cached: RwLock<Option<CachedKeySet>>,
    flight: Mutex<FlightRecord>,
    completed_fetches: AtomicU64,
}

impl AccountSlot {
    fn current(&self) -> Option<CachedKeySet> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, keys: Arc<KeySet>) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        });
    }

    fn clear(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Lazily populated, per-account cache of platform public keys.
///
/// Construct one per process and share it behind an [`Arc`].
pub struct KeyCache {
    fetcher: Arc<dyn KeySetFetcher>,
    policy: RefreshPolicy,
    accounts: RwLock<HashMap<AccountKey, Arc<AccountSlot>>>,
}

impl KeyCache {
    #[must_use]
    pub fn new(fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self::with_policy(fetcher, RefreshPolicy::default())
    }

    #[must_use]
    pub fn with_policy(fetcher: Arc<dyn KeySetFetcher>, policy: RefreshPolicy) -> Self {
        Self {
            fetcher,
            policy,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    fn slot(&self, account: &AccountKey) -> Arc<AccountSlot> {
        if let Some(slot) = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
        {
            return Arc::clone(slot);
        }

        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(accounts.entry(account.clone()).or_default())
    }

    /// Resolves the platform key that `serial` names for `account`.
    ///
    /// Served from cache when possible; otherwise the account's full key set is
    /// fetched once (coalesced with concurrent callers) and searched again.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::UnknownKeySerial`] if a fresh key set does not
    ///   contain `serial`.
    /// - [`SignatureError::KeyFetchFailure`] if the fetch fails; the previously
    ///   cached set is left in place.
    pub async fn get_public_key(
        &self,
        account: &AccountKey,
        serial: &str,
    ) -> Result<PublicKey, Report<SignatureError>> {
        let slot = self.slot(account);
        let observed = slot.completed_fetches.load(Ordering::Acquire);
        let cached = slot.current();

        if let Some(cached) = &cached {
            if !self.policy.is_expired(cached.fetched_at) {
                if let Some(key) = cached.keys.get(serial) {
                    log::debug!("Platform key {} for account {} served from cache", serial, account);
                    return Ok(key.clone());
                }
                if !self.policy.refetch_allowed(cached.fetched_at) {
                    return Err(unknown_serial(account, serial));
                }
            }
        }

        match self.fetch_coalesced(account, &slot, observed).await {
            Ok(keys) => keys
                .get(serial)
                .cloned()
                .ok_or_else(|| unknown_serial(account, serial)),
            Err(report) => {
                // An expired set still beats no answer when the gateway is unavailable.
                if let Some(key) = cached.as_ref().and_then(|c| c.keys.get(serial)) {
                    log::warn!(
                        "Serving expired platform key {} for account {} after failed refresh: {}",
                        serial,
                        account,
                        report.current_context()
                    );
                    return Ok(key.clone());
                }
                Err(report)
            }
        }
    }

    /// Returns the account's whole key set, fetching it if nothing usable is cached.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::KeyFetchFailure`] if a required fetch fails.
    pub async fn get_public_keys(
        &self,
        account: &AccountKey,
    ) -> Result<Arc<KeySet>, Report<SignatureError>> {
        let slot = self.slot(account);
        let observed = slot.completed_fetches.load(Ordering::Acquire);

        if let Some(cached) = slot.current() {
            if !self.policy.is_expired(cached.fetched_at) {
                return Ok(cached.keys);
            }
        }

        self.fetch_coalesced(account, &slot, observed).await
    }

    /// Fetches the account's current key set regardless of what is cached.
    ///
    /// Joins a fetch already in flight for the same account instead of
    /// starting another.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::KeyFetchFailure`] if the fetch fails.
    pub async fn refresh(&self, account: &AccountKey) -> Result<Arc<KeySet>, Report<SignatureError>> {
        let slot = self.slot(account);
        let observed = slot.completed_fetches.load(Ordering::Acquire);
        self.fetch_coalesced(account, &slot, observed).await
    }

    /// Drops the cached key set for `account`; the next lookup fetches.
    pub fn invalidate(&self, account: &AccountKey) {
        if let Some(slot) = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
        {
            slot.clear();
            log::info!("Invalidated platform keys for account {}", account);
        }
    }

    /// Serials currently cached for `account`, without fetching.
    #[must_use]
    pub fn cached_serials(&self, account: &AccountKey) -> Vec<String> {
        let slot = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
            .cloned();

        slot.and_then(|slot| slot.current())
            .map(|cached| cached.keys.serials().map(str::to_string).collect())
            .unwrap_or_default()
    }

    async fn fetch_coalesced(
        &self,
        account: &AccountKey,
        slot: &AccountSlot,
        observed: u64,
    ) -> Result<Arc<KeySet>, Report<SignatureError>> {
        let mut flight = slot.flight.lock().await;

        if slot.completed_fetches.load(Ordering::Acquire) != observed {
            if let Some(outcome) = &flight.outcome {
                log::debug!("Joined completed platform key fetch for account {}", account);
                return outcome.clone().map_err(|message| {
                    Report::new(SignatureError::KeyFetchFailure { message })
                        .attach(format!("shared outcome of a concurrent fetch for {}", account))
                });
            }
        }

        log::debug!("Fetching platform keys for account {}", account);
        let result = self.fetcher.fetch_key_set(account).await;

        let outcome = match result {
            Ok(keys) => {
                let keys = Arc::new(keys);
                slot.publish(Arc::clone(&keys));
                log::info!(
                    "Fetched {} platform key(s) for account {}",
                    keys.len(),
                    account
                );
                Ok(keys)
            }
            Err(report) => {
                log::warn!("Platform key fetch for account {} failed: {:?}", account, report);
                let message = format!(
                    "failed to fetch platform keys for account {}: {}",
                    account,
                    report.current_context()
                );
                Err((message, report))
            }
        };

        flight.outcome = Some(
            outcome
                .as_ref()
                .map(Arc::clone)
                .map_err(|(message, _)| message.clone()),
        );
        slot.completed_fetches.fetch_add(1, Ordering::Release);

        outcome.map_err(|(message, report)| {
            report.change_context(SignatureError::KeyFetchFailure { message })
        })
    }
}

fn unknown_serial(account: &AccountKey, serial: &str) -> Report<SignatureError> {
    log::error!(
        "Gateway presented platform key serial {} unknown to account {} key set",
        serial,
        account
    );
    Report::new(SignatureError::UnknownKeySerial {
        account: account.clone(),
        serial: serial.to_string(),
    })
}
