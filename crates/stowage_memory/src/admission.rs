// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cost-bounded in-memory store keeping native values.

use std::{marker::PhantomData, time::Duration};

use moka::sync::Cache;
use stowage_store::{Error, Expiration, Logger, NO_EXPIRATION, Store};

use crate::expiry::{Expiring, PerEntryExpiry};

/// The default number of keys whose access frequency is tracked.
pub const DEFAULT_NUM_COUNTERS: u64 = 10_000_000;

/// The default total cost budget: 1 GiB.
pub const DEFAULT_MAX_COST: u64 = 1 << 30;

/// The default number of keys per read buffer.
pub const DEFAULT_BUFFER_ITEMS: u64 = 64;

/// The default cost of a single entry.
pub const DEFAULT_COST: u64 = 8;

/// The largest cost a single entry can be charged. Costs above it are rejected.
pub const MAX_ENTRY_COST: u64 = 0xFFFF_FFFF;

const STORE_TYPE: &str = "ristretto";

// Upper bound for the table pre-allocation derived from the counter count.
const MAX_INITIAL_CAPACITY: u64 = 1 << 16;

#[derive(Clone)]
struct Admitted<V> {
    value: V,
    weight: u32,
    ttl: Option<Duration>,
}

impl<V> Expiring for Admitted<V> {
    fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

/// An in-process store that keeps values as-is under a total cost budget.
///
/// Every entry is charged a cost, [`DEFAULT_COST`] unless configured otherwise. The sum
/// of the costs of live entries stays within the `max_cost` budget; once it is reached,
/// moka's frequency-based admission decides which entries stay. A single write whose
/// cost exceeds the whole budget is refused with [`Error::Rejected`].
///
/// Reads return a clone of the stored value, so `V` only needs to be [`Clone`].
///
/// # Examples
///
/// ```
/// use stowage_memory::AdmissionStore;
/// use stowage_store::{Expiration, Store};
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
///
/// let store = AdmissionStore::<Vec<u8>>::builder()
///     .max_cost(1 << 20)
///     .default_cost(64)
///     .build();
///
/// store.set("blob", &vec![1, 2, 3], Expiration::Never).await?;
/// assert_eq!(store.get("blob").await?, vec![1, 2, 3]);
/// # Ok::<(), stowage_store::Error>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct AdmissionStore<V> {
    inner: Cache<String, Admitted<V>>,
    default_cost: u64,
    max_cost: u64,
    buffer_items: u64,
    default_expiration: Duration,
    logger: Logger,
}

impl<V> std::fmt::Debug for AdmissionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionStore")
            .field("default_cost", &self.default_cost)
            .field("max_cost", &self.max_cost)
            .field("buffer_items", &self.buffer_items)
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl<V> Default for AdmissionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> AdmissionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a store with the default counters, cost budget and entry cost.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring an admission store.
    #[must_use]
    pub fn builder() -> AdmissionStoreBuilder<V> {
        AdmissionStoreBuilder::new()
    }

    /// Returns the cost charged by [`Store::set`].
    #[must_use]
    pub fn default_cost(&self) -> u64 {
        self.default_cost
    }

    /// Returns the total cost budget.
    #[must_use]
    pub fn max_cost(&self) -> u64 {
        self.max_cost
    }

    /// Returns the configured read buffer size.
    ///
    /// moka batches reads internally, so this value is informational only.
    #[must_use]
    pub fn buffer_items(&self) -> u64 {
        self.buffer_items
    }

    /// Returns true if a live entry exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the number of live entries, after flushing pending maintenance.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    /// Returns the summed cost of live entries, after flushing pending maintenance.
    #[must_use]
    pub fn total_cost(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.weighted_size()
    }

    /// Writes `value` under `key`, charging `cost` instead of the default cost.
    ///
    /// A zero `cost` falls back to the default cost.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] if `cost` exceeds the total cost budget, or the
    /// largest cost a single entry can carry ([`MAX_ENTRY_COST`]). The previous value of
    /// `key`, if any, is kept.
    pub fn set_with_cost(&self, key: &str, value: &V, cost: u64, expiration: Expiration) -> Result<(), Error> {
        let cost = if cost == 0 { self.default_cost } else { cost };
        let limit = self.max_cost.min(MAX_ENTRY_COST);
        let Some(weight) = u32::try_from(cost).ok().filter(|_| cost <= limit) else {
            let error = Error::Rejected { cost, max_cost: limit };
            self.logger
                .in_scope(|| tracing::warn!(store = STORE_TYPE, key, %error, "set failed"));
            return Err(error);
        };

        self.inner.insert(
            key.to_owned(),
            Admitted {
                value: value.clone(),
                weight,
                ttl: expiration.resolve(self.default_expiration),
            },
        );
        Ok(())
    }
}

impl<V> Store<V> for AdmissionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        self.inner.get(key).map(|entry| entry.value).ok_or_else(|| {
            self.logger
                .in_scope(|| tracing::debug!(store = STORE_TYPE, key, "get: key not found"));
            Error::KeyNotFound
        })
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        self.set_with_cost(key, value, self.default_cost, expiration)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.inner.invalidate(key);
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        STORE_TYPE
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Builder for configuring an [`AdmissionStore`].
///
/// # Examples
///
/// ```
/// use stowage_memory::AdmissionStore;
///
/// let store = AdmissionStore::<String>::builder()
///     .num_counters(100_000)
///     .max_cost(1 << 24)
///     .buffer_items(64)
///     .default_cost(1)
///     .build();
///
/// assert_eq!(store.max_cost(), 1 << 24);
/// ```
#[derive(Debug)]
pub struct AdmissionStoreBuilder<V> {
    num_counters: u64,
    max_cost: u64,
    buffer_items: u64,
    default_cost: u64,
    default_expiration: Duration,
    logger: Option<Logger>,
    _value: PhantomData<fn() -> V>,
}

impl<V> Default for AdmissionStoreBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> AdmissionStoreBuilder<V> {
    /// Creates a builder with the default settings.
    ///
    /// Entries never expire unless written with an explicit expiration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            num_counters: DEFAULT_NUM_COUNTERS,
            max_cost: DEFAULT_MAX_COST,
            buffer_items: DEFAULT_BUFFER_ITEMS,
            default_cost: DEFAULT_COST,
            default_expiration: NO_EXPIRATION,
            logger: None,
            _value: PhantomData,
        }
    }

    /// Sets the number of keys to track frequency for. Ten counters per expected
    /// entry is a good starting point. Zero keeps the default.
    #[must_use]
    pub fn num_counters(mut self, num_counters: u64) -> Self {
        if num_counters > 0 {
            self.num_counters = num_counters;
        }
        self
    }

    /// Sets the total cost budget. Zero keeps the default.
    #[must_use]
    pub fn max_cost(mut self, max_cost: u64) -> Self {
        if max_cost > 0 {
            self.max_cost = max_cost;
        }
        self
    }

    /// Sets the number of keys per read buffer. Zero keeps the default.
    #[must_use]
    pub fn buffer_items(mut self, buffer_items: u64) -> Self {
        if buffer_items > 0 {
            self.buffer_items = buffer_items;
        }
        self
    }

    /// Sets the cost charged per entry. Zero falls back to [`DEFAULT_COST`].
    #[must_use]
    pub fn default_cost(mut self, cost: u64) -> Self {
        self.default_cost = if cost == 0 { DEFAULT_COST } else { cost };
        self
    }

    /// Sets the expiration applied by [`Expiration::Default`].
    #[must_use]
    pub fn default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    /// Sets the logger of the store. Without one, the process default is used.
    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builds the store.
    #[must_use]
    pub fn build(self) -> AdmissionStore<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        let initial_capacity = (self.num_counters / 10).clamp(1, MAX_INITIAL_CAPACITY);

        let inner = Cache::<String, Admitted<V>>::builder()
            .max_capacity(self.max_cost)
            .initial_capacity(usize::try_from(initial_capacity).unwrap_or(usize::MAX))
            .weigher(|_key: &String, entry: &Admitted<V>| entry.weight)
            .expire_after(PerEntryExpiry)
            .build();

        AdmissionStore {
            inner,
            default_cost: self.default_cost,
            max_cost: self.max_cost,
            buffer_items: self.buffer_items,
            default_expiration: self.default_expiration,
            logger: self.logger.unwrap_or_default(),
        }
    }
}
