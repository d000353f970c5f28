// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory store keeping encoded payloads.
//!
//! [`MemoryStore`] encodes every value through a [`Codec`] before caching it, so a read
//! always hands out a fresh copy and later mutation of the caller's value never leaks
//! into the cache.

use std::{fmt::Debug, marker::PhantomData, sync::Arc, time::Duration};

use moka::sync::Cache;
use serde::{Serialize, de::DeserializeOwned};
use stowage_store::{Codec, Error, Expiration, Logger, PostcardCodec, Store};

use crate::expiry::{Expiring, PerEntryExpiry};

/// The default expiration of a [`MemoryStore`]: 24 hours.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

const STORE_TYPE: &str = "memory";

#[derive(Clone)]
struct Payload {
    bytes: Arc<[u8]>,
    ttl: Option<Duration>,
}

impl Expiring for Payload {
    fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

/// An in-process store holding encoded values with per-entry expiration.
///
/// Values are encoded with `C` (postcard by default) on `set` and decoded on `get`.
/// Each entry expires independently after the duration it was written with;
/// [`Expiration::Default`] applies the store's default expiration, 24 hours unless
/// configured otherwise. Clones share the same underlying cache.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stowage_memory::MemoryStore;
/// use stowage_store::{Expiration, Store};
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
///
/// let store = MemoryStore::<String>::builder()
///     .default_expiration(Duration::from_secs(300))
///     .max_capacity(10_000)
///     .build()?;
///
/// store.set("greeting", &"hello".to_owned(), Expiration::Default).await?;
/// assert_eq!(store.get("greeting").await?, "hello");
/// # Ok::<(), stowage_store::Error>(())
/// # }).unwrap();
/// ```
pub struct MemoryStore<V, C = PostcardCodec> {
    inner: Cache<String, Payload>,
    codec: C,
    default_expiration: Duration,
    logger: Logger,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> Debug for MemoryStore<V, C>
where
    C: Codec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("codec", &self.codec.name())
            .field("default_expiration", &self.default_expiration)
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl<V, C> Clone for MemoryStore<V, C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            codec: self.codec.clone(),
            default_expiration: self.default_expiration,
            logger: self.logger.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryStore<V> {
    /// Creates an unbounded store with the default expiration and the postcard codec.
    #[must_use]
    pub fn new() -> Self {
        MemoryStoreBuilder::new().assemble().0
    }

    /// Creates a builder for configuring a memory store.
    #[must_use]
    pub fn builder() -> MemoryStoreBuilder<V> {
        MemoryStoreBuilder::new()
    }
}

impl<V, C> MemoryStore<V, C> {
    /// Returns the expiration applied to writes made with [`Expiration::Default`].
    #[must_use]
    pub fn default_expiration(&self) -> Duration {
        self.default_expiration
    }

    /// Returns true if a live entry exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the number of live entries.
    ///
    /// Pending maintenance is flushed first, so expired and overwritten entries are
    /// not counted.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl<V, C> MemoryStore<V, C>
where
    V: Serialize,
    C: Codec,
{
    fn write(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        let bytes = self.codec.encode(value).inspect_err(|error| {
            self.logger
                .in_scope(|| tracing::warn!(store = STORE_TYPE, key, %error, "set failed"));
        })?;

        self.inner.insert(
            key.to_owned(),
            Payload {
                bytes: bytes.into(),
                ttl: expiration.resolve(self.default_expiration),
            },
        );
        Ok(())
    }
}

impl<V, C> Store<V> for MemoryStore<V, C>
where
    V: Serialize + DeserializeOwned + Send + Sync,
    C: Codec,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        let Some(payload) = self.inner.get(key) else {
            self.logger
                .in_scope(|| tracing::debug!(store = STORE_TYPE, key, "get: key not found"));
            return Err(Error::KeyNotFound);
        };

        self.codec.decode(&payload.bytes).inspect_err(|error| {
            self.logger
                .in_scope(|| tracing::warn!(store = STORE_TYPE, key, %error, "get failed"));
        })
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        self.write(key, value, expiration)
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

/// Builder for configuring a [`MemoryStore`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stowage_memory::MemoryStore;
/// use stowage_store::{Expiration, JsonCodec};
///
/// let store = MemoryStore::<u32>::builder()
///     .default_expiration(Duration::from_secs(60))
///     .max_capacity(1_000)
///     .name("sessions")
///     .codec(JsonCodec)
///     .seed("answer", 42)
///     .seed_with_expiration("short-lived", 7, Expiration::After(Duration::from_secs(5)))
///     .build()?;
///
/// assert!(store.contains_key("answer"));
/// # Ok::<(), stowage_store::Error>(())
/// ```
#[derive(Debug)]
pub struct MemoryStoreBuilder<V, C = PostcardCodec> {
    default_expiration: Duration,
    max_capacity: Option<u64>,
    initial_capacity: Option<usize>,
    name: Option<String>,
    logger: Option<Logger>,
    codec: C,
    seeds: Vec<(String, V, Expiration)>,
}

impl<V> Default for MemoryStoreBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryStoreBuilder<V> {
    /// Creates a builder with the default settings: unbounded, a 24 hour default
    /// expiration, the postcard codec and the default logger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_expiration: DEFAULT_EXPIRATION,
            max_capacity: None,
            initial_capacity: None,
            name: None,
            logger: None,
            codec: PostcardCodec,
            seeds: Vec::new(),
        }
    }
}

impl<V, C> MemoryStoreBuilder<V, C> {
    /// Sets the expiration applied by [`Expiration::Default`].
    ///
    /// [`NO_EXPIRATION`](stowage_store::NO_EXPIRATION) makes default writes never expire.
    #[must_use]
    pub fn default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    /// Bounds the number of entries. Once reached, entries are evicted by moka's
    /// `TinyLFU` policy.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the number of entries to pre-allocate room for.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Names the underlying cache for diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the logger of the store. Without one, the process default is used.
    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replaces the codec used to encode values.
    #[must_use]
    pub fn codec<C2>(self, codec: C2) -> MemoryStoreBuilder<V, C2>
    where
        C2: Codec,
    {
        MemoryStoreBuilder {
            default_expiration: self.default_expiration,
            max_capacity: self.max_capacity,
            initial_capacity: self.initial_capacity,
            name: self.name,
            logger: self.logger,
            codec,
            seeds: self.seeds,
        }
    }

    /// Pre-populates the store with `value` under `key`, using the default expiration.
    #[must_use]
    pub fn seed(self, key: impl Into<String>, value: V) -> Self {
        self.seed_with_expiration(key, value, Expiration::Default)
    }

    /// Pre-populates the store with `value` under `key`, using the given expiration.
    #[must_use]
    pub fn seed_with_expiration(mut self, key: impl Into<String>, value: V, expiration: Expiration) -> Self {
        self.seeds.push((key.into(), value, expiration));
        self
    }

    /// Pre-populates the store with every key and value in `items`.
    #[must_use]
    pub fn seed_items<I, K>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        self.seeds
            .extend(items.into_iter().map(|(key, value)| (key.into(), value, Expiration::Default)));
        self
    }

    fn assemble(self) -> (MemoryStore<V, C>, Vec<(String, V, Expiration)>) {
        let mut builder = Cache::<String, Payload>::builder().expire_after(PerEntryExpiry);

        if let Some(capacity) = self.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(capacity) = self.initial_capacity {
            builder = builder.initial_capacity(capacity);
        }

        if let Some(name) = self.name.as_deref() {
            builder = builder.name(name);
        }

        let store = MemoryStore {
            inner: builder.build(),
            codec: self.codec,
            default_expiration: self.default_expiration,
            logger: self.logger.unwrap_or_default(),
            _value: PhantomData,
        };
        (store, self.seeds)
    }
}

impl<V, C> MemoryStoreBuilder<V, C>
where
    V: Serialize,
    C: Codec,
{
    /// Builds the store and writes the seeded entries into it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Marshal`] if a seeded value cannot be encoded.
    pub fn build(self) -> Result<MemoryStore<V, C>, Error> {
        let (store, seeds) = self.assemble();
        for (key, value, expiration) in seeds {
            store.write(&key, &value, expiration)?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_uses_default_expiration() {
        let store = MemoryStore::<String>::new();
        assert_eq!(store.default_expiration(), DEFAULT_EXPIRATION);
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.store_type(), "memory");
    }

    #[test]
    fn seeds_are_written_on_build() {
        let store = MemoryStore::<u32>::builder()
            .seed("one", 1)
            .seed_items([("two", 2), ("three", 3)])
            .build()
            .expect("build failed");

        assert!(store.contains_key("one"));
        assert!(store.contains_key("three"));
        assert_eq!(store.entry_count(), 3);
    }

    #[test]
    fn clear_removes_everything() {
        let store = MemoryStore::<u32>::builder().seed("one", 1).build().expect("build failed");
        store.clear();
        assert!(!store.contains_key("one"));
    }

    #[test]
    fn debug_names_the_codec() {
        let store = MemoryStore::<u32>::new();
        assert!(format!("{store:?}").contains("postcard"));
    }
}
