// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Memcached store implementation.

use std::{
    marker::PhantomData,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use memcache::{Client, MemcacheError};
use serde::{Serialize, de::DeserializeOwned};
use stowage_store::{Codec, Error, Expiration, JsonCodec, Logger, Store, round_up_to_secs};

use crate::builder::MemcacheStoreBuilder;

pub(crate) const STORE_TYPE: &str = "memcache";

/// The longest expiration memcached accepts as a relative number of seconds: 30 days.
///
/// Longer expirations are sent as an absolute Unix timestamp instead.
pub const MAX_RELATIVE_EXPIRATION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// A store keeping encoded values in memcached.
///
/// Values are encoded with `C` (JSON by default). Memcached counts expiration in whole
/// seconds, so finite expirations are rounded up to the next second. A miss is reported
/// as [`Error::KeyNotFound`] and deleting a missing key succeeds.
///
/// Clones share the same connection pools.
pub struct MemcacheStore<V, C = JsonCodec> {
    client: Arc<Client>,
    codec: C,
    default_expiration: Duration,
    logger: Logger,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> std::fmt::Debug for MemcacheStore<V, C>
where
    C: Codec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheStore")
            .field("codec", &self.codec.name())
            .field("default_expiration", &self.default_expiration)
            .finish_non_exhaustive()
    }
}

impl<V, C> Clone for MemcacheStore<V, C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            codec: self.codec.clone(),
            default_expiration: self.default_expiration,
            logger: self.logger.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> MemcacheStore<V> {
    /// Creates a builder for a store using `server` as its first server.
    ///
    /// `server` is either a `memcache://` URL or a bare `host:port`.
    #[must_use]
    pub fn builder(server: impl Into<String>) -> MemcacheStoreBuilder<V> {
        MemcacheStoreBuilder::new(server)
    }
}

impl<V, C> MemcacheStore<V, C> {
    pub(crate) fn from_parts(client: Client, codec: C, default_expiration: Duration, logger: Logger) -> Self {
        Self {
            client: Arc::new(client),
            codec,
            default_expiration,
            logger,
            _value: PhantomData,
        }
    }

    /// Returns the expiration applied to writes made with [`Expiration::Default`].
    #[must_use]
    pub fn default_expiration(&self) -> Duration {
        self.default_expiration
    }

    fn log_failure(&self, operation: &'static str, key: &str, error: &Error) {
        self.logger
            .in_scope(|| tracing::warn!(store = STORE_TYPE, key, %error, "{operation} failed"));
    }

    /// Runs a client call on the blocking pool.
    async fn run<T, F>(&self, call: F) -> Result<T, Error>
    where
        F: FnOnce(&Client) -> Result<T, MemcacheError> + Send + 'static,
        T: Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || call(&client))
            .await
            .map_err(Error::backend)?
            .map_err(Error::backend)
    }
}

impl<V, C> Store<V> for MemcacheStore<V, C>
where
    V: Serialize + DeserializeOwned + Send + Sync,
    C: Codec,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        let owned = key.to_owned();
        let reply = self
            .run(move |client| client.get::<Vec<u8>>(&owned))
            .await
            .inspect_err(|error| self.log_failure("get", key, error))?;

        let Some(bytes) = reply else {
            self.logger
                .in_scope(|| tracing::debug!(store = STORE_TYPE, key, "get: key not found"));
            return Err(Error::KeyNotFound);
        };

        self.codec.decode(&bytes).inspect_err(|error| {
            self.logger.in_scope(|| {
                tracing::warn!(
                    store = STORE_TYPE,
                    key,
                    %error,
                    data = %String::from_utf8_lossy(&bytes),
                    "get failed"
                );
            });
        })
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        let bytes = self
            .codec
            .encode(value)
            .inspect_err(|error| self.log_failure("set", key, error))?;
        let expiration = expiration_field(expiration.resolve(self.default_expiration), SystemTime::now());

        let owned = key.to_owned();
        self.run(move |client| client.set(&owned, bytes.as_slice(), expiration))
            .await
            .inspect_err(|error| self.log_failure("set", key, error))
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let owned = key.to_owned();
        // A missing key reports `false`, which is still a successful delete.
        let _existed = self
            .run(move |client| client.delete(&owned))
            .await
            .inspect_err(|error| self.log_failure("delete", key, error))?;
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        STORE_TYPE
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Encodes a time-to-live into memcached's expiration field.
///
/// Zero means no expiration. Up to 30 days the field is relative seconds; beyond that
/// memcached reads it as an absolute Unix timestamp.
pub(crate) fn expiration_field(ttl: Option<Duration>, now: SystemTime) -> u32 {
    let Some(ttl) = ttl else {
        return 0;
    };

    let secs = round_up_to_secs(ttl);
    if secs <= MAX_RELATIVE_EXPIRATION.as_secs() {
        return u32::try_from(secs).unwrap_or(u32::MAX);
    }

    let now = now.duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs());
    u32::try_from(now.saturating_add(secs)).unwrap_or(u32::MAX)
}
