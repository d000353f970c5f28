// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Redis store implementation.

use std::{marker::PhantomData, sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use stowage_store::{Codec, Error, Expiration, Logger, PostcardCodec, Store};

use crate::{builder::RedisStoreBuilder, pool::Pool};

pub(crate) const STORE_TYPE: &str = "redis";

/// A store keeping encoded values in Redis.
///
/// Values are encoded with `C` (postcard by default) and written with `SET`, using a
/// millisecond `PX` expiry when the resolved expiration is finite. A nil `GET` reply is
/// reported as [`Error::KeyNotFound`]; every other driver error is forwarded as
/// [`Error::Backend`].
///
/// The store spreads commands round-robin over a small pool of multiplexed connections
/// (one unless [`pool_size`](RedisStoreBuilder::pool_size) says otherwise), each of which
/// reconnects transparently. Clones share the pool.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use stowage_redis::RedisStore;
/// use stowage_store::{Expiration, Store};
///
/// # async fn example() -> Result<(), stowage_store::Error> {
/// let store = RedisStore::<String>::builder("redis://127.0.0.1:6379")
///     .db(2)
///     .default_expiration(Duration::from_secs(3600))
///     .connect()
///     .await?;
///
/// store.set("greeting", &"hello".to_owned(), Expiration::Default).await?;
/// assert_eq!(store.get("greeting").await?, "hello");
/// # Ok(())
/// # }
/// ```
pub struct RedisStore<V, C = PostcardCodec> {
    pool: Arc<Pool>,
    codec: C,
    default_expiration: Duration,
    write_timeout: Option<Duration>,
    logger: Logger,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> std::fmt::Debug for RedisStore<V, C>
where
    C: Codec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("codec", &self.codec.name())
            .field("default_expiration", &self.default_expiration)
            .field("pool_size", &self.pool.size())
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl<V, C> Clone for RedisStore<V, C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            codec: self.codec.clone(),
            default_expiration: self.default_expiration,
            write_timeout: self.write_timeout,
            logger: self.logger.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> RedisStore<V> {
    /// Creates a builder for a store connecting to `address`.
    ///
    /// `address` is either a `redis://` or `rediss://` URL or a bare `host:port`.
    #[must_use]
    pub fn builder(address: impl Into<String>) -> RedisStoreBuilder<V> {
        RedisStoreBuilder::new(address)
    }
}

impl<V, C> RedisStore<V, C> {
    pub(crate) fn from_parts(
        pool: Pool,
        codec: C,
        default_expiration: Duration,
        write_timeout: Option<Duration>,
        logger: Logger,
    ) -> Self {
        Self {
            pool: Arc::new(pool),
            codec,
            default_expiration,
            write_timeout,
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

    /// Runs a write command, bounded by the write timeout when one is set.
    async fn write<T>(&self, command: &redis::Cmd) -> Result<T, Error>
    where
        T: redis::FromRedisValue,
    {
        let mut connection = self.pool.checkout().await?;
        let reply = command.query_async(&mut connection);
        match self.write_timeout {
            Some(limit) => tokio::time::timeout(limit, reply)
                .await
                .map_err(Error::backend)?
                .map_err(Error::backend),
            None => reply.await.map_err(Error::backend),
        }
    }
}

impl<V, C> Store<V> for RedisStore<V, C>
where
    V: Serialize + DeserializeOwned + Send + Sync,
    C: Codec,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        let mut connection = self
            .pool
            .checkout()
            .await
            .inspect_err(|error| self.log_failure("get", key, error))?;
        let reply: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(Error::backend)
            .inspect_err(|error| self.log_failure("get", key, error))?;

        let Some(bytes) = reply else {
            self.logger
                .in_scope(|| tracing::debug!(store = STORE_TYPE, key, "get: key not found"));
            return Err(Error::KeyNotFound);
        };

        self.codec
            .decode(&bytes)
            .inspect_err(|error| self.log_failure("get", key, error))
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        let bytes = self
            .codec
            .encode(value)
            .inspect_err(|error| self.log_failure("set", key, error))?;

        let mut command = redis::cmd("SET");
        command.arg(key).arg(bytes);
        if let Some(ttl) = expiration.resolve(self.default_expiration) {
            command.arg("PX").arg(millis_rounded_up(ttl));
        }

        let () = self
            .write(&command)
            .await
            .inspect_err(|error| self.log_failure("set", key, error))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut command = redis::cmd("DEL");
        command.arg(key);
        let _removed: u64 = self
            .write(&command)
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

/// Converts a time-to-live into `PX` milliseconds, never rounding down to zero.
pub(crate) fn millis_rounded_up(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_milliseconds_are_kept() {
        assert_eq!(millis_rounded_up(Duration::from_millis(1500)), 1500);
        assert_eq!(millis_rounded_up(Duration::from_secs(60)), 60_000);
    }

    #[test]
    fn sub_millisecond_remainders_round_up() {
        assert_eq!(millis_rounded_up(Duration::from_micros(1)), 1);
        assert_eq!(millis_rounded_up(Duration::from_micros(2_001)), 3);
    }

    #[test]
    fn huge_durations_saturate() {
        assert_eq!(millis_rounded_up(Duration::MAX), u64::MAX);
    }
}
