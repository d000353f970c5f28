// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring Redis stores.
//!
//! The builder covers the connection options of the store without exposing the
//! underlying `redis` configuration types. Options left unset, or set to zero, keep the
//! driver defaults.

use std::{marker::PhantomData, time::Duration};

use redis::{IntoConnectionInfo, aio::ConnectionManagerConfig};
use stowage_store::{Codec, Error, Logger, NO_EXPIRATION, PostcardCodec};

use crate::{
    pool::{Limits, Pool},
    store::{RedisStore, STORE_TYPE},
};

/// Builder for a [`RedisStore`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use stowage_redis::RedisStore;
///
/// # async fn example() -> Result<(), stowage_store::Error> {
/// let store = RedisStore::<u64>::builder("localhost:6379")
///     .db(1)
///     .password("s3cret")
///     .max_retries(3)
///     .min_retry_backoff(Duration::from_millis(8))
///     .max_retry_backoff(Duration::from_millis(512))
///     .dial_timeout(Duration::from_secs(5))
///     .read_timeout(Duration::from_secs(3))
///     .write_timeout(Duration::from_secs(3))
///     .pool_size(4)
///     .min_idle_conns(2)
///     .idle_timeout(Duration::from_secs(300))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct RedisStoreBuilder<V, C = PostcardCodec> {
    address: String,
    db: Option<i64>,
    username: Option<String>,
    password: Option<String>,
    max_retries: Option<usize>,
    min_retry_backoff: Option<Duration>,
    max_retry_backoff: Option<Duration>,
    dial_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    pool_size: Option<usize>,
    min_idle_conns: Option<usize>,
    limits: Limits,
    default_expiration: Duration,
    logger: Option<Logger>,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> std::fmt::Debug for RedisStoreBuilder<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStoreBuilder")
            .field("address", &self.address)
            .field("db", &self.db)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_retries", &self.max_retries)
            .field("dial_timeout", &self.dial_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("pool_size", &self.pool_size)
            .field("min_idle_conns", &self.min_idle_conns)
            .field("limits", &self.limits)
            .field("default_expiration", &self.default_expiration)
            .finish_non_exhaustive()
    }
}

impl<V> RedisStoreBuilder<V> {
    /// Creates a builder for a store connecting to `address`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            db: None,
            username: None,
            password: None,
            max_retries: None,
            min_retry_backoff: None,
            max_retry_backoff: None,
            dial_timeout: None,
            read_timeout: None,
            write_timeout: None,
            pool_size: None,
            min_idle_conns: None,
            limits: Limits::default(),
            default_expiration: NO_EXPIRATION,
            logger: None,
            codec: PostcardCodec,
            _value: PhantomData,
        }
    }
}

impl<V, C> RedisStoreBuilder<V, C> {
    /// Selects the logical database. Defaults to `0`, or the one named in the URL.
    #[must_use]
    pub fn db(mut self, db: i64) -> Self {
        self.db = Some(db);
        self
    }

    /// Sets the ACL user name.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password. An empty password is ignored.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Sets how many times a failed connection attempt is retried.
    #[must_use]
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = (retries > 0).then_some(retries);
        self
    }

    /// Sets the backoff before the first reconnection attempt.
    #[must_use]
    pub fn min_retry_backoff(mut self, backoff: Duration) -> Self {
        self.min_retry_backoff = non_zero(backoff);
        self
    }

    /// Caps the backoff between reconnection attempts.
    #[must_use]
    pub fn max_retry_backoff(mut self, backoff: Duration) -> Self {
        self.max_retry_backoff = non_zero(backoff);
        self
    }

    /// Sets the timeout for establishing a connection.
    #[must_use]
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = non_zero(timeout);
        self
    }

    /// Sets how long to wait for the reply to a command.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = non_zero(timeout);
        self
    }

    /// Bounds `SET` and `DEL` commands, from sending the command to its reply.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = non_zero(timeout);
        self
    }

    /// Sets how many multiplexed connections commands are spread over. Defaults to one.
    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = (size > 0).then_some(size);
        self
    }

    /// Sets how many pooled connections are opened by `connect` instead of on first use.
    /// At least one always is, and never more than the pool size.
    #[must_use]
    pub fn min_idle_conns(mut self, connections: usize) -> Self {
        self.min_idle_conns = (connections > 0).then_some(connections);
        self
    }

    /// Replaces a pooled connection that has not been handed out for this long.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.limits.idle_timeout = non_zero(timeout);
        self
    }

    /// Replaces a pooled connection once it has been open for this long.
    #[must_use]
    pub fn max_conn_age(mut self, age: Duration) -> Self {
        self.limits.max_conn_age = non_zero(age);
        self
    }

    /// Bounds how long a command waits for its pooled connection, including
    /// (re)connecting it.
    #[must_use]
    pub fn pool_timeout(mut self, timeout: Duration) -> Self {
        self.limits.pool_timeout = non_zero(timeout);
        self
    }

    /// Sets the expiration applied by
    /// [`Expiration::Default`](stowage_store::Expiration::Default). Zero, the default,
    /// means default writes never expire.
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

    /// Replaces the codec used to encode values.
    #[must_use]
    pub fn codec<C2>(self, codec: C2) -> RedisStoreBuilder<V, C2>
    where
        C2: Codec,
    {
        RedisStoreBuilder {
            address: self.address,
            db: self.db,
            username: self.username,
            password: self.password,
            max_retries: self.max_retries,
            min_retry_backoff: self.min_retry_backoff,
            max_retry_backoff: self.max_retry_backoff,
            dial_timeout: self.dial_timeout,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            pool_size: self.pool_size,
            min_idle_conns: self.min_idle_conns,
            limits: self.limits,
            default_expiration: self.default_expiration,
            logger: self.logger,
            codec,
            _value: PhantomData,
        }
    }

    fn manager_config(&self) -> ConnectionManagerConfig {
        let mut config = ConnectionManagerConfig::new();
        if let Some(retries) = self.max_retries {
            config = config.set_number_of_retries(retries);
        }
        if let Some(backoff) = self.min_retry_backoff {
            config = config.set_factor(whole_millis(backoff));
        }
        if let Some(backoff) = self.max_retry_backoff {
            config = config.set_max_delay(whole_millis(backoff));
        }
        if let Some(timeout) = self.dial_timeout {
            config = config.set_connection_timeout(timeout);
        }
        if let Some(timeout) = self.read_timeout {
            config = config.set_response_timeout(timeout);
        }
        config
    }

    /// Connects to the server and builds the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the address cannot be parsed or the server cannot
    /// be reached.
    pub async fn connect(self) -> Result<RedisStore<V, C>, Error> {
        let logger = self.logger.clone().unwrap_or_default();

        let mut info = connection_url(&self.address)
            .into_connection_info()
            .map_err(Error::backend)?;
        if let Some(db) = self.db {
            info.redis.db = db;
        }
        if self.username.is_some() {
            info.redis.username.clone_from(&self.username);
        }
        if self.password.is_some() {
            info.redis.password.clone_from(&self.password);
        }

        let client = redis::Client::open(info).map_err(Error::backend)?;
        let pool = Pool::open(
            client,
            self.manager_config(),
            self.pool_size.unwrap_or(1),
            self.min_idle_conns.unwrap_or(1),
            self.limits,
        )
        .await
        .inspect_err(|error| {
            logger.in_scope(|| tracing::warn!(store = STORE_TYPE, address = %self.address, %error, "connect failed"));
        })?;

        logger.in_scope(|| {
            tracing::debug!(store = STORE_TYPE, address = %self.address, pool_size = pool.size(), "connected");
        });
        Ok(RedisStore::from_parts(
            pool,
            self.codec,
            self.default_expiration,
            self.write_timeout,
            logger,
        ))
    }
}

/// Accepts bare `host:port` addresses next to full connection URLs.
pub(crate) fn connection_url(address: &str) -> String {
    if address.contains("://") {
        address.to_owned()
    } else {
        format!("redis://{address}")
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_addresses_get_a_scheme() {
        assert_eq!(connection_url("localhost:6379"), "redis://localhost:6379");
        assert_eq!(connection_url("rediss://cache.internal:6380/2"), "rediss://cache.internal:6380/2");
    }

    #[test]
    fn zero_options_keep_driver_defaults() {
        let builder = RedisStoreBuilder::<u32>::new("localhost:6379")
            .max_retries(0)
            .dial_timeout(Duration::ZERO)
            .read_timeout(Duration::ZERO)
            .password("");

        assert_eq!(builder.max_retries, None);
        assert_eq!(builder.dial_timeout, None);
        assert_eq!(builder.read_timeout, None);
        assert_eq!(builder.password, None);
    }

    #[test]
    fn zero_pool_options_keep_defaults() {
        let builder = RedisStoreBuilder::<u32>::new("localhost:6379")
            .write_timeout(Duration::ZERO)
            .pool_size(0)
            .min_idle_conns(0)
            .idle_timeout(Duration::ZERO)
            .max_conn_age(Duration::ZERO)
            .pool_timeout(Duration::ZERO);

        assert_eq!(builder.write_timeout, None);
        assert_eq!(builder.pool_size, None);
        assert_eq!(builder.min_idle_conns, None);
        assert_eq!(builder.limits, Limits::default());
    }

    #[test]
    fn pool_options_are_recorded() {
        let builder = RedisStoreBuilder::<u32>::new("localhost:6379")
            .write_timeout(Duration::from_millis(250))
            .pool_size(8)
            .min_idle_conns(2)
            .idle_timeout(Duration::from_secs(300))
            .max_conn_age(Duration::from_secs(3600))
            .pool_timeout(Duration::from_secs(4));

        assert_eq!(builder.write_timeout, Some(Duration::from_millis(250)));
        assert_eq!(builder.pool_size, Some(8));
        assert_eq!(builder.min_idle_conns, Some(2));
        assert_eq!(
            builder.limits,
            Limits {
                idle_timeout: Some(Duration::from_secs(300)),
                max_conn_age: Some(Duration::from_secs(3600)),
                pool_timeout: Some(Duration::from_secs(4)),
            }
        );

        // Pool options survive a codec swap.
        let builder = builder.codec(stowage_store::JsonCodec);
        assert_eq!(builder.pool_size, Some(8));
        assert_eq!(builder.limits.pool_timeout, Some(Duration::from_secs(4)));
    }

    #[test]
    fn debug_redacts_the_password() {
        let builder = RedisStoreBuilder::<u32>::new("localhost:6379").password("hunter2");
        let output = format!("{builder:?}");
        assert!(!output.contains("hunter2"));
        assert!(output.contains("redacted"));
    }

    #[test]
    fn default_expiration_is_never() {
        let builder = RedisStoreBuilder::<u32>::new("localhost:6379");
        assert_eq!(builder.default_expiration, NO_EXPIRATION);
    }
}
