// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring memcached stores.

use std::{marker::PhantomData, time::Duration};

use memcache::Client;
use stowage_store::{Codec, Error, JsonCodec, Logger, NO_EXPIRATION};

use crate::store::{MemcacheStore, STORE_TYPE};

/// Builder for a [`MemcacheStore`].
///
/// At least one server is always present: the first one is given to
/// [`MemcacheStore::builder`], more can be added with [`server`](Self::server). Keys are
/// distributed over the servers by hash.
pub struct MemcacheStoreBuilder<V, C = JsonCodec> {
    servers: Vec<String>,
    max_idle_conns: Option<u32>,
    timeout: Option<Duration>,
    default_expiration: Duration,
    logger: Option<Logger>,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> std::fmt::Debug for MemcacheStoreBuilder<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheStoreBuilder")
            .field("servers", &self.servers)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("timeout", &self.timeout)
            .field("default_expiration", &self.default_expiration)
            .finish_non_exhaustive()
    }
}

impl<V> MemcacheStoreBuilder<V> {
    /// Creates a builder using `server` as the first server.
    #[must_use]
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            servers: vec![server.into()],
            max_idle_conns: None,
            timeout: None,
            default_expiration: NO_EXPIRATION,
            logger: None,
            codec: JsonCodec,
            _value: PhantomData,
        }
    }
}

impl<V, C> MemcacheStoreBuilder<V, C> {
    /// Adds another server.
    #[must_use]
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.servers.push(server.into());
        self
    }

    /// Sets the number of pooled connections kept per server. Zero keeps the driver
    /// default.
    #[must_use]
    pub fn max_idle_conns(mut self, connections: u32) -> Self {
        self.max_idle_conns = (connections > 0).then_some(connections);
        self
    }

    /// Sets the connect, read and write timeout of every server connection. Zero keeps
    /// the driver default.
    ///
    /// The connect timeout travels as the `connect_timeout` URL parameter and is not
    /// added to a server URL that already carries one.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
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
    pub fn codec<C2>(self, codec: C2) -> MemcacheStoreBuilder<V, C2>
    where
        C2: Codec,
    {
        MemcacheStoreBuilder {
            servers: self.servers,
            max_idle_conns: self.max_idle_conns,
            timeout: self.timeout,
            default_expiration: self.default_expiration,
            logger: self.logger,
            codec,
            _value: PhantomData,
        }
    }

    /// Opens the connection pools and builds the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if a server URL is invalid or a server cannot be
    /// reached.
    pub async fn connect(self) -> Result<MemcacheStore<V, C>, Error> {
        let logger = self.logger.unwrap_or_default();
        let urls: Vec<String> = self
            .servers
            .iter()
            .map(|server| server_url(server, self.timeout))
            .collect();
        let pool_size = self.max_idle_conns.unwrap_or(1);
        let timeout = self.timeout;

        let opened = tokio::task::spawn_blocking(move || {
            let client = Client::with_pool_size(urls, pool_size)?;
            if timeout.is_some() {
                client.set_read_timeout(timeout)?;
                client.set_write_timeout(timeout)?;
            }
            Ok::<_, memcache::MemcacheError>(client)
        })
        .await
        .map_err(Error::backend)?
        .map_err(Error::backend);

        match opened {
            Ok(client) => {
                logger.in_scope(|| tracing::debug!(store = STORE_TYPE, servers = ?self.servers, "connected"));
                Ok(MemcacheStore::from_parts(client, self.codec, self.default_expiration, logger))
            }
            Err(error) => {
                logger.in_scope(|| tracing::warn!(store = STORE_TYPE, servers = ?self.servers, %error, "connect failed"));
                Err(error)
            }
        }
    }
}

/// Accepts bare `host:port` addresses next to full server URLs, and appends the
/// connect timeout in seconds.
pub(crate) fn server_url(server: &str, connect_timeout: Option<Duration>) -> String {
    let mut url = if server.contains("://") {
        server.to_owned()
    } else {
        format!("memcache://{server}")
    };

    if let Some(timeout) = connect_timeout
        && !url.contains("connect_timeout=")
    {
        let separator = if url.contains('?') { '&' } else { '?' };
        url = format!("{url}{separator}connect_timeout={}", timeout.as_secs_f64());
    }
    url
}
