// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A fixed set of reconnecting connections shared round-robin.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use stowage_store::Error;
use tokio::sync::Mutex;

/// When pooled connections are retired and how long a checkout may wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Limits {
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) max_conn_age: Option<Duration>,
    pub(crate) pool_timeout: Option<Duration>,
}

impl Limits {
    /// Returns true if a connection opened at `opened_at` and last handed out at
    /// `last_used` must be replaced before it is used at `now`.
    pub(crate) fn is_stale(&self, opened_at: Instant, last_used: Instant, now: Instant) -> bool {
        let idle = self
            .idle_timeout
            .is_some_and(|limit| now.saturating_duration_since(last_used) >= limit);
        let aged = self
            .max_conn_age
            .is_some_and(|limit| now.saturating_duration_since(opened_at) >= limit);
        idle || aged
    }
}

struct Pooled {
    connection: ConnectionManager,
    opened_at: Instant,
    last_used: Instant,
}

/// Connections to one server, opened lazily and handed out round-robin.
///
/// Each slot holds a multiplexed [`ConnectionManager`], so a checkout never waits for
/// another command to finish. A slot is (re)connected on checkout when it is empty or
/// its connection went stale under [`Limits`].
pub(crate) struct Pool {
    client: redis::Client,
    config: ConnectionManagerConfig,
    slots: Box<[Mutex<Option<Pooled>>]>,
    next: AtomicUsize,
    limits: Limits,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("size", &self.slots.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Pool {
    /// Creates a pool of `size` slots (at least one) and opens the first `warm` of them.
    pub(crate) async fn open(
        client: redis::Client,
        config: ConnectionManagerConfig,
        size: usize,
        warm: usize,
        limits: Limits,
    ) -> Result<Self, Error> {
        let size = size.max(1);
        let pool = Self {
            client,
            config,
            slots: (0..size).map(|_| Mutex::new(None)).collect(),
            next: AtomicUsize::new(0),
            limits,
        };

        for slot in pool.slots.iter().take(warm.clamp(1, size)) {
            let connection = pool.connect().await?;
            let now = Instant::now();
            *slot.lock().await = Some(Pooled {
                connection,
                opened_at: now,
                last_used: now,
            });
        }

        Ok(pool)
    }

    pub(crate) fn size(&self) -> usize {
        self.slots.len()
    }

    /// Hands out the connection of the next slot, connecting it first if needed.
    ///
    /// With a pool timeout set, waiting for the slot and connecting it are bounded by
    /// that timeout together.
    pub(crate) async fn checkout(&self) -> Result<ConnectionManager, Error> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let acquire = self.checkout_slot(&self.slots[index]);

        match self.limits.pool_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(Error::backend)?,
            None => acquire.await,
        }
    }

    async fn checkout_slot(&self, slot: &Mutex<Option<Pooled>>) -> Result<ConnectionManager, Error> {
        let mut pooled = slot.lock().await;
        let now = Instant::now();

        if let Some(current) = pooled.as_mut()
            && !self.limits.is_stale(current.opened_at, current.last_used, now)
        {
            current.last_used = now;
            return Ok(current.connection.clone());
        }

        let connection = self.connect().await?;
        *pooled = Some(Pooled {
            connection: connection.clone(),
            opened_at: now,
            last_used: now,
        });
        Ok(connection)
    }

    async fn connect(&self) -> Result<ConnectionManager, Error> {
        ConnectionManager::new_with_config(self.client.clone(), self.config.clone())
            .await
            .map_err(Error::backend)
    }
}
