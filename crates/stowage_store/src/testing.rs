// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for stores.
//!
//! This module provides [`MockStore`], a configurable in-memory store that records
//! every operation and supports failure and latency injection, and [`capture_logs`],
//! a [`Logger`] whose output can be inspected.

use std::{collections::HashMap, io::Write, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{Error, Expiration, Logger, Store};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp<V> {
    /// A get was performed with the given key.
    Get(String),
    /// A set was performed.
    Set {
        /// The key that was written.
        key: String,
        /// The value that was written.
        value: V,
        /// The requested expiration.
        expiration: Expiration,
    },
    /// A delete was performed with the given key.
    Delete(String),
}

impl<V> StoreOp<V> {
    /// Returns the key this operation touched.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Get(key) | Self::Delete(key) | Self::Set { key, .. } => key,
        }
    }
}

type FailPredicate<V> = Box<dyn Fn(&StoreOp<V>) -> bool + Send + Sync>;

/// A configurable mock store for testing.
///
/// Values are kept in memory; expirations are recorded but not enforced. Clones share
/// state, so a test can keep a handle for inspection after handing the store to a chain.
///
/// # Examples
///
/// ```ignore
/// use stowage_store::{Expiration, Store, testing::{MockStore, StoreOp}};
///
/// let store = MockStore::<i32>::new();
/// store.set("key", &42, Expiration::Never).await?;
/// assert_eq!(store.get("key").await?, 42);
///
/// // Fail every read of one key
/// store.fail_when(|op| matches!(op, StoreOp::Get(k) if k == "forbidden"));
/// assert!(store.get("forbidden").await.is_err());
/// ```
pub struct MockStore<V> {
    name: &'static str,
    data: Arc<Mutex<HashMap<String, V>>>,
    operations: Arc<Mutex<Vec<StoreOp<V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<V>>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    logger: Logger,
}

impl<V> std::fmt::Debug for MockStore<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl<V> Clone for MockStore<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            delay: Arc::clone(&self.delay),
            logger: self.logger.clone(),
        }
    }
}

impl<V> Default for MockStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MockStore<V> {
    /// Creates an empty mock store reporting `"mock"` as its type.
    #[must_use]
    pub fn new() -> Self {
        Self::named("mock")
    }

    /// Creates an empty mock store reporting `name` as its type.
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
            logger: Logger::default(),
        }
    }

    /// Replaces the logger of this store.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Makes every subsequent operation sleep for `delay` before completing.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the store holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Inserts a value directly, without recording an operation.
    pub fn seed(&self, key: impl Into<String>, value: V) {
        self.data.lock().insert(key.into(), value);
    }

    /// Sets a predicate that decides which operations fail.
    ///
    /// Failing operations are still recorded but do not touch the stored data.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp<V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn should_fail(&self, op: &StoreOp<V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }

    async fn wait(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl<V> MockStore<V>
where
    V: Clone,
{
    /// Returns a clone of all recorded operations, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp<V>> {
        self.operations.lock().clone()
    }

    /// Returns the stored value for `key`, bypassing the recorder.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<V> {
        self.data.lock().get(key).cloned()
    }

    fn record(&self, op: StoreOp<V>) -> Result<(), Error> {
        let failed = self.should_fail(&op);
        self.operations.lock().push(op);
        if failed {
            Err(Error::backend(format!("{}: injected failure", self.name)))
        } else {
            Ok(())
        }
    }
}

impl<V> Store<V> for MockStore<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        self.wait().await;
        self.record(StoreOp::Get(key.to_owned()))?;
        self.data.lock().get(key).cloned().ok_or(Error::KeyNotFound)
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        self.wait().await;
        self.record(StoreOp::Set {
            key: key.to_owned(),
            value: value.clone(),
            expiration,
        })?;
        self.data.lock().insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.wait().await;
        self.record(StoreOp::Delete(key.to_owned()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        self.name
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Handle to the output of a logger created by [`capture_logs`].
#[derive(Clone, Debug, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Returns everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Creates a logger that records every event, at all levels, into memory.
#[must_use]
pub fn capture_logs() -> (Logger, CapturedLogs) {
    let logs = CapturedLogs::default();
    let buffer = Arc::clone(&logs.0);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || CapturedWriter(Arc::clone(&buffer)))
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .without_time()
        .finish();
    (Logger::new(subscriber), logs)
}
