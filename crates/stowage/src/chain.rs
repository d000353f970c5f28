// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Composite store with read fallback and write fan-out.
//!
//! A [`Chain`] aggregates an ordered list of stores into one logical store. Reads probe
//! the members one after another and return the first hit. Writes and deletes go to
//! every member at once and always succeed from the caller's point of view; member
//! failures are only visible in the chain's logs.

use std::fmt::Debug;

use futures::future::join_all;
use stowage_store::{DynamicStore, Error, Expiration, Logger, Store, StoreExt};

const STORE_TYPE: &str = "chain";

/// An ordered, fixed set of stores acting as one.
///
/// - `get` probes the members sequentially in construction order and stops at the
///   first success. Member failures, misses included, are logged and skipped. When no
///   member produces a value the result is [`Error::KeyNotFound`].
/// - `set` and `delete` are dispatched to all members concurrently. The chain waits
///   for every member to finish, logs each failure, and returns `Ok(())`.
///
/// Member order never changes after construction. A chain is itself a [`Store`], so
/// chains nest.
///
/// Dropping an in-flight chain future drops every member future with it; wrap calls in
/// a timeout to bound their duration.
///
/// # Examples
///
/// ```
/// use stowage::{AdmissionStore, Chain, Expiration, MemoryStore, Store};
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
///
/// let chain = Chain::builder()
///     .store(AdmissionStore::<String>::new())
///     .store(MemoryStore::<String>::new())
///     .build();
///
/// chain.set("greeting", &"hello".to_owned(), Expiration::Default).await?;
/// assert_eq!(chain.get("greeting").await?, "hello");
/// # Ok::<(), stowage_store::Error>(())
/// # }).unwrap();
/// ```
pub struct Chain<V> {
    stores: Vec<DynamicStore<V>>,
    logger: Logger,
}

impl<V> Debug for Chain<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("stores", &self.stores).finish_non_exhaustive()
    }
}

impl<V> Clone for Chain<V> {
    fn clone(&self) -> Self {
        Self {
            stores: self.stores.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<V> Chain<V> {
    /// Creates a chain over `stores`, in the given order, logging to the default logger.
    #[must_use]
    pub fn new(stores: impl IntoIterator<Item = DynamicStore<V>>) -> Self {
        Self {
            stores: stores.into_iter().collect(),
            logger: Logger::default(),
        }
    }

    /// Creates a builder for assembling a chain.
    #[must_use]
    pub fn builder() -> ChainBuilder<V> {
        ChainBuilder::new()
    }

    /// Returns the members of this chain, in probing order.
    #[must_use]
    pub fn stores(&self) -> &[DynamicStore<V>] {
        &self.stores
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns true if the chain has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    fn log_failure(&self, operation: &'static str, store: &DynamicStore<V>, key: &str, error: &Error)
    where
        V: Send + Sync,
    {
        let member = store.store_type();
        self.logger.in_scope(|| {
            if error.is_not_found() {
                tracing::debug!(store = member, key, "{operation}: member miss");
            } else {
                tracing::warn!(store = member, key, %error, "{operation}: member failed");
            }
        });
    }
}

impl<V> Store<V> for Chain<V>
where
    V: Send + Sync,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        for store in &self.stores {
            match store.get(key).await {
                Ok(value) => return Ok(value),
                Err(error) => self.log_failure("get", store, key, &error),
            }
        }

        Err(Error::KeyNotFound)
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        let results = join_all(self.stores.iter().map(|store| store.set(key, value, expiration))).await;
        for (store, result) in self.stores.iter().zip(results) {
            if let Err(error) = result {
                self.log_failure("set", store, key, &error);
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let results = join_all(self.stores.iter().map(|store| store.delete(key))).await;
        for (store, result) in self.stores.iter().zip(results) {
            if let Err(error) = result {
                self.log_failure("delete", store, key, &error);
            }
        }

        Ok(())
    }

    fn store_type(&self) -> &'static str {
        STORE_TYPE
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Builder for assembling a [`Chain`].
///
/// Members are probed in the order they are added.
///
/// # Examples
///
/// ```
/// use stowage::{Chain, MemoryStore, StoreExt};
///
/// let near = MemoryStore::<u32>::new();
/// let far = MemoryStore::<u32>::new().into_dynamic();
///
/// let chain = Chain::builder().store(near).dynamic(far).build();
/// assert_eq!(chain.len(), 2);
/// ```
pub struct ChainBuilder<V> {
    stores: Vec<DynamicStore<V>>,
    logger: Option<Logger>,
}

impl<V> Debug for ChainBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("stores", &self.stores)
            .field("logger", &self.logger)
            .finish()
    }
}

impl<V> Default for ChainBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ChainBuilder<V> {
    /// Creates a builder with no members.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stores: Vec::new(),
            logger: None,
        }
    }

    /// Appends a store to the chain.
    #[must_use]
    pub fn store<S>(self, store: S) -> Self
    where
        S: Store<V> + 'static,
    {
        self.dynamic(store.into_dynamic())
    }

    /// Appends an already type-erased store to the chain.
    #[must_use]
    pub fn dynamic(mut self, store: DynamicStore<V>) -> Self {
        self.stores.push(store);
        self
    }

    /// Sets the logger member failures are reported to. Without one, the process
    /// default is used.
    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builds the chain.
    #[must_use]
    pub fn build(self) -> Chain<V> {
        Chain {
            stores: self.stores,
            logger: self.logger.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use stowage_store::testing::{MockStore, StoreOp, capture_logs};

    use super::*;

    #[test]
    fn accessors_reflect_members() {
        let chain = Chain::builder()
            .store(MockStore::<u32>::named("first"))
            .store(MockStore::<u32>::named("second"))
            .build();

        assert_eq!(chain.len(), 2);
        assert!(!chain.is_empty());
        let types: Vec<_> = chain.stores().iter().map(Store::store_type).collect();
        assert_eq!(types, ["first", "second"]);
        assert_eq!(chain.store_type(), "chain");
    }

    #[test]
    fn new_keeps_given_order() {
        let chain = Chain::new([
            MockStore::<u32>::named("a").into_dynamic(),
            MockStore::<u32>::named("b").into_dynamic(),
        ]);
        assert_eq!(chain.stores()[0].store_type(), "a");
        assert_eq!(chain.stores()[1].store_type(), "b");
    }

    #[tokio::test]
    async fn get_stops_at_first_hit() {
        let first = MockStore::<u32>::named("first");
        let second = MockStore::<u32>::named("second");
        first.seed("key", 1);
        second.seed("key", 2);

        let chain = Chain::builder().store(first.clone()).store(second.clone()).build();

        assert_eq!(chain.get("key").await.expect("get failed"), 1);
        assert_eq!(first.operations(), [StoreOp::Get("key".to_owned())]);
        assert!(second.operations().is_empty());
    }

    #[tokio::test]
    async fn get_logs_member_failures_with_store_type() {
        let (logger, logs) = capture_logs();
        let broken = MockStore::<u32>::named("broken");
        broken.fail_when(|_| true);
        let healthy = MockStore::<u32>::named("healthy");
        healthy.seed("key", 9);

        let chain = Chain::builder().store(broken).store(healthy).logger(logger).build();

        assert_eq!(chain.get("key").await.expect("get failed"), 9);
        let output = logs.contents();
        assert!(output.contains("get: member failed"), "got: {output}");
        assert!(output.contains("broken"), "got: {output}");
        assert!(output.contains("injected failure"), "got: {output}");
    }

    #[tokio::test]
    async fn set_reaches_every_member_despite_failures() {
        let (logger, logs) = capture_logs();
        let broken = MockStore::<u32>::named("broken");
        broken.fail_when(|op| matches!(op, StoreOp::Set { .. }));
        let healthy = MockStore::<u32>::named("healthy");

        let chain = Chain::builder()
            .store(broken.clone())
            .store(healthy.clone())
            .logger(logger)
            .build();

        chain.set("key", &5, Expiration::Never).await.expect("chain set never fails");

        assert_eq!(broken.operations().len(), 1);
        assert_eq!(healthy.peek("key"), Some(5));
        assert!(logs.contents().contains("set: member failed"));
    }

    #[tokio::test]
    async fn set_forwards_expiration_unchanged() {
        let member = MockStore::<u32>::new();
        let chain = Chain::builder().store(member.clone()).build();
        let expiration = Expiration::After(std::time::Duration::from_secs(30));

        chain.set("key", &1, expiration).await.expect("set failed");

        assert_eq!(
            member.operations(),
            [StoreOp::Set {
                key: "key".to_owned(),
                value: 1,
                expiration,
            }]
        );
    }

    #[tokio::test]
    async fn empty_chain_behaves_like_an_empty_store() {
        let chain = Chain::<u32>::new([]);
        assert!(chain.is_empty());
        assert!(chain.get("key").await.expect_err("nothing to find").is_not_found());
        chain.set("key", &1, Expiration::Default).await.expect("set failed");
        chain.delete("key").await.expect("delete failed");
    }
}
