// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic store wrapper for type erasure.

use std::{fmt::Debug, sync::Arc};

use crate::{Error, Expiration, Logger, Store, store::DynStore};

/// Extension trait for converting any `Store` into a `DynamicStore`.
///
/// This trait is automatically implemented for all types that implement `Store`.
///
/// # Examples
///
/// ```
/// use stowage_store::{DynamicStore, Store, StoreExt};
///
/// fn erase<S>(store: S) -> DynamicStore<String>
/// where
///     S: Store<String> + 'static,
/// {
///     store.into_dynamic()
/// }
/// ```
pub trait StoreExt<V>: Sized {
    /// Converts this store into a `DynamicStore`.
    fn into_dynamic(self) -> DynamicStore<V>;
}

impl<V, S> StoreExt<V> for S
where
    S: Store<V> + 'static,
{
    fn into_dynamic(self) -> DynamicStore<V> {
        DynamicStore::new(self)
    }
}

/// A clonable, type-erased store.
///
/// `DynamicStore` wraps a trait object in an `Arc`, so clones share the same
/// underlying backend. Use it wherever stores of different concrete types must be
/// held together.
pub struct DynamicStore<V>(Arc<DynStore<'static, V>>);

impl<V> DynamicStore<V> {
    pub(crate) fn new<S>(store: S) -> Self
    where
        S: Store<V> + Send + Sync + 'static,
    {
        Self(DynStore::new_arc(store))
    }
}

impl<V> Debug for DynamicStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DynamicStore").field(&self.0.store_type()).finish()
    }
}

impl<V> Clone for DynamicStore<V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<V> Store<V> for DynamicStore<V>
where
    V: Send + Sync,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        self.0.set(key, value, expiration).await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.0.delete(key).await
    }

    fn store_type(&self) -> &'static str {
        self.0.store_type()
    }

    fn logger(&self) -> &Logger {
        self.0.logger()
    }
}
