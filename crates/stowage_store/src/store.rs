// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for key-value store backends.
//!
//! [`Store`] defines the interface that all backends must implement. It is designed
//! for composition: a chain of stores is itself a store.

use crate::{Error, Expiration, Logger};

/// Trait for key-value store implementations.
///
/// All five methods are required. The async operations must be safe to call
/// concurrently from many tasks, since a chain fans writes out to its members and
/// independent callers may hit the same member at the same time.
///
/// # Contract
///
/// - `get` returns [`Error::KeyNotFound`] when no live entry exists, and
///   [`Error::Unmarshal`] when the stored payload cannot be decoded into `V`.
/// - `set` replaces any previous value and expiration. [`Expiration::Default`] applies
///   the store's configured default. Encoding failures surface as [`Error::Marshal`].
/// - `delete` is idempotent: removing an absent key succeeds.
/// - `store_type` is a stable discriminator for diagnostics only.
/// - `logger` returns the logger the store reports through.
#[dynosaur::dynosaur(pub(crate) DynStore = dyn(box) Store, bridge(none))]
pub trait Store<V>: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<V, Error>> + Send;

    /// Writes `value` under `key` with the given expiration.
    fn set(&self, key: &str, value: &V, expiration: Expiration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes `key` if present.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the backend discriminator, e.g. `"memory"` or `"redis"`.
    fn store_type(&self) -> &'static str;

    /// Returns the effective logger of this store.
    fn logger(&self) -> &Logger;
}
