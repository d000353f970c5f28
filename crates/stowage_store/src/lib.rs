// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core store abstractions for building key-value cache backends.
//!
//! This crate defines the [`Store`] trait that every backend satisfies, along with
//! [`Expiration`] for describing entry lifetimes, [`Codec`] for turning typed values
//! into opaque bytes, [`Logger`] for injected structured logging, and the [`Error`]
//! taxonomy shared by all backends.
//!
//! # Overview
//!
//! A store is typed by the value it holds: `Store<V>` reads and writes `V` under string
//! keys. Backends that keep native objects only need `V: Clone`; backends that keep
//! bytes encode through a [`Codec`] and need `V: Serialize + DeserializeOwned`.
//! Whatever the backend natively reports for a missing key (a nil reply, a `None`, a
//! stale record) is normalized to [`Error::KeyNotFound`].
//!
//! # Implementing a Store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! use stowage_store::{Error, Expiration, Logger, Store};
//!
//! struct SimpleStore<V> {
//!     data: RwLock<HashMap<String, V>>,
//!     logger: Logger,
//! }
//!
//! impl<V> Store<V> for SimpleStore<V>
//! where
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &str) -> Result<V, Error> {
//!         self.data.read().unwrap().get(key).cloned().ok_or(Error::KeyNotFound)
//!     }
//!
//!     async fn set(&self, key: &str, value: &V, _expiration: Expiration) -> Result<(), Error> {
//!         self.data.write().unwrap().insert(key.to_owned(), value.clone());
//!         Ok(())
//!     }
//!
//!     async fn delete(&self, key: &str) -> Result<(), Error> {
//!         self.data.write().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     fn store_type(&self) -> &'static str {
//!         "simple"
//!     }
//!
//!     fn logger(&self) -> &Logger {
//!         &self.logger
//!     }
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`DynamicStore`] wraps any `Store` in a clonable, type-erased container so that
//! stores of different concrete types can sit side by side, e.g. as members of a chain.

pub mod codec;
mod dynamic;
pub mod error;
mod expiration;
mod logger;
pub(crate) mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use codec::{Codec, JsonCodec, PostcardCodec};
#[doc(inline)]
pub use dynamic::{DynamicStore, StoreExt};
#[doc(inline)]
pub use error::{BoxError, Error, Result};
#[doc(inline)]
pub use expiration::{Expiration, NO_EXPIRATION, round_up_to_secs};
#[doc(inline)]
pub use logger::{DATE_TIME_FORMAT, Logger};
#[doc(inline)]
pub use store::Store;
