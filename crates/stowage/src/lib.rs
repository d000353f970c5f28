// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A uniform key-value caching abstraction over heterogeneous stores.
//!
//! Every backend implements the same [`Store`] contract: typed `get`, `set` with an
//! [`Expiration`], idempotent `delete`, a `store_type` discriminator and an injected
//! [`Logger`]. A [`Chain`] aggregates several stores into one, reading with fallback
//! in a fixed order and writing to all members concurrently.
//!
//! # Backends
//!
//! | Store             | Feature    | Keeps          | `store_type`  |
//! |-------------------|------------|----------------|---------------|
//! | [`MemoryStore`]   | `memory`   | encoded bytes  | `"memory"`    |
//! | [`AdmissionStore`]| `memory`   | native values  | `"ristretto"` |
//! | `RedisStore`      | `redis`    | encoded bytes  | `"redis"`     |
//! | `MemcacheStore`   | `memcache` | encoded bytes  | `"memcache"`  |
//! | `DocumentStore`   | `mongodb`  | encoded bytes  | `"mongodb"`   |
//!
//! The `memory` feature is enabled by default. `test-util` exposes
//! [`testing::MockStore`](stowage_store::testing::MockStore) for exercising code that
//! depends on a store.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use stowage::{AdmissionStore, Chain, Expiration, MemoryStore, Store};
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//!
//! let chain = Chain::builder()
//!     .store(AdmissionStore::<String>::new())
//!     .store(MemoryStore::<String>::new())
//!     .build();
//!
//! chain.set("user:42", &"Ada".to_owned(), Duration::from_secs(60).into()).await?;
//! assert_eq!(chain.get("user:42").await?, "Ada");
//!
//! chain.delete("user:42").await?;
//! assert!(chain.get("user:42").await.unwrap_err().is_not_found());
//! # Ok::<(), stowage::Error>(())
//! # }).unwrap();
//! ```
//!
//! # Deadlines
//!
//! Stores impose no deadline of their own beyond their drivers' timeouts. Bound a call
//! by wrapping it, e.g. in `tokio::time::timeout`; dropping the chain future cancels
//! every member operation in flight.

mod chain;

#[doc(inline)]
pub use chain::{Chain, ChainBuilder};
#[doc(inline)]
pub use stowage_store::{
    BoxError, Codec, DynamicStore, Error, Expiration, JsonCodec, Logger, NO_EXPIRATION, PostcardCodec, Result, Store,
    StoreExt,
};

#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
#[doc(inline)]
pub use stowage_memory::{AdmissionStore, AdmissionStoreBuilder, MemoryStore, MemoryStoreBuilder};

#[cfg(feature = "redis")]
#[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
#[doc(inline)]
pub use stowage_redis::{RedisStore, RedisStoreBuilder};

#[cfg(feature = "memcache")]
#[cfg_attr(docsrs, doc(cfg(feature = "memcache")))]
#[doc(inline)]
pub use stowage_memcache::{MemcacheStore, MemcacheStoreBuilder};

#[cfg(feature = "mongodb")]
#[cfg_attr(docsrs, doc(cfg(feature = "mongodb")))]
#[doc(inline)]
pub use stowage_mongodb::{DocumentStore, DocumentStoreBuilder};

#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub use stowage_store::testing;
