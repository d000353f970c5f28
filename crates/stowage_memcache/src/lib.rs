// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Memcached-backed store for stowage.
//!
//! [`MemcacheStore`] spreads keys over one or more memcached servers and keeps values
//! JSON-encoded by default. The `memcache` client is synchronous, so every command runs
//! on the blocking thread pool of the current Tokio runtime.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use stowage_memcache::MemcacheStore;
//! use stowage_store::{Expiration, Store};
//!
//! # async fn example() -> Result<(), stowage_store::Error> {
//! let store = MemcacheStore::<String>::builder("localhost:11211")
//!     .server("localhost:11212")
//!     .max_idle_conns(4)
//!     .timeout(Duration::from_millis(500))
//!     .connect()
//!     .await?;
//!
//! store.set("greeting", &"hello".to_owned(), Expiration::Default).await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod store;

#[doc(inline)]
pub use builder::MemcacheStoreBuilder;
#[doc(inline)]
pub use store::{MAX_RELATIVE_EXPIRATION, MemcacheStore};
