// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis-backed store for stowage.
//!
//! [`RedisStore`] keeps encoded values in a Redis server, reached through a small pool
//! of reconnecting, multiplexed connections. Use [`RedisStoreBuilder`] to configure the
//! database, credentials, retry policy, pool and timeouts.
//!
//! # Quick Start
//!
//! ```no_run
//! use stowage_redis::RedisStore;
//! use stowage_store::{Expiration, Store};
//!
//! # async fn example() -> Result<(), stowage_store::Error> {
//! let store = RedisStore::<Vec<String>>::builder("localhost:6379").connect().await?;
//!
//! store.set("tags", &vec!["fast".to_owned()], Expiration::Never).await?;
//! let tags = store.get("tags").await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
mod pool;
mod store;

#[doc(inline)]
pub use builder::RedisStoreBuilder;
#[doc(inline)]
pub use store::RedisStore;
