// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! MongoDB-backed store for stowage.
//!
//! [`DocumentStore`] keeps one document per key in a collection (`caches` unless
//! configured otherwise). Expiration is recorded in the document and checked on read,
//! where stale documents are removed.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use stowage_mongodb::DocumentStore;
//! use stowage_store::{Expiration, Store};
//!
//! # async fn example() -> Result<(), stowage_store::Error> {
//! let store = DocumentStore::<String>::builder("mongodb://localhost:27017", "app")
//!     .ping_timeout(Duration::from_secs(5))
//!     .default_expiration(Duration::from_secs(3600))
//!     .connect()
//!     .await?;
//!
//! store.set("greeting", &"hello".to_owned(), Expiration::Default).await?;
//! assert_eq!(store.get("greeting").await?, "hello");
//! # Ok(())
//! # }
//! ```

mod builder;
mod store;

#[doc(inline)]
pub use builder::{DEFAULT_ENTITY, DEFAULT_OPERATION_TIMEOUT, DEFAULT_PING_TIMEOUT, DocumentStoreBuilder};
#[doc(inline)]
pub use store::DocumentStore;
