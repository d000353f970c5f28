// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process stores backed by moka.
//!
//! This crate provides two [`Store`](stowage_store::Store) implementations that live in
//! the memory of the current process:
//!
//! - [`MemoryStore`] encodes values to bytes and expires each entry after its own
//!   duration, with a 24 hour default. Use it when callers must never share a value
//!   instance with the cache.
//! - [`AdmissionStore`] keeps values as-is and bounds the cache by a total cost budget
//!   with frequency-based admission. Use it for hot, read-mostly data.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use stowage_memory::{AdmissionStore, MemoryStore};
//! use stowage_store::{Expiration, Store};
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//!
//! let memory = MemoryStore::<u64>::builder()
//!     .default_expiration(Duration::from_secs(60))
//!     .build()?;
//! memory.set("visits", &1, Expiration::Default).await?;
//!
//! let admission = AdmissionStore::<u64>::new();
//! admission.set("visits", &1, Expiration::Never).await?;
//!
//! assert_eq!(memory.get("visits").await?, admission.get("visits").await?);
//! # Ok::<(), stowage_store::Error>(())
//! # }).unwrap();
//! ```

pub mod admission;
mod expiry;
pub mod memory;

#[doc(inline)]
pub use admission::{AdmissionStore, AdmissionStoreBuilder};
#[doc(inline)]
pub use memory::{MemoryStore, MemoryStoreBuilder};
