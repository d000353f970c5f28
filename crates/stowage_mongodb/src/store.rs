// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! MongoDB store implementation.

use std::{
    future::IntoFuture,
    marker::PhantomData,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use mongodb::{
    Collection,
    bson::{Binary, doc, spec::BinarySubtype},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use stowage_store::{Codec, Error, Expiration, Logger, PostcardCodec, Store, round_up_to_secs};

use crate::builder::DocumentStoreBuilder;

pub(crate) const STORE_TYPE: &str = "mongodb";

/// One cached value as it is kept in the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Record {
    #[serde(rename = "_id")]
    pub(crate) key: String,
    /// Unix seconds after which the record is stale. Zero means never.
    pub(crate) expired_at: i64,
    pub(crate) value: Binary,
}

/// A store keeping encoded values as documents in a MongoDB collection.
///
/// Every key is one document of the form `{ _id: key, expired_at, value }`, where `value`
/// holds the encoded bytes and `expired_at` the Unix second after which the document is
/// stale (`0` for never). MongoDB does not drop these documents on its own: a read that
/// finds a stale document deletes it and reports [`Error::KeyNotFound`]. A TTL index on
/// `expired_at` can be added to the collection to reclaim keys that are never read again.
///
/// Every operation is bounded by the operation timeout of the builder; an expired
/// timeout is reported as [`Error::Backend`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use stowage_mongodb::DocumentStore;
/// use stowage_store::{Expiration, Store};
///
/// # async fn example() -> Result<(), stowage_store::Error> {
/// let store = DocumentStore::<Vec<u32>>::builder("mongodb://localhost:27017", "app")
///     .entity("sessions")
///     .connect()
///     .await?;
///
/// store
///     .set("ids", &vec![1, 2, 3], Expiration::After(Duration::from_secs(60)))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct DocumentStore<V, C = PostcardCodec> {
    collection: Collection<Record>,
    codec: C,
    default_expiration: Duration,
    operation_timeout: Duration,
    logger: Logger,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> std::fmt::Debug for DocumentStore<V, C>
where
    C: Codec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("collection", &self.collection.name())
            .field("codec", &self.codec.name())
            .field("default_expiration", &self.default_expiration)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl<V, C> Clone for DocumentStore<V, C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            codec: self.codec.clone(),
            default_expiration: self.default_expiration,
            operation_timeout: self.operation_timeout,
            logger: self.logger.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> DocumentStore<V> {
    /// Creates a builder for a store in `database` of the deployment at `uri`.
    #[must_use]
    pub fn builder(uri: impl Into<String>, database: impl Into<String>) -> DocumentStoreBuilder<V> {
        DocumentStoreBuilder::new(uri, database)
    }
}

impl<V, C> DocumentStore<V, C> {
    pub(crate) fn from_parts(
        collection: Collection<Record>,
        codec: C,
        default_expiration: Duration,
        operation_timeout: Duration,
        logger: Logger,
    ) -> Self {
        Self {
            collection,
            codec,
            default_expiration,
            operation_timeout,
            logger,
            _value: PhantomData,
        }
    }

    /// Returns the expiration applied to writes made with [`Expiration::Default`].
    #[must_use]
    pub fn default_expiration(&self) -> Duration {
        self.default_expiration
    }

    /// Returns the name of the collection holding the records.
    #[must_use]
    pub fn entity(&self) -> &str {
        self.collection.name()
    }

    fn log_failure(&self, operation: &'static str, key: &str, error: &Error) {
        self.logger
            .in_scope(|| tracing::warn!(store = STORE_TYPE, key, %error, "{operation} failed"));
    }

    async fn bounded<T, F>(&self, action: F) -> Result<T, Error>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        tokio::time::timeout(self.operation_timeout, action)
            .await
            .map_err(Error::backend)?
            .map_err(Error::backend)
    }
}

impl<V, C> Store<V> for DocumentStore<V, C>
where
    V: Serialize + DeserializeOwned + Send + Sync,
    C: Codec,
{
    async fn get(&self, key: &str) -> Result<V, Error> {
        let found = self
            .bounded(self.collection.find_one(doc! { "_id": key }))
            .await
            .inspect_err(|error| self.log_failure("get", key, error))?;

        let Some(record) = found else {
            self.logger
                .in_scope(|| tracing::debug!(store = STORE_TYPE, key, "get: key not found"));
            return Err(Error::KeyNotFound);
        };

        if is_stale(record.expired_at, unix_now()) {
            self.bounded(self.collection.delete_one(doc! { "_id": key }))
                .await
                .inspect_err(|error| self.log_failure("get", key, error))?;
            self.logger
                .in_scope(|| tracing::debug!(store = STORE_TYPE, key, "get: key expired"));
            return Err(Error::KeyNotFound);
        }

        self.codec
            .decode(&record.value.bytes)
            .inspect_err(|error| self.log_failure("get", key, error))
    }

    async fn set(&self, key: &str, value: &V, expiration: Expiration) -> Result<(), Error> {
        let bytes = self
            .codec
            .encode(value)
            .inspect_err(|error| self.log_failure("set", key, error))?;

        let record = Record {
            key: key.to_owned(),
            expired_at: expired_at(expiration.resolve(self.default_expiration), SystemTime::now()),
            value: Binary {
                subtype: BinarySubtype::Generic,
                bytes,
            },
        };

        self.bounded(self.collection.replace_one(doc! { "_id": key }, &record).upsert(true))
            .await
            .inspect_err(|error| self.log_failure("set", key, error))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.bounded(self.collection.delete_one(doc! { "_id": key }))
            .await
            .inspect_err(|error| self.log_failure("delete", key, error))?;
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        STORE_TYPE
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Computes the `expired_at` field for a write at `now`, rounded up to whole seconds.
pub(crate) fn expired_at(ttl: Option<Duration>, now: SystemTime) -> i64 {
    let Some(ttl) = ttl else {
        return 0;
    };

    let now = now.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    i64::try_from(round_up_to_secs(now.saturating_add(ttl))).unwrap_or(i64::MAX)
}

pub(crate) fn is_stale(expired_at: i64, now: i64) -> bool {
    expired_at != 0 && now >= expired_at
}

fn unix_now() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    i64::try_from(now.as_secs()).unwrap_or(i64::MAX)
}
