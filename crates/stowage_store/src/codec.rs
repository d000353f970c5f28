// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Value codecs for stores that keep opaque bytes.
//!
//! A [`Codec`] turns a typed value into bytes and back. Encoding failures are reported
//! as [`Error::Marshal`], decoding failures as [`Error::Unmarshal`]. Both codecs in this
//! module are deterministic: the same value always encodes to the same bytes.

use serde::{Serialize, de::DeserializeOwned};

use crate::Error;

/// A deterministic, type-preserving encode/decode pair.
///
/// # Examples
///
/// ```
/// use stowage_store::{Codec, PostcardCodec};
///
/// let codec = PostcardCodec;
/// let bytes = codec.encode("hello")?;
/// let back: String = codec.decode(&bytes)?;
/// assert_eq!(back, "hello");
/// # Ok::<(), stowage_store::Error>(())
/// ```
pub trait Codec: Clone + Send + Sync + 'static {
    /// Returns a short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Encodes `value` into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Marshal`] if the value cannot be represented.
    fn encode<V>(&self, value: &V) -> Result<Vec<u8>, Error>
    where
        V: Serialize + ?Sized;

    /// Decodes bytes into a `V`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unmarshal`] if the bytes do not describe a `V`.
    fn decode<V>(&self, bytes: &[u8]) -> Result<V, Error>
    where
        V: DeserializeOwned;
}

/// Compact binary encoding via `postcard`.
///
/// This is the default codec of the byte-storing stores. The format is not
/// self-describing, so values must be read back with the type they were written with.
/// Decoding consumes the whole payload: bytes left over after the target value are
/// reported as [`Error::Unmarshal`], which catches most reads with the wrong type. A
/// payload that is also a complete encoding of the target type (`1_u8` read as `true`)
/// cannot be told apart; use [`JsonCodec`] where several writers may disagree on types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostcardCodec;

impl Codec for PostcardCodec {
    fn name(&self) -> &'static str {
        "postcard"
    }

    fn encode<V>(&self, value: &V) -> Result<Vec<u8>, Error>
    where
        V: Serialize + ?Sized,
    {
        postcard::to_allocvec(value).map_err(|e| Error::Marshal(e.into()))
    }

    fn decode<V>(&self, bytes: &[u8]) -> Result<V, Error>
    where
        V: DeserializeOwned,
    {
        let (value, rest) = postcard::take_from_bytes(bytes).map_err(|e| Error::Unmarshal(e.into()))?;
        if rest.is_empty() {
            Ok(value)
        } else {
            Err(Error::Unmarshal(
                format!("{} trailing bytes after the decoded value", rest.len()).into(),
            ))
        }
    }
}

/// Self-describing text encoding via `serde_json`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<V>(&self, value: &V) -> Result<Vec<u8>, Error>
    where
        V: Serialize + ?Sized,
    {
        serde_json::to_vec(value).map_err(|e| Error::Marshal(e.into()))
    }

    fn decode<V>(&self, bytes: &[u8]) -> Result<V, Error>
    where
        V: DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(|e| Error::Unmarshal(e.into()))
    }
}
