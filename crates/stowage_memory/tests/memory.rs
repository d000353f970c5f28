// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `MemoryStore`.

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};
use stowage_memory::MemoryStore;
use stowage_store::{Error, Expiration, JsonCodec, NO_EXPIRATION, Store, testing::capture_logs};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Parcel {
    id: String,
    weight_grams: u32,
    fragile: bool,
    dimensions: [u16; 3],
    courier: Option<Box<Courier>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Courier {
    alias: String,
    rating: f32,
}

fn parcel() -> Parcel {
    Parcel {
        id: "pkg-0042".to_owned(),
        weight_grams: 1250,
        fragile: true,
        dimensions: [38, 15, 20],
        courier: Some(Box::new(Courier {
            alias: "jt".to_owned(),
            rating: 4.5,
        })),
    }
}

#[tokio::test]
async fn string_round_trips() {
    let store = MemoryStore::<String>::new();
    store
        .set("greeting", &"Hello world".to_owned(), Expiration::Default)
        .await
        .expect("set failed");
    assert_eq!(store.get("greeting").await.expect("get failed"), "Hello world");
}

#[tokio::test]
async fn bool_round_trips() {
    let store = MemoryStore::<bool>::new();
    store.set("flag", &true, Expiration::Default).await.expect("set failed");
    assert!(store.get("flag").await.expect("get failed"));
}

#[tokio::test]
async fn nested_struct_round_trips() {
    let store = MemoryStore::<Parcel>::new();
    store.set("parcel", &parcel(), Expiration::Never).await.expect("set failed");
    assert_eq!(store.get("parcel").await.expect("get failed"), parcel());
}

#[tokio::test]
async fn json_codec_round_trips() {
    let store = MemoryStore::<Parcel>::builder().codec(JsonCodec).build().expect("build failed");
    store.set("parcel", &parcel(), Expiration::Never).await.expect("set failed");
    assert_eq!(store.get("parcel").await.expect("get failed"), parcel());
}

#[tokio::test]
async fn reads_return_independent_copies() {
    let store = MemoryStore::<Parcel>::new();
    let mut original = parcel();
    store.set("parcel", &original, Expiration::Never).await.expect("set failed");

    original.weight_grams = 1;
    let stored = store.get("parcel").await.expect("get failed");
    assert_eq!(stored.weight_grams, 1250);
}

#[tokio::test]
async fn missing_key_is_not_found() {
    let store = MemoryStore::<String>::new();
    let error = store.get("missing").await.expect_err("get should fail");
    assert!(error.is_not_found());
}

#[tokio::test]
async fn set_overwrites_previous_value() {
    let store = MemoryStore::<u32>::new();
    store.set("key", &1, Expiration::Never).await.expect("set failed");
    store.set("key", &2, Expiration::Never).await.expect("set failed");
    assert_eq!(store.get("key").await.expect("get failed"), 2);
}

#[tokio::test]
async fn entry_expires_after_requested_duration() {
    let store = MemoryStore::<String>::new();
    store
        .set("key", &"value".to_owned(), Duration::from_millis(100).into())
        .await
        .expect("set failed");
    assert!(store.get("key").await.is_ok());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let error = store.get("key").await.expect_err("entry should have expired");
    assert!(error.is_not_found());
}

#[tokio::test]
async fn default_expiration_applies_to_default_writes() {
    let store = MemoryStore::<u32>::builder()
        .default_expiration(Duration::from_millis(100))
        .build()
        .expect("build failed");
    store.set("default", &1, Expiration::Default).await.expect("set failed");
    store.set("never", &2, Expiration::Never).await.expect("set failed");

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(store.get("default").await.expect_err("should have expired").is_not_found());
    assert_eq!(store.get("never").await.expect("get failed"), 2);
}

#[tokio::test]
async fn zero_default_expiration_never_expires() {
    let store = MemoryStore::<u32>::builder()
        .default_expiration(NO_EXPIRATION)
        .build()
        .expect("build failed");
    store.set("key", &1, Expiration::Default).await.expect("set failed");
    store.set("zero", &2, NO_EXPIRATION.into()).await.expect("set failed");

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.get("key").await.expect("get failed"), 1);
    assert_eq!(store.get("zero").await.expect("get failed"), 2);
}

#[tokio::test]
async fn overwrite_replaces_expiration() {
    let store = MemoryStore::<u32>::new();
    store
        .set("key", &1, Expiration::After(Duration::from_millis(100)))
        .await
        .expect("set failed");
    store.set("key", &2, Expiration::Never).await.expect("set failed");

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(store.get("key").await.expect("get failed"), 2);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = MemoryStore::<u32>::new();
    store.set("key", &1, Expiration::Never).await.expect("set failed");

    store.delete("key").await.expect("delete failed");
    store.delete("key").await.expect("second delete failed");
    store.delete("never-written").await.expect("delete of absent key failed");

    assert!(store.get("key").await.expect_err("key was deleted").is_not_found());
}

#[tokio::test]
async fn seeded_entries_are_readable() {
    let store = MemoryStore::<String>::builder()
        .seed("a", "alpha".to_owned())
        .seed_items([("b", "beta".to_owned())])
        .build()
        .expect("build failed");

    assert_eq!(store.get("a").await.expect("get failed"), "alpha");
    assert_eq!(store.get("b").await.expect("get failed"), "beta");
}

#[tokio::test]
async fn unencodable_value_is_a_marshal_error() {
    let store = MemoryStore::<BTreeMap<Vec<u8>, String>>::builder()
        .codec(JsonCodec)
        .build()
        .expect("build failed");
    let mut value = BTreeMap::new();
    value.insert(vec![1_u8, 2], "json object keys must be strings".to_owned());

    let error = store.set("key", &value, Expiration::Never).await.expect_err("set should fail");
    assert!(matches!(error, Error::Marshal(_)));
    assert!(!store.contains_key("key"));
}

#[tokio::test]
async fn misses_are_logged_to_the_injected_logger() {
    let (logger, logs) = capture_logs();
    let store = MemoryStore::<u32>::builder().logger(logger).build().expect("build failed");

    let _ = store.get("absent").await;

    let output = logs.contents();
    assert!(output.contains("key not found"), "got: {output}");
    assert!(output.contains("absent"), "got: {output}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_access_is_safe() {
    let store = MemoryStore::<u64>::new();

    let tasks: Vec<_> = (0..16_u64)
        .map(|task| {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..100_u64 {
                    let key = format!("{task}-{i}");
                    store.set(&key, &(task * i), Expiration::Never).await.expect("set failed");
                    assert_eq!(store.get(&key).await.expect("get failed"), task * i);
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.expect("task panicked");
    }

    assert_eq!(store.entry_count(), 1600);
}

#[test]
fn store_type_is_memory() {
    assert_eq!(MemoryStore::<u32>::new().store_type(), "memory");
}
