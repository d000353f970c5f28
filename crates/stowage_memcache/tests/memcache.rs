// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `MemcacheStore` against a live server.
//!
//! Run with `cargo test -p stowage_memcache -- --ignored` while memcached listens on
//! `localhost:11211`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stowage_memcache::MemcacheStore;
use stowage_store::{Error, Expiration, Store};

const SERVER: &str = "localhost:11211";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DeliveryService {
    id: String,
    code: String,
    name: String,
    estimated_delivery_time: String,
}

fn delivery_service() -> DeliveryService {
    DeliveryService {
        id: "jt_standard".to_owned(),
        code: "DOM123".to_owned(),
        name: "Standard Delivery (1-3 days)".to_owned(),
        estimated_delivery_time: "1 - 3 Working Days".to_owned(),
    }
}

async fn store<V>() -> MemcacheStore<V> {
    MemcacheStore::builder(SERVER)
        .timeout(Duration::from_secs(1))
        .connect()
        .await
        .expect("a memcached server should be reachable")
}

#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn struct_round_trips() {
    let store = store::<DeliveryService>().await;
    store
        .set("stowage_service", &delivery_service(), Expiration::Never)
        .await
        .expect("set failed");
    assert_eq!(store.get("stowage_service").await.expect("get failed"), delivery_service());
}

#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn missing_key_is_not_found() {
    let store = store::<String>().await;
    assert!(store.get("stowage_absent").await.expect_err("get should fail").is_not_found());
}

#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn entries_expire_after_whole_seconds() {
    let store = store::<bool>().await;
    store
        .set("stowage_flag", &true, Duration::from_millis(100).into())
        .await
        .expect("set failed");
    assert!(store.get("stowage_flag").await.expect("get failed"));

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert!(store.get("stowage_flag").await.expect_err("should have expired").is_not_found());
}

#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn deleting_a_missing_key_succeeds() {
    let store = store::<u32>().await;
    store.delete("stowage_never_written").await.expect("delete failed");
}

#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn payload_of_another_type_is_an_unmarshal_error() {
    let writer = store::<bool>().await;
    writer.set("stowage_shape", &true, Expiration::Never).await.expect("set failed");

    let reader = store::<DeliveryService>().await;
    let error = reader.get("stowage_shape").await.expect_err("shape mismatch");
    assert!(matches!(error, Error::Unmarshal(_)));
}
