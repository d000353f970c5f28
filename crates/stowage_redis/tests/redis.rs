// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `RedisStore` against a live server.
//!
//! Run with `cargo test -p stowage_redis -- --ignored` while a server listens on
//! `localhost:6379`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stowage_redis::RedisStore;
use stowage_store::{Error, Expiration, Store};

const ADDRESS: &str = "localhost:6379";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Courier {
    alias: String,
    name: String,
    rating: u8,
    tracking: Option<String>,
}

fn courier() -> Courier {
    Courier {
        alias: "jt".to_owned(),
        name: "J&T".to_owned(),
        rating: 5,
        tracking: None,
    }
}

async fn store<V>() -> RedisStore<V> {
    RedisStore::builder(ADDRESS)
        .db(15)
        .connect()
        .await
        .expect("a redis server should be reachable")
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn struct_round_trips() {
    let store = store::<Courier>().await;
    store.set("stowage:courier", &courier(), Expiration::Never).await.expect("set failed");
    assert_eq!(store.get("stowage:courier").await.expect("get failed"), courier());
    store.delete("stowage:courier").await.expect("delete failed");
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn missing_key_is_not_found() {
    let store = store::<String>().await;
    let error = store.get("stowage:never-written").await.expect_err("get should fail");
    assert!(error.is_not_found());
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn entries_expire() {
    let store = store::<bool>().await;
    store
        .set("stowage:flag", &true, Duration::from_millis(200).into())
        .await
        .expect("set failed");
    assert!(store.get("stowage:flag").await.expect("get failed"));

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(store.get("stowage:flag").await.expect_err("should have expired").is_not_found());
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn delete_is_idempotent() {
    let store = store::<u32>().await;
    store.set("stowage:counter", &1, Expiration::Default).await.expect("set failed");
    store.delete("stowage:counter").await.expect("delete failed");
    store.delete("stowage:counter").await.expect("second delete failed");
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn payload_of_another_type_is_an_unmarshal_error() {
    let writer = store::<String>().await;
    writer
        .set("stowage:shape", &"courier".to_owned(), Expiration::Never)
        .await
        .expect("set failed");

    let reader = store::<u64>().await;
    let error = reader.get("stowage:shape").await.expect_err("shape mismatch");
    assert!(matches!(error, Error::Unmarshal(_)));
    reader.delete("stowage:shape").await.expect("delete failed");
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn pooled_connections_serve_every_command() {
    let store = RedisStore::<u32>::builder(ADDRESS)
        .db(15)
        .pool_size(3)
        .min_idle_conns(2)
        .max_conn_age(Duration::from_millis(50))
        .pool_timeout(Duration::from_secs(2))
        .write_timeout(Duration::from_secs(2))
        .connect()
        .await
        .expect("a redis server should be reachable");

    for round in 0..9_u32 {
        let key = format!("stowage:pooled:{round}");
        store.set(&key, &round, Expiration::Never).await.expect("set failed");
        assert_eq!(store.get(&key).await.expect("get failed"), round);
        store.delete(&key).await.expect("delete failed");
        if round == 4 {
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
    }
}

#[tokio::test]
async fn unreachable_server_is_a_backend_error() {
    let result = RedisStore::<u32>::builder("127.0.0.1:1")
        .dial_timeout(Duration::from_millis(200))
        .max_retries(1)
        .connect()
        .await;

    assert!(matches!(result, Err(Error::Backend(_))));
}
