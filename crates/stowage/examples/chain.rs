// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Two in-process stores chained: a hot admission store in front of a memory store.

use std::time::Duration;

use stowage::{AdmissionStore, Chain, Expiration, MemoryStore, Store};

#[tokio::main]
async fn main() {
    let hot = AdmissionStore::<String>::builder().max_cost(1 << 20).build();
    let warm = MemoryStore::<String>::builder()
        .default_expiration(Duration::from_secs(600))
        .build()
        .expect("no seeds to encode");

    let chain = Chain::builder().store(hot.clone()).store(warm.clone()).build();

    // Writes land in both members
    chain
        .set("user:42", &"Ada".to_owned(), Expiration::Default)
        .await
        .expect("chain writes never fail");
    println!("hot has user:42: {}", hot.contains_key("user:42"));
    println!("warm has user:42: {}", warm.contains_key("user:42"));

    // Losing the hot copy falls back to the warm one
    hot.delete("user:42").await.expect("delete failed");
    let name = chain.get("user:42").await.expect("warm store still has it");
    println!("after hot eviction: {name}");

    chain.delete("user:42").await.expect("chain deletes never fail");
    match chain.get("user:42").await {
        Ok(name) => println!("after delete: unexpected {name}"),
        Err(e) => println!("after delete: {e}"),
    }
}
