// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `MockStore` for testing: record operations, inject failures, observe chain logs.

use stowage::testing::{MockStore, StoreOp, capture_logs};
use stowage::{Chain, Expiration, Store};

#[tokio::main]
async fn main() {
    let (logger, logs) = capture_logs();
    let flaky = MockStore::<i32>::named("flaky");
    let backup = MockStore::<i32>::named("backup");
    let chain = Chain::builder()
        .store(flaky.clone())
        .store(backup.clone())
        .logger(logger)
        .build();

    // Inject failures for every write to the first member
    flaky.fail_when(|op| matches!(op, StoreOp::Set { .. }));
    chain.set("key", &42, Expiration::Never).await.expect("chain writes never fail");

    println!("flaky operations: {:?}", flaky.operations());
    println!("backup holds: {:?}", backup.peek("key"));
    print!("chain logs:\n{}", logs.contents());

    // Reads fall through the empty member
    let value = chain.get("key").await.expect("backup has the value");
    println!("read through chain: {value}");
}
