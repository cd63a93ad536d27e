//! Full lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `Dbiler`
//! operation over real HTTP through the default `UreqTransport`. Validates
//! that form encoding, JSON-in-field arguments and envelope parsing agree
//! with the server end to end.

use std::net::SocketAddr;
use std::time::Duration;

use dbiler_core::{ClientConfig, Dbiler};
use serde::Deserialize;
use serde_json::{json, Value};

const SECRET: &str = "integration-secret";

#[derive(Debug, Deserialize, PartialEq)]
struct Person {
    name: String,
    age: u32,
}

/// Start the mock server on its own runtime and thread; returns its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, SECRET).await
        })
        .unwrap();
    });
    addr
}

fn config(addr: SocketAddr, secret: &str) -> ClientConfig {
    ClientConfig::new(format!("http://{addr}/"), secret, "people").with_timeout(Duration::from_secs(10))
}

#[tokio::test(flavor = "multi_thread")]
async fn crud_lifecycle() {
    let addr = start_server();
    let db = Dbiler::connect(config(addr, SECRET));

    // Step 1: empty database.
    let people: Vec<Value> = db.find(&json!({}), &json!({})).await;
    assert!(people.is_empty(), "expected empty database");
    assert_eq!(db.count(&json!({})).await, 0);

    // Step 2: insert three documents.
    let ada = db.insert(&json!({"name": "Ada", "age": 36})).await.expect("insert Ada");
    db.insert(&json!({"name": "Alan", "age": 41})).await.expect("insert Alan");
    db.insert(&json!({"name": "Grace", "age": 85, "tags": ["navy", "cobol"]}))
        .await
        .expect("insert Grace");
    assert_eq!(db.count(&json!({})).await, 3);

    // Step 3: find with a filter and typed results.
    let over_40: Vec<Person> = db.find(&json!({"age": {"$gt": 40}}), &json!({"name": 1, "age": 1})).await;
    assert_eq!(over_40.len(), 2);
    assert!(over_40.iter().all(|p| p.age > 40));

    // Step 4: find one by id, with projection.
    let found: Option<Value> = db.find_one(&json!({"_id": ada}), &json!({"name": 1})).await;
    assert_eq!(found, Some(json!({"_id": ada, "name": "Ada"})));

    // Step 5: find one with no match.
    let missing: Option<Person> = db.find_one(&json!({"name": "Nobody"}), &json!({})).await;
    assert_eq!(missing, None);

    // Step 6: update a single document.
    let updated = db
        .update(&json!({"name": "Ada"}), &json!({"$set": {"age": 37}}), &json!({}))
        .await;
    assert_eq!(updated, 1);
    let ada_doc: Option<Person> = db.find_one(&json!({"name": "Ada"}), &json!({})).await;
    assert_eq!(ada_doc, Some(Person { name: "Ada".to_string(), age: 37 }));

    // Step 7: update many.
    let updated = db
        .update(&json!({}), &json!({"$inc": {"age": 1}}), &json!({"multi": true}))
        .await;
    assert_eq!(updated, 3);

    // Step 8: remove one, then the rest.
    assert_eq!(db.remove(&json!({"name": "Alan"}), &json!({})).await, 1);
    assert_eq!(db.count(&json!({})).await, 2);
    assert_eq!(db.remove(&json!({}), &json!({"multi": true})).await, 2);

    // Step 9: save.
    assert!(db.save().await);

    // Step 10: empty again.
    let people: Vec<Value> = db.find(&json!({}), &json!({})).await;
    assert!(people.is_empty(), "expected empty database after remove");
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_secret_resolves_to_defaults() {
    let addr = start_server();
    let db = Dbiler::connect(config(addr, "not-the-secret"));

    assert_eq!(db.insert(&json!({"name": "Eve"})).await, None);
    assert_eq!(db.count(&json!({})).await, 0);
    assert!(!db.save().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_resolves_to_defaults() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let db = Dbiler::connect(config(addr, SECRET));

    let docs: Vec<Value> = db.find(&json!({}), &json!({})).await;
    assert!(docs.is_empty());
    assert_eq!(db.update(&json!({}), &json!({}), &json!({})).await, 0);
    assert!(!db.save().await);
}

/// Eight documents of 1.5 MB each; the `find` reply is well past 10 MB.
async fn insert_bulky_docs(db: &Dbiler) {
    let filler = "x".repeat(1_500_000);
    for i in 0..8 {
        db.insert(&json!({"i": i, "filler": filler}))
            .await
            .expect("insert bulky document");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn large_reply_is_returned_whole() {
    let addr = start_server();
    let db = Dbiler::connect(config(addr, SECRET));
    insert_bulky_docs(&db).await;

    assert_eq!(db.count(&json!({})).await, 8);
    let docs: Vec<Value> = db.find(&json!({}), &json!({})).await;
    assert_eq!(docs.len(), 8);
    assert!(docs.iter().all(|d| d["filler"].as_str().map(str::len) == Some(1_500_000)));
}

#[tokio::test(flavor = "multi_thread")]
async fn reply_over_configured_limit_resolves_to_default() {
    let addr = start_server();
    let db = Dbiler::connect(config(addr, SECRET).with_response_limit(1_000_000));
    insert_bulky_docs(&db).await;

    assert_eq!(db.count(&json!({})).await, 8);
    let docs: Vec<Value> = db.find(&json!({}), &json!({})).await;
    assert!(docs.is_empty());
}
