//! Integration tests for the govchain HTTP API
//!
//! These drive the router end to end: auth, ledger appends, governance votes
//! and the status codes each failure maps to.

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use govchain::api::{build_api_router, ApiContext};
use govchain::blockchain::Block;
use govchain::node::Node;
use govchain::persistence::{InMemoryPersistence, Persistence};

const KEY: &str = "test-secret";

fn test_server() -> (TestServer, InMemoryPersistence) {
    let store = InMemoryPersistence::new();
    let node = Node::open(Arc::new(store.clone())).expect("Failed to open node");
    let ctx = Arc::new(ApiContext::new(node, KEY));
    let server = TestServer::new(build_api_router(ctx)).expect("Failed to create test server");
    (server, store)
}

fn api_key() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_static(KEY),
    )
}

#[tokio::test]
async fn test_health_and_genesis() {
    let (server, _store) = test_server();

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["node_state"], "Ready");
    assert_eq!(json["height"], 1);
    assert!(json["timestamp"].is_string());

    let response = server.get("/blocks").await;
    assert_eq!(response.status_code(), 200);
    let blocks: Vec<Block> = response.json();
    assert_eq!(blocks, vec![Block::genesis()]);
}

#[tokio::test]
async fn test_mutations_require_api_key() {
    let (server, store) = test_server();

    let response = server
        .post("/addBlock")
        .json(&json!({"data": "tx1", "miner": "alice", "reward": 10.0}))
        .await;
    assert_eq!(response.status_code(), 401);
    let json: Value = response.json();
    assert_eq!(json["error"], "Unauthorized");

    let response = server
        .post("/propose")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("wrong"),
        )
        .json(&json!({"proposal": "Increase reward"}))
        .await;
    assert_eq!(response.status_code(), 401);

    assert_eq!(store.load_blocks().unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_block_extends_chain() {
    let (server, store) = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/addBlock")
        .add_header(name.clone(), value.clone())
        .json(&json!({"data": "tx1", "miner": "alice", "reward": 10.0}))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["message"], "Block added successfully");
    assert_eq!(json["persisted"], true);
    assert_eq!(json["block"]["index"], 1);
    assert_eq!(json["block"]["miner_id"], "alice");
    assert_eq!(json["block"]["prev_hash"], Block::genesis().hash_hex());

    let response = server.get("/blocks/1").await;
    assert_eq!(response.status_code(), 200);
    let block: Block = response.json();
    assert_eq!(block.hash, block.digest());

    let response = server.get("/blocks/verify").await;
    let json: Value = response.json();
    assert_eq!(json["valid"], true);
    assert_eq!(json["length"], 2);
    assert!(json["fault"].is_null());

    assert_eq!(store.load_blocks().unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_block_rejects_bad_input() {
    let (server, _store) = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/addBlock")
        .add_header(name.clone(), value.clone())
        .text("{not json")
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert_eq!(json["error"], "Invalid request body");

    let response = server
        .post("/addBlock")
        .add_header(name, value)
        .json(&json!({"data": "tx", "miner": "alice", "reward": -5.0}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server.get("/blocks/42").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_proposal_single_vote_flow() {
    let (server, _store) = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/propose")
        .add_header(name.clone(), value.clone())
        .json(&json!({"proposal": "Increase reward"}))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["message"], "Proposal created successfully");
    assert_eq!(json["proposal"]["voter"], "");
    let id = json["proposal"]["id"].as_str().unwrap().to_string();

    let response = server
        .post("/vote")
        .add_header(name.clone(), value.clone())
        .json(&json!({"proposalID": id, "voter": "bob", "approve": true}))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["message"], "Vote recorded successfully");
    assert_eq!(json["proposal"]["voter"], "bob");
    assert_eq!(json["proposal"]["approved"], true);

    let response = server
        .post("/vote")
        .add_header(name.clone(), value.clone())
        .json(&json!({"proposalID": id, "voter": "carol", "approve": false}))
        .await;
    assert_eq!(response.status_code(), 409);

    let response = server.get(&format!("/proposals/{}", id)).await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["voter"], "bob");
    assert_eq!(json["approved"], true);

    let response = server.get("/proposals").await;
    let json: Value = response.json();
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_vote_on_unknown_proposal() {
    let (server, _store) = test_server();
    let (name, value) = api_key();

    let response = server
        .post("/vote")
        .add_header(name, value)
        .json(&json!({"proposalID": "ffffffffffffffffffffffff", "voter": "bob", "approve": true}))
        .await;
    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert!(json["error"].is_string());

    let response = server.get("/proposals/ffffffffffffffffffffffff").await;
    assert_eq!(response.status_code(), 404);
}
