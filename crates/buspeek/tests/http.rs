// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the buspeek HTTP API.
//!
//! Uses `axum_test::TestServer` over the in-memory broker.

use std::sync::{Arc, OnceLock};

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use base64::Engine;

use buspeek::broker::memory::{MemoryBroker, NewMessage};
use buspeek::config::Config;
use buspeek::error::ErrorResponse;
use buspeek::message::{Message, QueueCount};
use buspeek::transit::{seal, KeyVault, CREDENTIAL_HEADER};
use buspeek::transport::http::{CountResponse, HealthResponse, PublicKeyResponse};

const TENANT_CONNECTION_STRING: &str =
    "Endpoint=sb://tenant-b.servicebus.windows.net/;SharedAccessKeyName=reader;SharedAccessKey=s3cret";

/// One vault for the whole test binary so the keypair is generated once.
fn vault() -> Arc<KeyVault> {
    static VAULT: OnceLock<Arc<KeyVault>> = OnceLock::new();
    Arc::clone(VAULT.get_or_init(|| Arc::new(KeyVault::new())))
}

fn test_config(namespace: Option<&str>) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        fixture: None,
        connection_string: None,
        alt_connection_string: None,
        namespace: namespace.map(str::to_owned),
        latest_batch_size: 100,
        latest_scan_ceiling: 5000,
        peek_timeout_ms: 5000,
        log_format: "text".into(),
        log_level: "info".into(),
    }
}

/// Ambient namespace "orders-ns" holds `orders` 1..=25 and an empty `idle`;
/// namespace "tenant-b" (reachable only by credential) holds `audit` 1..=3.
fn broker() -> anyhow::Result<MemoryBroker> {
    let broker = MemoryBroker::new();
    broker.create_entity("orders-ns", "orders");
    broker.create_entity("orders-ns", "idle");
    for i in 1..=25 {
        broker.enqueue("orders-ns", "orders", NewMessage::text(format!("order {i}")))?;
    }
    broker.create_entity("tenant-b", "audit");
    for i in 1..=3 {
        broker.enqueue("tenant-b", "audit", NewMessage::text(format!("audit {i}")))?;
    }
    Ok(broker)
}

fn test_server_with(config: Config) -> anyhow::Result<TestServer> {
    let router = buspeek::build_app(&config, Arc::new(broker()?), vault());
    TestServer::new(router)
}

fn test_server() -> anyhow::Result<TestServer> {
    test_server_with(test_config(Some("orders-ns")))
}

fn credential_header() -> HeaderName {
    HeaderName::from_static(CREDENTIAL_HEADER)
}

async fn sealed(server: &TestServer, plaintext: &str) -> anyhow::Result<HeaderValue> {
    let key: PublicKeyResponse = server.get("/publicKey").await.json();
    Ok(HeaderValue::from_str(&seal(plaintext, &key.public_key)?)?)
}

fn seqs(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(|m| m.sequence_number).collect()
}

// -- Health / public key ------------------------------------------------------

#[tokio::test]
async fn health_reports_running() -> anyhow::Result<()> {
    let server = test_server()?;
    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: HealthResponse = resp.json();
    assert_eq!(body.status, "running");
    Ok(())
}

#[tokio::test]
async fn public_key_is_stable_spki_pem() -> anyhow::Result<()> {
    let server = test_server()?;
    let first: PublicKeyResponse = server.get("/publicKey").await.json();
    let second: PublicKeyResponse = server.get("/publicKey").await.json();
    assert!(first.public_key.starts_with("-----BEGIN PUBLIC KEY-----"));
    assert!(first.public_key.trim_end().ends_with("-----END PUBLIC KEY-----"));
    assert_eq!(first.public_key, second.public_key);
    Ok(())
}

// -- Messages -----------------------------------------------------------------

#[tokio::test]
async fn forward_pages_walk_the_backlog() -> anyhow::Result<()> {
    let server = test_server()?;

    let resp = server
        .get("/messages")
        .add_query_param("entityPath", "orders")
        .add_query_param("count", 20)
        .await;
    resp.assert_status_ok();
    let first: Vec<Message> = resp.json();
    assert_eq!(seqs(&first), (1..=20).collect::<Vec<_>>());

    let second: Vec<Message> = server
        .get("/messages")
        .add_query_param("entityPath", "orders")
        .add_query_param("count", 20)
        .add_query_param("fromSequenceNumber", 21)
        .await
        .json();
    assert_eq!(seqs(&second), vec![21, 22, 23, 24, 25]);
    Ok(())
}

#[tokio::test]
async fn latest_returns_newest_first() -> anyhow::Result<()> {
    let server = test_server()?;
    let page: Vec<Message> = server
        .get("/messages")
        .add_query_param("entityPath", "orders")
        .add_query_param("count", 5)
        .add_query_param("latest", "true")
        .await
        .json();
    assert_eq!(seqs(&page), vec![25, 24, 23, 22, 21]);
    Ok(())
}

#[tokio::test]
async fn count_defaults_to_ten() -> anyhow::Result<()> {
    let server = test_server()?;
    let page: Vec<Message> =
        server.get("/messages").add_query_param("entityPath", "orders").await.json();
    assert_eq!(seqs(&page), (1..=10).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn latest_other_than_true_is_forward() -> anyhow::Result<()> {
    let server = test_server()?;
    let page: Vec<Message> = server
        .get("/messages")
        .add_query_param("entityPath", "orders")
        .add_query_param("count", 3)
        .add_query_param("latest", "yes")
        .await
        .json();
    assert_eq!(seqs(&page), vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn message_wire_format() -> anyhow::Result<()> {
    let server = test_server()?;
    let resp = server
        .get("/messages")
        .add_query_param("entityPath", "orders")
        .add_query_param("count", 1)
        .await;
    let body: serde_json::Value = resp.json();
    let first = &body[0];
    assert_eq!(first["sequenceNumber"], 1);
    assert_eq!(first["body"], "order 1");
    assert_eq!(first["subject"], "");
    assert_eq!(first["correlationId"], "");
    assert!(first["messageId"].is_string());
    assert!(first["enqueuedTime"].is_string());
    assert!(first["applicationProperties"].is_object());
    Ok(())
}

#[tokio::test]
async fn zero_and_negative_counts_are_empty() -> anyhow::Result<()> {
    let server = test_server()?;
    for count in ["0", "-3"] {
        let page: Vec<Message> = server
            .get("/messages")
            .add_query_param("entityPath", "orders")
            .add_query_param("count", count)
            .await
            .json();
        assert!(page.is_empty(), "count={count}");
    }
    Ok(())
}

#[tokio::test]
async fn empty_entity_and_cursor_past_tail_are_empty() -> anyhow::Result<()> {
    let server = test_server()?;
    let idle: Vec<Message> =
        server.get("/messages").add_query_param("entityPath", "idle").await.json();
    assert!(idle.is_empty());

    let past: Vec<Message> = server
        .get("/messages")
        .add_query_param("entityPath", "orders")
        .add_query_param("fromSequenceNumber", 1000)
        .await
        .json();
    assert!(past.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_query_is_bad_request() -> anyhow::Result<()> {
    let server = test_server()?;
    let cases: [&[(&str, &str)]; 4] = [
        &[("count", "5")],
        &[("entityPath", "")],
        &[("entityPath", "orders"), ("count", "ten")],
        &[("entityPath", "orders"), ("fromSequenceNumber", "x")],
    ];
    for params in cases {
        let mut req = server.get("/messages");
        for &(key, value) in params {
            req = req.add_query_param(key, value);
        }
        let resp = req.await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = resp.json();
        assert_eq!(body.code, "BAD_REQUEST", "params={params:?}");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_entity_is_broker_error() -> anyhow::Result<()> {
    let server = test_server()?;
    let resp = server.get("/messages").add_query_param("entityPath", "ghost").await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = resp.json();
    assert_eq!(body.error, "Failed to fetch messages");
    assert_eq!(body.code, "BROKER_ERROR");
    assert!(body.detail.unwrap_or_default().contains("ghost"));
    Ok(())
}

#[tokio::test]
async fn unconfigured_ambient_is_broker_error() -> anyhow::Result<()> {
    let server = test_server_with(test_config(None))?;
    let resp = server.get("/messages").add_query_param("entityPath", "orders").await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = resp.json();
    assert!(body.detail.unwrap_or_default().contains("SERVICE_BUS_NAMESPACE"));
    Ok(())
}

// -- Credential transit -------------------------------------------------------

#[tokio::test]
async fn sealed_credential_selects_its_namespace() -> anyhow::Result<()> {
    let server = test_server()?;
    let header = sealed(&server, TENANT_CONNECTION_STRING).await?;

    let resp = server
        .get("/messages")
        .add_query_param("entityPath", "audit")
        .add_header(credential_header(), header)
        .await;
    resp.assert_status_ok();
    let page: Vec<Message> = resp.json();
    assert_eq!(seqs(&page), vec![1, 2, 3]);
    assert_eq!(page[0].body, "audit 1");

    // Without the credential, the ambient namespace has no such entity.
    let ambient = server.get("/messages").add_query_param("entityPath", "audit").await;
    ambient.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn undecryptable_header_is_rejected() -> anyhow::Result<()> {
    let server = test_server()?;
    let garbage = base64::engine::general_purpose::STANDARD.encode([7u8; 256]);

    for value in [garbage.as_str(), "%%%not-base64%%%"] {
        let resp = server
            .get("/messages")
            .add_query_param("entityPath", "orders")
            .add_header(credential_header(), HeaderValue::from_str(value)?)
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = resp.json();
        assert_eq!(body.code, "INVALID_CREDENTIAL");
    }
    Ok(())
}

#[tokio::test]
async fn sealed_garbage_connection_string_is_broker_error() -> anyhow::Result<()> {
    let server = test_server()?;
    let header = sealed(&server, "this is not a connection string").await?;
    let resp = server
        .get("/messages")
        .add_query_param("entityPath", "orders")
        .add_header(credential_header(), header)
        .await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = resp.json();
    assert!(body.detail.unwrap_or_default().contains("invalid connection string"));
    Ok(())
}

// -- Queue count --------------------------------------------------------------

#[tokio::test]
async fn queue_count_reports_active_messages() -> anyhow::Result<()> {
    let server = test_server()?;
    let resp = server.get("/queues/orders/count").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body, serde_json::json!({ "count": 25 }));
    Ok(())
}

#[tokio::test]
async fn queue_count_with_credential() -> anyhow::Result<()> {
    let server = test_server()?;
    let header = sealed(&server, TENANT_CONNECTION_STRING).await?;
    let body: CountResponse =
        server.get("/queues/audit/count").add_header(credential_header(), header).await.json();
    assert_eq!(body.count, QueueCount::Available(3));
    Ok(())
}

#[tokio::test]
async fn queue_count_failures_are_not_available() -> anyhow::Result<()> {
    let server = test_server()?;

    let missing = server.get("/queues/ghost/count").await;
    missing.assert_status_ok();
    let body: serde_json::Value = missing.json();
    assert_eq!(body, serde_json::json!({ "count": "N/A" }));

    let bad_header = server
        .get("/queues/orders/count")
        .add_header(credential_header(), HeaderValue::from_static("garbage"))
        .await;
    bad_header.assert_status_ok();
    let body: CountResponse = bad_header.json();
    assert_eq!(body.count, QueueCount::Unavailable);

    let unconfigured = test_server_with(test_config(None))?;
    let body: CountResponse = unconfigured.get("/queues/orders/count").await.json();
    assert_eq!(body.count, QueueCount::Unavailable);
    Ok(())
}

#[tokio::test]
async fn fixture_file_seeds_the_broker() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("fixture.json");
    std::fs::write(
        &path,
        serde_json::to_vec(&serde_json::json!({
            "namespaces": {
                "orders-ns": {
                    "payments": [
                        { "body": "first", "subject": "created" },
                        { "body": { "amount": 12 }, "correlationId": "c-1" }
                    ]
                }
            }
        }))?,
    )?;

    let router = buspeek::build_app(
        &test_config(Some("orders-ns")),
        Arc::new(MemoryBroker::load_fixture(&path)?),
        vault(),
    );
    let server = TestServer::new(router)?;
    let page: Vec<Message> =
        server.get("/messages").add_query_param("entityPath", "payments").await.json();
    assert_eq!(seqs(&page), vec![1, 2]);
    assert_eq!(page[0].subject.as_deref(), Some("created"));
    assert_eq!(page[1].body, r#"{"amount":12}"#);
    assert_eq!(page[1].correlation_id.as_deref(), Some("c-1"));
    Ok(())
}

#[test]
fn sealed_credential_does_not_leak_plaintext() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let vault = vault();
    let pem = runtime.block_on(vault.public_key_pem())?;
    let ciphertext = seal(TENANT_CONNECTION_STRING, &pem)?;
    assert!(!ciphertext.contains("s3cret"));
    let credential = runtime.block_on(vault.decrypt(&ciphertext))?;
    assert_eq!(credential.expose(), TENANT_CONNECTION_STRING);
    assert!(!format!("{credential:?}").contains("s3cret"));
    Ok(())
}
