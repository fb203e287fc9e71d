mod common;

use std::time::Duration;

use common::{backend_for, message_row, ticket_row, wait_for};
use deskwatch::{
    Config, DeskwatchError, MemorySessionStore, PollConfig, SyncEngine, TicketFilter, TicketId,
    TicketStatus,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> Config {
    Config {
        poll: PollConfig {
            tickets_interval_ms: 50,
            thread_interval_ms: 30,
        },
        ..Config::default()
    }
}

async fn mount_list(server: &MockServer, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_engine_polls_list_and_focused_thread() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        json!([ticket_row(7, "escalated"), ticket_row(8, "ai_processing")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tickets/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                message_row(1, "user", "Где мой заказ?", 0),
                message_row(2, "ai", "Проверяю", 3),
            ]
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(backend_for(&server), &fast_config(), MemorySessionStore::new());
    engine.start();
    assert!(wait_for(Duration::from_secs(2), || engine.tickets().len() == 2).await);
    assert_eq!(engine.filtered(TicketFilter::escalated()).len(), 1);

    engine.select("7");
    assert!(wait_for(Duration::from_secs(2), || engine.thread().len() == 2).await);
    assert_eq!(engine.metrics().iterations, 1);
    assert_eq!(engine.metrics().escalations, 1);
    assert!(engine.health().is_online());

    engine.shutdown();
}

#[tokio::test]
async fn test_engine_survives_backend_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tickets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(backend_for(&server), &fast_config(), MemorySessionStore::new());
    engine.start();
    assert!(wait_for(Duration::from_secs(2), || engine.health().consecutive_failures >= 2).await);
    assert!(engine.is_loaded());
    assert!(engine.tickets().is_empty());
    assert!(!engine.health().is_online());
    engine.shutdown();
}

#[tokio::test]
async fn test_change_status_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ticket_row(7, "escalated")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_list(&server, json!([ticket_row(7, "closed")])).await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/tickets/7/status"))
        .and(body_json(json!({"status": "closed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_row(7, "closed")))
        .expect(1)
        .mount(&server)
        .await;

    let engine = SyncEngine::new(
        backend_for(&server),
        &Config::default(),
        MemorySessionStore::new(),
    );
    engine.start();
    assert!(wait_for(Duration::from_secs(2), || engine.is_loaded()).await);
    engine.shutdown();

    let id = TicketId::from("7");
    assert!(matches!(
        engine.change_status(&id, TicketStatus::Closed).await,
        Err(DeskwatchError::NotLoggedIn)
    ));

    engine.login("42", "Olga").unwrap();
    let status = engine.change_status(&id, TicketStatus::Closed).await.unwrap();
    assert_eq!(status, TicketStatus::Closed);
    assert_eq!(engine.tickets()[0].status, TicketStatus::Closed);
    assert!(engine.pending_writes().is_empty());
}

#[tokio::test]
async fn test_rejected_status_change_leaves_store_alone() {
    let server = MockServer::start().await;
    mount_list(&server, json!([ticket_row(7, "in_progress")])).await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/tickets/7/status"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"detail": "invalid"})))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(
        backend_for(&server),
        &Config::default(),
        MemorySessionStore::new(),
    );
    engine.start();
    assert!(wait_for(Duration::from_secs(2), || engine.is_loaded()).await);
    engine.shutdown();
    engine.login("42", "Olga").unwrap();

    let before = engine.snapshot();
    let err = engine
        .change_status(&TicketId::from("7"), TicketStatus::Resolved)
        .await
        .unwrap_err();
    assert!(!err.is_validation());
    assert_eq!(*engine.snapshot(), *before);
}
