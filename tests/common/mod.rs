#![allow(dead_code)]

use std::time::Duration;

use deskwatch::HttpBackend;
use serde_json::{Value, json};
use wiremock::MockServer;

/// Client pointed at a mock helpdesk server, API under `/api/v1`.
pub fn backend_for(server: &MockServer) -> HttpBackend {
    HttpBackend::with_urls(
        server.uri(),
        format!("{}/api/v1", server.uri()),
        Duration::from_secs(5),
    )
    .expect("Failed to build HTTP backend")
}

/// A ticket row as `GET /tickets` returns it.
pub fn ticket_row(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "ticket_number": format!("T-{id:04}"),
        "telegram_user_id": 5551234,
        "telegram_username": "anna",
        "status": status,
        "assigned_manager_id": null,
        "created_at": "2024-05-01T10:00:00.123456",
        "updated_at": "2024-05-01T10:00:00.123456",
        "first_message": "Курьер не приехал, заказ 12345",
        "message_count": 2
    })
}

/// A message row as `GET /tickets/{id}` returns it.
pub fn message_row(id: i64, sender: &str, content: &str, second: u32) -> Value {
    json!({
        "id": id,
        "ticket_id": 7,
        "sender_type": sender,
        "sender_id": "5551234",
        "content": content,
        "media_type": null,
        "media_url": null,
        "media_file_id": null,
        "created_at": format!("2024-05-01T10:00:{second:02}")
    })
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
