//! Record routes: mutations answer with the re-rendered screen, reads answer
//! with JSON.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use vteacher_api::{ApiError, ErrorCode};
use vteacher_core::{Location, Record, TreeChunk};
use vteacher_test_utils::{record_id, InMemoryRecordStore};

#[path = "support/app.rs"]
mod test_app;
use test_app::*;

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::http::Response<axum::body::Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_redirects_and_reads_its_own_write() {
    let store = Arc::new(InMemoryRecordStore::new());
    let router = test_router(store.clone());

    let response = send(
        router.clone(),
        json_request(
            "POST",
            &with_location("/vteachers", Location::list()),
            json!({"title": "A", "body": "first body"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(location_header(&response), Location::selected(record_id(1)));
    let text = resolved_text(&read_chunks(response).await);
    assert!(text.contains("first body"));

    let response = send(
        router,
        json_request(
            "POST",
            &with_location("/vteachers", Location::selected(record_id(1))),
            json!({"title": "B", "body": "second body"}),
        ),
    )
    .await;
    assert_eq!(location_header(&response), Location::selected(record_id(2)));
    let chunks = read_chunks(response).await;
    let text = resolved_text(&chunks);
    assert!(text.contains('A'));
    assert!(text.contains('B'));
    assert!(text.contains("second body"));
    assert_eq!(chunks.last(), Some(&TreeChunk::End));
}

#[tokio::test]
async fn update_rerenders_requested_location() {
    let router = test_router(Arc::new(InMemoryRecordStore::seeded()));
    let location = Location::selected(record_id(2));

    let response = send(
        router,
        json_request(
            "PUT",
            &with_location("/vteachers/2", location),
            json!({"title": "Renamed", "body": "Rewritten"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(location_header(&response), location);
    let text = resolved_text(&read_chunks(response).await);
    assert!(text.contains("Renamed"));
    assert!(text.contains("Rewritten"));
}

#[tokio::test]
async fn update_of_missing_record_renders_not_found() {
    let router = test_router(Arc::new(InMemoryRecordStore::new()));
    let location = Location::selected(record_id(8));

    let response = send(
        router.clone(),
        json_request(
            "PUT",
            &with_location("/vteachers/8", location),
            json!({"title": "x", "body": "y"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(location_header(&response), location);
    let chunks = read_chunks(response).await;
    assert!(resolved_text(&chunks).contains("Vteacher 8 not found"));
    assert_eq!(chunks.last(), Some(&TreeChunk::End));

    let records: Vec<Record> = read_json(send(router, get("/vteachers")).await).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn delete_then_render_shows_not_found() {
    let router = test_router(Arc::new(InMemoryRecordStore::seeded()));
    let location = Location::selected(record_id(3));

    let response = send(
        router.clone(),
        axum::http::Request::delete(with_location("/vteachers/3", location))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = resolved_text(&read_chunks(response).await);
    assert!(text.contains("Vteacher 3 not found"));

    let records: Vec<Record> = read_json(send(router, get("/vteachers")).await).await;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.id != record_id(3)));
}

#[tokio::test]
async fn mutation_against_unavailable_store_fails_before_streaming() {
    let store = Arc::new(InMemoryRecordStore::seeded());
    store.set_offline(true);
    let router = test_router(store);

    let response = send(
        router,
        json_request(
            "POST",
            &with_location("/vteachers", Location::list()),
            json!({"title": "A", "body": ""}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let error: ApiError = read_json(response).await;
    assert_eq!(error.code, ErrorCode::StoreUnavailable);
}

#[tokio::test]
async fn list_and_get_return_json() {
    let router = test_router(Arc::new(InMemoryRecordStore::seeded()));

    let records: Vec<Record> = read_json(send(router.clone(), get("/vteachers")).await).await;
    let ids: Vec<i64> = records.iter().map(|r| r.id.get()).collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);

    let record: Option<Record> = read_json(send(router.clone(), get("/vteachers/1")).await).await;
    assert_eq!(record.map(|r| r.title), Some("Meeting VTeachers".to_string()));

    let missing: Option<Record> = read_json(send(router.clone(), get("/vteachers/99")).await).await;
    assert!(missing.is_none());

    let response = send(router, get("/vteachers/zero")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sleep_and_health_endpoints() {
    let router = test_router(Arc::new(InMemoryRecordStore::seeded()));

    let body: serde_json::Value = read_json(send(router.clone(), get("/sleep/5")).await).await;
    assert_eq!(body, json!({"ok": true}));

    let response = send(router.clone(), get("/sleep/forever")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let health: serde_json::Value = read_json(send(router, get("/health")).await).await;
    assert_eq!(health["status"], "healthy");
}
