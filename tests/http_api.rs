//! HTTP API Tests
//!
//! Router-level tests for the data API, stats, and the stream
//! endpoint's response framing.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use livefeed::server::{HttpServer, ServerConfig};

fn test_router() -> Router {
    HttpServer::new(ServerConfig::default()).router()
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = test_router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_list_documents() {
    let router = test_router();

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/donations")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"amount": 25}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response.into_body()).await;
    assert_eq!(created["success"], true);
    assert!(created["data"]["id"].is_string());

    let response = router
        .oneshot(Request::get("/api/donations").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response.into_body()).await;
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["data"][0]["amount"], 25);
}

#[tokio::test]
async fn test_delete_missing_document_returns_envelope() {
    let response = test_router()
        .oneshot(
            Request::delete("/api/donations/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_non_object_document_rejected() {
    let response = test_router()
        .oneshot(
            Request::post("/api/donations")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"[1, 2, 3]"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_stats() {
    let response = test_router()
        .oneshot(Request::get("/stream/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["active_connections"], 0);
}

#[tokio::test]
async fn test_event_stream_framing() {
    let response = test_router()
        .oneshot(
            Request::get("/stream/events?sources=donations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    // First frame on the body is always `connected`
    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let data = frame.into_data().unwrap();
    let text = String::from_utf8(data.to_vec()).unwrap();
    assert!(text.starts_with("data: "));
    assert!(text.ends_with("\n\n"));
    assert!(text.contains("\"type\":\"connected\""));
}
