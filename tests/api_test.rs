//! Integration tests for the HTTP API

mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::{send, send_json, test_app, test_state};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use wildfire_map::api::rest::router;
use wildfire_map::config::MapConfig;

#[tokio::test]
async fn healthz_reports_ok() -> Result<()> {
    let (app, _) = test_app().await?;
    let (status, body) = send_json(&app, Method::GET, "/healthz", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["database"], true);
    Ok(())
}

#[tokio::test]
async fn create_event_defaults_status() -> Result<()> {
    let (app, _) = test_app().await?;
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({"ts": 1700000000, "type": "fire", "lat": 34.05, "lon": -118.25})),
    )
    .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "active");
    assert_eq!(body["type"], "fire");
    assert_eq!(body["ts"], 1700000000);
    assert!(body["id"].as_i64().is_some());
    Ok(())
}

#[tokio::test]
async fn create_event_rejects_unknown_type_and_status() -> Result<()> {
    let (app, _) = test_app().await?;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({"ts": 1, "type": "flood"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("flood"));

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({"ts": 1, "type": "fire", "status": "closed"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn status_update_flow() -> Result<()> {
    let (app, _) = test_app().await?;
    let (_, event) = send_json(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({"type": "volunteer"})),
    )
    .await?;
    let id = event["id"].as_i64().unwrap();

    let uri = format!("/api/events/{}/status", id);
    let (status, body) =
        send_json(&app, Method::PUT, &uri, Some(json!({"status": "verified"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "verified");

    let (status, _) =
        send_json(&app, Method::PUT, &uri, Some(json!({"status": "archived"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        Method::PUT,
        "/api/events/9999/status",
        Some(json!({"status": "resolved"})),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn photos_attach_list_and_cascade() -> Result<()> {
    let (app, _) = test_app().await?;
    let (_, event) = send_json(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({"ts": 1700000000, "type": "fire", "lat": 34.05, "lon": -118.25})),
    )
    .await?;
    let id = event["id"].as_i64().unwrap();
    let photos_uri = format!("/api/events/{}/photos", id);

    let (status, photo) = send_json(
        &app,
        Method::POST,
        &photos_uri,
        Some(json!({"file_id": "abc123", "ts": 1700000001})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(photo["event_id"], id);

    let (_, listed) = send_json(&app, Method::GET, &photos_uri, None).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (_, feed) = send_json(&app, Method::GET, "/geojson", None).await?;
    assert_eq!(feed["features"][0]["properties"]["photos"], 1);

    let (status, body) =
        send_json(&app, Method::DELETE, &format!("/api/events/{}", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": true, "id": id}));

    let (status, _) = send_json(&app, Method::GET, &photos_uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn photo_for_missing_event_conflicts() -> Result<()> {
    let (app, _) = test_app().await?;
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/events/4242/photos",
        Some(json!({"file_id": "orphan"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
    Ok(())
}

#[tokio::test]
async fn query_by_type_and_location() -> Result<()> {
    let (app, _) = test_app().await?;
    for (ts, kind, lat, lon) in [
        (10, "fire", 42.18, 18.95),
        (20, "fire", 45.0, 20.0),
        (30, "safe", 42.17, 18.94),
    ] {
        send_json(
            &app,
            Method::POST,
            "/api/events",
            Some(json!({"ts": ts, "type": kind, "lat": lat, "lon": lon})),
        )
        .await?;
    }

    let (status, fires) = send_json(&app, Method::GET, "/api/events?type=fire", None).await?;
    assert_eq!(status, StatusCode::OK);
    let ts: Vec<i64> = fires
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["ts"].as_i64())
        .collect();
    assert_eq!(ts, vec![20, 10]);

    let (status, _) = send_json(&app, Method::GET, "/api/events?type=smoke", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, near) = send_json(
        &app,
        Method::GET,
        "/api/events/near?lat=42.179&lon=18.942",
        None,
    )
    .await?;
    let ts: Vec<i64> = near
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["ts"].as_i64())
        .collect();
    assert_eq!(ts, vec![30, 10]);
    Ok(())
}

#[tokio::test]
async fn free_text_report_becomes_event() -> Result<()> {
    let (app, _) = test_app().await?;
    let (status, event) = send_json(
        &app,
        Method::POST,
        "/api/reports",
        Some(json!({"text": "fire 42.1, 18.9 @ranger smoke", "user_id": 5})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["type"], "fire");
    assert_eq!(event["contact"], "@ranger");
    assert_eq!(event["text"], "smoke");
    assert_eq!(event["user_id"], 5);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/reports",
        Some(json!({"text": "hello there"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn owner_delete_requires_signature_and_ownership() -> Result<()> {
    let (app, state) = test_app().await?;
    let (_, event) = send_json(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({"type": "volunteer", "user_id": 7, "lat": 42.0, "lon": 19.0})),
    )
    .await?;
    let id = event["id"].as_i64().unwrap();

    let (status, body) = send_json(
        &app,
        Method::DELETE,
        &format!("/event/{}?uid=7&sig=forged", id),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Authorization error: bad signature");

    let other_sig = state.security.sign_owner(8)?;
    let (status, body) = send_json(
        &app,
        Method::DELETE,
        &format!("/event/{}?uid=8&sig={}", id, other_sig),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "not found or not owner");

    let (_, issued) = send_json(&app, Method::GET, "/api/owner-signature/7", None).await?;
    let sig = issued["sig"].as_str().unwrap().to_string();
    let (status, body) = send_json(
        &app,
        Method::DELETE,
        &format!("/event/{}?uid=7&sig={}", id, sig),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": true, "id": id}));
    Ok(())
}

#[tokio::test]
async fn pages_render_templates() -> Result<()> {
    let (app, _) = test_app().await?;

    let (status, html) = send(&app, Method::GET, "/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("/geojson"));

    let (status, html) = send(
        &app,
        Method::GET,
        "/pick?lat=41.5&lon=19.25&z=14&mode=fire&contact=%40ranger",
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("setView([41.5, 19.25], 14)"));
    assert!(html.contains("const mode = 'fire'"));
    assert!(html.contains("value=\"@ranger\""));
    assert!(!html.contains("__LAT__"));
    Ok(())
}

#[tokio::test]
async fn missing_page_template_is_a_server_error() -> Result<()> {
    let mut state = test_state().await?;
    state.map = Arc::new(MapConfig {
        webmap_dir: PathBuf::from("no-such-webmap-dir"),
        ..MapConfig::default()
    });
    let app = router(state);

    let (status, body) = send_json(&app, Method::GET, "/", None).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "IO error: Page template unavailable: index.html");
    Ok(())
}

#[tokio::test]
async fn create_event_without_ts_is_stamped_now() -> Result<()> {
    let (app, _) = test_app().await?;
    let before = chrono::Utc::now().timestamp();
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/events",
        Some(json!({"type": "note", "text": "road closed"})),
    )
    .await?;
    let after = chrono::Utc::now().timestamp();

    assert_eq!(status, StatusCode::CREATED);
    let ts = body["ts"].as_i64().unwrap_or_default();
    assert!((before..=after).contains(&ts), "ts {} outside {}..={}", ts, before, after);
    Ok(())
}
