//! Shared setup for integration tests
#![allow(dead_code)]

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use wildfire_map::api::rest::router;
use wildfire_map::config::{DatabaseConfig, MapConfig, SecurityConfig};
use wildfire_map::security::SecurityService;
use wildfire_map::{AppState, DatabaseService};

pub const TEST_SECRET: &str = "integration-secret";

/// Fresh in-memory database with migrations applied
pub async fn setup_test_database() -> Result<DatabaseService> {
    DatabaseService::new(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        auto_migrate: true,
    })
    .await
}

/// App state over a fresh database, serving the bundled webmap templates
pub async fn test_state() -> Result<AppState> {
    let database = setup_test_database().await?;
    let security = SecurityService::new(SecurityConfig {
        secret_key: TEST_SECRET.to_string(),
        expose_signatures: true,
        ..SecurityConfig::default()
    });

    Ok(AppState {
        db_pool: database.pool.clone(),
        security: Arc::new(security),
        map: Arc::new(MapConfig {
            webmap_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("webmap"),
            ..MapConfig::default()
        }),
    })
}

pub async fn test_app() -> Result<(Router, AppState)> {
    let state = test_state().await?;
    Ok((router(state.clone()), state))
}

/// Send one request and return the status and body text
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, String)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json)?)
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body)?).await?;
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    Ok((status, String::from_utf8(bytes.to_vec())?))
}

/// Like [`send`], parsing the body as JSON
pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let (status, text) = send(app, method, uri, body).await?;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)?
    };
    Ok((status, value))
}
