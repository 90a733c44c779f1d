use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::config::MapConfig;
use crate::db::check_pool;
use crate::db::models::FeatureCollection;
use crate::db::repositories::EventsRepository;
use crate::error::Error;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Json};
use axum::routing::{delete, get};
use axum::Router;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::events_controller::DeleteResponse;

/// Query parameters of the point-picker page
#[derive(Debug, Default, Deserialize)]
pub struct PickParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub z: Option<u8>,
    pub mode: Option<String>,
    pub contact: Option<String>,
}

/// Query parameters of the public owner delete
#[derive(Debug, Deserialize)]
pub struct OwnerDeleteParams {
    pub uid: i64,
    pub sig: String,
}

/// Public pages, map feed and owner delete
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/pick", get(pick))
        .route("/geojson", get(geojson))
        .route("/healthz", get(healthz))
        .route("/event/:id", delete(delete_own_event))
}

async fn read_template(state: &AppState, name: &str) -> ApiResult<String> {
    let path = state.map.webmap_dir.join(name);
    let page = tokio::fs::read_to_string(&path).await.map_err(|e| {
        error!("Failed to read page template {:?}: {}", path, e);
        Error::Io(format!("Page template unavailable: {}", name))
    })?;
    Ok(page)
}

/// Minimal HTML escaping for values substituted into templates
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Fill the picker template. Mode is `fire` or `vol`.
pub fn render_pick(template: &str, params: &PickParams, defaults: &MapConfig) -> String {
    let mode = match params.mode.as_deref() {
        Some(m) if m.eq_ignore_ascii_case("fire") => "fire",
        _ => "vol",
    };

    template
        .replace("__LAT__", &params.lat.unwrap_or(defaults.center_lat).to_string())
        .replace("__LON__", &params.lon.unwrap_or(defaults.center_lon).to_string())
        .replace("__ZOOM__", &params.z.unwrap_or(defaults.center_zoom).to_string())
        .replace("__MODE__", mode)
        .replace(
            "__CONTACT__",
            &escape_html(params.contact.as_deref().unwrap_or("")),
        )
}

async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    Ok(Html(read_template(&state, "index.html").await?))
}

async fn pick(
    State(state): State<AppState>,
    Query(params): Query<PickParams>,
) -> ApiResult<Html<String>> {
    let template = read_template(&state, "pick.html").await?;
    Ok(Html(render_pick(&template, &params, &state.map)))
}

async fn geojson(State(state): State<AppState>) -> ApiResult<Json<FeatureCollection>> {
    let collection = EventsRepository::new(Arc::clone(&state.db_pool))
        .feature_collection()
        .await?;
    Ok(Json(collection))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let database = check_pool(&state.db_pool).await;
    Json(json!({ "ok": true, "database": database }))
}

/// Delete an event on behalf of its reporter, authorised by an owner
/// signature
async fn delete_own_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<OwnerDeleteParams>,
) -> ApiResult<Json<DeleteResponse>> {
    if !state.security.verify_owner(params.uid, &params.sig) {
        warn!("Bad owner signature for user {} on event {}", params.uid, id);
        return Err(Error::Authorization("bad signature".to_string()).into());
    }

    let deleted = EventsRepository::new(Arc::clone(&state.db_pool))
        .delete_by_owner(id, params.uid)
        .await?;
    if !deleted {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "not found or not owner"));
    }

    info!("Event {} deleted by owner {}", id, params.uid);
    Ok(Json(DeleteResponse { deleted: true, id }))
}
