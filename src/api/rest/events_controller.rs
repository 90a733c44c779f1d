use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::{Event, EventKind, EventStatus, NewEvent, NewPhoto, Photo};
use crate::db::repositories::events::{DEFAULT_LIMIT, MAP_FEED_LIMIT};
use crate::db::repositories::{EventsRepository, PhotosRepository};
use crate::error::Error;
use crate::services::reports::{ReportRequest, ReportService};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default half-width, in degrees, of the box searched by `/events/near`
pub const DEFAULT_NEAR_RADIUS_DEG: f64 = 0.05;

/// Request body for creating an event
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Unix seconds; now if absent
    pub ts: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub user_id: Option<i64>,
    pub group_id: Option<String>,
    pub text: Option<String>,
    pub photo_file_id: Option<String>,
    pub status: Option<String>,
    pub contact: Option<String>,
}

impl CreateEventRequest {
    fn into_new_event(self) -> Result<NewEvent, Error> {
        let kind: EventKind = self.kind.parse()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<EventStatus>)
            .transpose()?;

        Ok(NewEvent {
            ts: self.ts.unwrap_or_else(|| Utc::now().timestamp()),
            kind,
            lat: self.lat,
            lon: self.lon,
            user_id: self.user_id,
            group_id: self.group_id,
            text: self.text,
            photo_file_id: self.photo_file_id,
            status,
            contact: self.contact,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachPhotoRequest {
    pub file_id: String,
    /// Unix seconds; now if absent
    pub ts: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NearParams {
    pub lat: f64,
    pub lon: f64,
    pub radius: Option<f64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerSignatureResponse {
    pub uid: i64,
    pub sig: String,
}

/// Create events controller router with AppState
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/near", get(list_events_near))
        .route("/events/:id", get(get_event).delete(delete_event))
        .route("/events/:id/status", put(update_status))
        .route("/events/:id/photos", get(list_photos).post(attach_photo))
        .route("/reports", post(submit_report))
        .route("/owner-signature/:uid", get(owner_signature))
}

fn events_repo(state: &AppState) -> EventsRepository {
    EventsRepository::new(Arc::clone(&state.db_pool))
}

fn photos_repo(state: &AppState) -> PhotosRepository {
    PhotosRepository::new(Arc::clone(&state.db_pool))
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAP_FEED_LIMIT)
}

/// Create an event
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let new_event = request.into_new_event()?;
    let event = events_repo(&state).create(&new_event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events of one type, newest first
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Event>>> {
    let kind: EventKind = params.kind.parse()?;
    let events = events_repo(&state)
        .get_by_type(kind, Some(clamp_limit(params.limit)))
        .await?;
    Ok(Json(events))
}

/// List events around a point, newest first
pub async fn list_events_near(
    State(state): State<AppState>,
    Query(params): Query<NearParams>,
) -> ApiResult<Json<Vec<Event>>> {
    let events = events_repo(&state)
        .get_near(
            params.lat,
            params.lon,
            params.radius.unwrap_or(DEFAULT_NEAR_RADIUS_DEG),
            Some(clamp_limit(params.limit)),
        )
        .await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Event>> {
    let event = events_repo(&state)
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Event not found: {}", id)))?;
    Ok(Json(event))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Event>> {
    let status: EventStatus = request.status.parse()?;
    let event = events_repo(&state).update_status(id, status).await?;
    Ok(Json(event))
}

/// Operator delete; photos go with the event
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    if !events_repo(&state).delete(id).await? {
        return Err(Error::NotFound(format!("Event not found: {}", id)).into());
    }
    info!("Operator deleted event {}", id);
    Ok(Json(DeleteResponse { deleted: true, id }))
}

pub async fn attach_photo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AttachPhotoRequest>,
) -> ApiResult<(StatusCode, Json<Photo>)> {
    let photo = photos_repo(&state)
        .attach(&NewPhoto {
            event_id: id,
            ts: request.ts.unwrap_or_else(|| Utc::now().timestamp()),
            file_id: request.file_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn list_photos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Photo>>> {
    if events_repo(&state).get_by_id(id).await?.is_none() {
        return Err(Error::NotFound(format!("Event not found: {}", id)).into());
    }
    let photos = photos_repo(&state).get_by_event(id).await?;
    Ok(Json(photos))
}

/// Store a free-text report such as `fire 42.1 18.9 @ranger smoke`
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = ReportService::new(events_repo(&state))
        .submit(&request)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Issue an owner signature. Only served when enabled in the security
/// config.
pub async fn owner_signature(
    State(state): State<AppState>,
    Path(uid): Path<i64>,
) -> ApiResult<Json<OwnerSignatureResponse>> {
    if !state.security.config().expose_signatures {
        return Err(Error::NotFound("Owner signatures are not exposed".to_string()).into());
    }
    let sig = state.security.sign_owner(uid)?;
    Ok(Json(OwnerSignatureResponse { uid, sig }))
}
