use crate::config::{ApiConfig, MapConfig};
use crate::error::Error;
use crate::security::SecurityService;
use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use log::{error, info};
use serde::Serialize;
use sqlx::SqlitePool;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub mod events_controller;
pub mod pages_controller;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<SqlitePool>,
    pub security: Arc<SecurityService>,
    pub map: Arc<MapConfig>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::Constraint(_) => StatusCode::CONFLICT,
            Error::Database(_) | Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                error!("Request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        ApiError::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return (*err).clone().into();
        }

        error!("Request failed: {:#}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

/// Build the full router: public pages and feed plus the JSON API
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .merge(pages_controller::create_router())
        .nest("/api", events_controller::create_router())
        .with_state(state)
        .layer(cors)
}

pub struct RestApi {
    config: ApiConfig,
    state: AppState,
}

impl RestApi {
    pub fn new(
        config: &ApiConfig,
        map: &MapConfig,
        db_pool: Arc<SqlitePool>,
        security: Arc<SecurityService>,
    ) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            state: AppState {
                db_pool,
                security,
                map: Arc::new(map.clone()),
            },
        })
    }

    pub fn address(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.config.address, self.config.port);
        addr.parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address: {}", addr))
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state.clone());
        let addr = self.address()?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("API server listening on {}", addr);

        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
