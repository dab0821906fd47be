// rest_api/src/lib.rs

//! HTTP surface of the visit engine.

pub mod auth;
pub mod config;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error as AnyhowError};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use lib::clock::SystemClock;
use lib::directory::{Directory, DirectorySeed, InMemoryDirectory};
use lib::service::{PageLimits, VisitService};
use lib::storage_engine::create_stores;
use models::errors::{FieldError, VisitError};
use models::medical::ScheduleConflict;
use security::{AuthError, RolesConfig};

use crate::config::AppConfig;

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Visit(#[from] VisitError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for RestApiError {
    fn from(rejection: QueryRejection) -> Self {
        RestApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for RestApiError {
    fn from(rejection: PathRejection) -> Self {
        RestApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicts: Option<Vec<ScheduleConflict>>,
}

impl RestApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestApiError::Visit(e) => match e {
                VisitError::Validation(_) | VisitError::Workflow { .. } => StatusCode::BAD_REQUEST,
                VisitError::NotFound(_) => StatusCode::NOT_FOUND,
                VisitError::Conflict { .. } => StatusCode::CONFLICT,
                VisitError::Forbidden(_) => StatusCode::FORBIDDEN,
                VisitError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RestApiError::Auth(e) => match e {
                AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::JwtError(_) => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::PermissionDenied(_) | AuthError::UnknownRole(_) => StatusCode::FORBIDDEN,
                AuthError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RestApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let error = match &self {
            RestApiError::Auth(AuthError::Config(_)) => "internal error".to_string(),
            other => other.to_string(),
        };
        let (details, conflicts) = match self {
            RestApiError::Visit(VisitError::Validation(errors)) => (Some(errors), None),
            RestApiError::Visit(VisitError::Conflict { conflicts, .. }) => (None, Some(conflicts)),
            _ => (None, None),
        };
        let body = ErrorBody {
            success: false,
            error,
            details,
            conflicts,
        };
        (status, Json(body)).into_response()
    }
}

// Shared state for the Axum application
#[derive(Clone)]
pub struct AppState {
    pub service: VisitService,
    pub roles: Arc<RolesConfig>,
    pub jwt_secret: Arc<[u8]>,
    pub page_limits: PageLimits,
}

impl AppState {
    pub fn new(
        service: VisitService,
        roles: RolesConfig,
        jwt_secret: &[u8],
        page_limits: PageLimits,
    ) -> Self {
        AppState {
            service,
            roles: Arc::new(roles),
            jwt_secret: Arc::from(jwt_secret),
            page_limits,
        }
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/visits",
            post(handlers::create_visit).get(handlers::list_visits),
        )
        .route("/api/visits/upcoming", get(handlers::upcoming_visits))
        .route("/api/visits/availability", get(handlers::availability))
        .route("/api/visits/audit", get(handlers::audit_trail))
        .route("/api/visits/patient/:patient_id", get(handlers::patient_visits))
        .route(
            "/api/visits/:id",
            get(handlers::get_visit)
                .put(handlers::update_visit)
                .delete(handlers::delete_visit),
        )
        .route("/api/visits/:id/check-in", post(handlers::check_in))
        .route("/api/visits/:id/check-out", post(handlers::check_out))
        .route("/api/visits/:id/workflow", get(handlers::workflow))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn build_directory(config: &AppConfig) -> anyhow::Result<Directory> {
    let directory = match &config.rest.directory_seed_path {
        Some(path) => InMemoryDirectory::from_seed(DirectorySeed::from_file(path)?),
        None => {
            warn!("No directory seed configured; every patient and doctor lookup will miss");
            InMemoryDirectory::new()
        }
    };
    Ok(Directory::from_in_memory(Arc::new(directory)))
}

// Main function to start the REST API server
pub async fn start_server<F>(config: AppConfig, shutdown: F) -> Result<(), AnyhowError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.rest.jwt_secret.trim().is_empty() {
        anyhow::bail!("rest.jwt_secret must be set (CLINIC_REST__JWT_SECRET)");
    }
    let roles = match &config.rest.roles_path {
        Some(path) => RolesConfig::from_yaml_file(path)?,
        None => RolesConfig::default(),
    };
    let stores = create_stores(&config.storage).context("Failed to open visit storage")?;
    let directory = build_directory(&config)?;
    let service = VisitService::new(
        stores,
        directory,
        config.scheduling.clone(),
        Arc::new(SystemClock),
    )
    .await?;

    let state = AppState::new(
        service,
        roles,
        config.rest.jwt_secret.as_bytes(),
        PageLimits {
            default_limit: config.rest.default_page_limit,
            max_limit: config.rest.max_page_limit,
        },
    );
    let app = build_router(state, Duration::from_secs(config.rest.request_timeout_secs));

    let addr = format!("{}:{}", config.rest.host, config.rest.port);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;
    info!("REST API server listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped.");
    Ok(())
}
