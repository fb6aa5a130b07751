use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use nova_shared::constants::SUPPORTED_DOMAINS;
use nova_shared::{build_meta, BaseResponse};
use nova_store::Persistence;
use serde::Serialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::middleware::{log_requests, render_errors};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub persistence: Persistence,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, persistence: Persistence) -> Self {
        Self {
            config: Arc::new(config),
            persistence,
            started_at: Utc::now(),
        }
    }
}

/// All public routes, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/version", get(version))
        .route("/actions/handshake", get(actions_handshake))
        .fallback(not_found)
}

pub fn build_router(state: AppState) -> Router {
    with_layers(routes(), state)
}

/// Wrap `router` in the error envelope, request logging, CORS and tracing.
pub fn with_layers(router: Router<AppState>, state: AppState) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(state.clone(), render_errors))
        .layer(middleware::from_fn(log_requests))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Credentials rule out `*`, so methods and headers mirror the request.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

#[derive(Serialize)]
struct RootResponse {
    system: String,
    version: String,
    build: Option<String>,
    environment: String,
    status: &'static str,
}

#[derive(Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    root: RootResponse,
    uptime_seconds: i64,
    database: &'static str,
}

#[derive(Serialize)]
struct VersionResponse {
    nova_version: String,
    build_date: String,
    api_schema_version: String,
    master_doc_version: String,
}

fn root_response(config: &ServerConfig) -> RootResponse {
    RootResponse {
        system: config.version.name.clone(),
        version: config.version.version.clone(),
        build: config.version.build.clone(),
        environment: config.environment.clone(),
        status: "online",
    }
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(root_response(&state.config))
}

async fn health(State(state): State<AppState>) -> Json<BaseResponse> {
    Json(BaseResponse::ok(
        json!({ "message": "healthy" }),
        build_meta(&state.config.version, None),
    ))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let uptime_seconds = (Utc::now() - state.started_at).num_seconds().max(0);

    Json(StatusResponse {
        root: root_response(&state.config),
        uptime_seconds,
        database: state.persistence.status().as_str(),
    })
}

async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    let info = &state.config.version;
    Json(VersionResponse {
        nova_version: info.version.clone(),
        build_date: info.build_date_or_unknown().to_string(),
        api_schema_version: info.api_schema_version_or_default().to_string(),
        master_doc_version: info.master_doc_version_or_unknown().to_string(),
    })
}

/// Tells Actions clients which Nova they are talking to and which domains it
/// covers.
async fn actions_handshake(
    State(state): State<AppState>,
    uri: Uri,
) -> Json<BaseResponse> {
    let info = &state.config.version;

    info!(
        target: "nova.actions",
        event_type = "actions_handshake",
        path = %uri.path(),
        "Actions handshake"
    );

    Json(BaseResponse::ok(
        json!({
            "nova_version": info.version,
            "master_doc_version": info.master_doc_version_or_unknown(),
            "supported_domains": SUPPORTED_DOMAINS,
        }),
        build_meta(info, None),
    ))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal(anyhow::anyhow!("handler panicked: {message}")).into_response()
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
