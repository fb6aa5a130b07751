//! Cross-cutting request handling: per-request logging and the error
//! envelope.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use nova_shared::{build_meta, ErrorResponse};
use tracing::{error, info};

use crate::api::AppState;
use crate::error::{ErrorKind, ErrorReport};

/// Upper bound when reading the text of a framework rejection.
const MAX_REJECTION_BODY: usize = 16 * 1024;

/// Log every call as one `api_call` event with its final status.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!(
        target: "nova.api",
        event_type = "api_call",
        method = %method,
        path = %path,
        status_code = response.status().as_u16(),
        "API call"
    );

    response
}

/// Render every failed response as an `ErrorResponse`.
///
/// Handler errors arrive with an [`ErrorReport`] extension. Error statuses
/// produced by axum itself (405, 415, 422, ...) have none; client errors keep
/// their rejection text as the message, server errors get the generic one
/// and are reported as 500.
pub async fn render_errors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;
    let mut status = response.status();

    let report = response.extensions_mut().remove::<ErrorReport>();
    let report = match report {
        Some(report) => report,
        None if status.is_client_error() => {
            let (parts, body) = response.into_parts();
            let text = axum::body::to_bytes(body, MAX_REJECTION_BODY)
                .await
                .ok()
                .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
                .unwrap_or_default();
            response = Response::from_parts(parts, Body::empty());

            let detail = match text.trim() {
                "" => status.canonical_reason().unwrap_or_default(),
                text => text,
            };
            ErrorReport::http(status, detail)
        }
        None if status.is_server_error() => {
            let report = ErrorReport::internal(format!("{status} returned without error detail"));
            status = StatusCode::INTERNAL_SERVER_ERROR;
            report
        }
        None => return response,
    };

    match report.kind {
        ErrorKind::Http => error!(
            target: "nova.api",
            event_type = "http_error",
            status_code = status.as_u16(),
            path = %path,
            detail = %report.detail,
            "HTTP error"
        ),
        ErrorKind::Internal => error!(
            target: "nova.errors",
            event_type = "unhandled_exception",
            status_code = status.as_u16(),
            path = %path,
            exc_info = %report.detail,
            "Unhandled exception"
        ),
    }

    let body = ErrorResponse {
        error: report.info,
        meta: build_meta(&state.config.version, None),
    };
    let mut rendered = (status, Json(body)).into_response();

    // Keep headers such as `Allow` on a 405.
    for (name, value) in response.headers() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }

    rendered
}
