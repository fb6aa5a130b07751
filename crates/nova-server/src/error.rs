use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nova_shared::ErrorInfo;
use nova_store::StoreError;
use thiserror::Error;

/// Message returned for every failure we do not want to describe to clients.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Fallback message for HTTP errors raised without detail.
pub const HTTP_ERROR_MESSAGE: &str = "HTTP error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// A handler deliberately answering with a specific status.
    #[error("HTTP {status}: {detail}")]
    Http { status: StatusCode, detail: String },

    /// Persistence failures surface here untouched by intermediate layers.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn http(status: StatusCode, detail: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, detail)
    }
}

/// What went wrong, attached to the response as an extension.
///
/// The envelope middleware turns it into an `ErrorResponse` body (it owns the
/// version info needed for `meta`) and logs it with the request path.
/// `detail` is for the server log only.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub info: ErrorInfo,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Http,
    Internal,
}

impl ErrorReport {
    pub fn http(status: StatusCode, detail: &str) -> Self {
        let message = if detail.trim().is_empty() {
            HTTP_ERROR_MESSAGE
        } else {
            detail
        };
        Self {
            kind: ErrorKind::Http,
            info: ErrorInfo::new(format!("http_{}", status.as_u16()), message),
            detail: detail.to_string(),
        }
    }

    pub fn internal(detail: String) -> Self {
        Self {
            kind: ErrorKind::Internal,
            info: ErrorInfo::new("internal_error", INTERNAL_ERROR_MESSAGE),
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, report) = match &self {
            ApiError::Http { status, detail } => (*status, ErrorReport::http(*status, detail)),
            ApiError::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorReport::internal(format!("[{}] {}", e.kind(), error_chain(e))),
            ),
            // `{:?}` on anyhow prints the whole cause chain and backtrace
            ApiError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorReport::internal(format!("{e:?}")),
            ),
        };

        let mut response = status.into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// `outer: inner: root` rendering of an error and its sources.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_report() {
        let response = ApiError::not_found("No such budget").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.kind, ErrorKind::Http);
        assert_eq!(report.info.code, "http_404");
        assert_eq!(report.info.message, "No such budget");
    }

    #[test]
    fn test_empty_detail_uses_fallback() {
        let response = ApiError::http(StatusCode::CONFLICT, "").into_response();
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.info.code, "http_409");
        assert_eq!(report.info.message, HTTP_ERROR_MESSAGE);
    }

    #[test]
    fn test_store_error_is_internal_and_opaque() {
        let err = ApiError::from(StoreError::Configuration(
            "Database URL not configured".into(),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.info.code, "internal_error");
        assert_eq!(report.info.message, INTERNAL_ERROR_MESSAGE);
        assert!(report.detail.contains("configuration_error"));
        assert!(report.detail.contains("Database URL not configured"));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "nova.db",
        ));
        let chain = error_chain(&err);
        assert!(chain.starts_with("IO error: nova.db: "));
        assert!(chain.ends_with("nova.db"));
    }
}
