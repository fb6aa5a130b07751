//! The standard JSON envelope wrapped around every Nova response.
//!
//! Successful calls return a [`BaseResponse`], failures an [`ErrorResponse`].
//! Both carry a [`Meta`] block built by [`build_meta`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::version::VersionInfo;

/// Metadata block attached to every enveloped response.
///
/// Optional fields serialize as `null` rather than being skipped so clients
/// can rely on the keys being present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Set when the response is built, never taken from the client.
    pub timestamp: DateTime<Utc>,
    /// Reserved for request correlation. Always `None` for now.
    pub request_id: Option<String>,
    pub nova_version: Option<String>,
    pub build: Option<String>,
    pub api_schema_version: Option<String>,
    pub master_doc_version: Option<String>,
}

/// Success wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseResponse {
    pub status: String,
    pub data: Value,
    pub meta: Meta,
}

impl BaseResponse {
    pub fn ok(data: Value, meta: Meta) -> Self {
        Self {
            status: "ok".to_string(),
            data,
            meta,
        }
    }
}

/// Machine-readable code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Error wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
    pub meta: Meta,
}

/// Build a [`Meta`] block from the process version info and the current time.
pub fn build_meta(version: &VersionInfo, request_id: Option<String>) -> Meta {
    Meta {
        timestamp: Utc::now(),
        request_id,
        nova_version: Some(version.version.clone()),
        build: version.build.clone(),
        api_schema_version: version.api_schema_version.clone(),
        master_doc_version: version.master_doc_version.clone(),
    }
}
