use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_SCHEMA_VERSION, SYSTEM_NAME, UNKNOWN};

/// Static version block for the running process.
///
/// Loaded once at startup and never derived from a request. Every field but
/// `name` and `version` may be missing; consumers decide how to render that
/// (`null` in the envelope, `"unknown"` on `/version`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub build: Option<String>,
    pub build_date: Option<String>,
    pub api_schema_version: Option<String>,
    pub master_doc_version: Option<String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            name: SYSTEM_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build: None,
            build_date: None,
            api_schema_version: Some(DEFAULT_API_SCHEMA_VERSION.to_string()),
            master_doc_version: None,
        }
    }
}

impl VersionInfo {
    pub fn build_date_or_unknown(&self) -> &str {
        self.build_date.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn api_schema_version_or_default(&self) -> &str {
        self.api_schema_version
            .as_deref()
            .unwrap_or(DEFAULT_API_SCHEMA_VERSION)
    }

    pub fn master_doc_version_or_unknown(&self) -> &str {
        self.master_doc_version.as_deref().unwrap_or(UNKNOWN)
    }
}
