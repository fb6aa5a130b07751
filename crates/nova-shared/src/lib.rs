//! # nova-shared
//!
//! Types shared by every Nova crate: the JSON response envelope, the static
//! version block that feeds it, and process-wide constants.

pub mod constants;
pub mod envelope;
pub mod version;

pub use envelope::{build_meta, BaseResponse, ErrorInfo, ErrorResponse, Meta};
pub use version::VersionInfo;
