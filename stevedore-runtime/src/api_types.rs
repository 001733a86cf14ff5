//! Serde request/response types for the Docker-compatible HTTP API.

use serde::{Deserialize, Serialize};

/// Platform filter for a multi-platform image, as carried in the
/// JSON-encoded `platform` query parameter.
///
/// Advisory input to the export engine. All fields are optional; the daemon
/// forwards the value without interpreting manifest-list semantics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// Query parameters accepted by `GET /images/{name}/get`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportImageQuery {
    /// JSON-encoded [`Platform`]. Decoded by the handler so a malformed
    /// value fails with 400 before any export work starts.
    #[serde(default)]
    pub platform: Option<String>,
}

/// Docker-compatible error envelope returned on every failure status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
}
