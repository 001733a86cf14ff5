//! Core runtime for the stevedore container daemon.
//!
//! Stevedore exposes a Docker-compatible HTTP API; this crate implements the
//! image-export slice: namespace-scoped name resolution and unbuffered
//! streaming of an OCI-compatible tar archive into the HTTP response.

pub mod api;
pub mod api_types;
pub mod config;
pub mod docker;
pub mod error;
pub mod export;
pub mod metrics;
pub mod store;

pub use api::{ApiState, api_router};
pub use api_types::Platform;
pub use config::DaemonConfig;
pub use error::DaemonError;
pub use export::{ExportEngine, ImageExportService};
pub use store::{ImageRecord, ImageStore, Namespace};

pub const DEFAULT_NAMESPACE: &str = "stevedore";
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 2375;
pub const DEFAULT_EXPORT_PIPE_BYTES: usize = 64 * 1024;
