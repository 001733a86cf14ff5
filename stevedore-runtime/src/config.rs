//! Daemon configuration loaded once at startup from environment variables.

use std::env;

use once_cell::sync::OnceCell;

use crate::{DEFAULT_API_PORT, DEFAULT_BIND_HOST, DEFAULT_EXPORT_PIPE_BYTES, DEFAULT_NAMESPACE};

/// Runtime configuration for the daemon.
///
/// The namespace configured here scopes every request; it is handed to the
/// export service as an explicit constructor argument rather than read
/// ambiently, so components stay testable by substitution.
#[derive(Clone, Debug)]
pub struct DaemonConfig {
    /// Namespace every image operation is scoped to.
    pub namespace: String,
    /// Address the API server binds.
    pub bind_host: String,
    pub api_port: u16,
    /// Docker endpoint override; local socket when unset.
    pub docker_host: Option<String>,
    /// Capacity of the pipe between the export engine and the response body.
    pub export_pipe_bytes: usize,
}

static DAEMON_CONFIG: OnceCell<DaemonConfig> = OnceCell::new();

impl DaemonConfig {
    /// Load configuration from environment variables.
    /// Cached after the first call — subsequent calls return the same config.
    pub fn load() -> &'static DaemonConfig {
        DAEMON_CONFIG.get_or_init(Self::from_env)
    }

    /// Read the current environment, falling back to defaults for absent or
    /// unparsable values. Prefer [`DaemonConfig::load`] outside tests.
    pub fn from_env() -> DaemonConfig {
        let namespace = env::var("STEVEDORE_NAMESPACE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let bind_host = env::var("STEVEDORE_BIND_HOST")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());
        let api_port = env::var("STEVEDORE_API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_API_PORT);
        let docker_host = env::var("DOCKER_HOST").ok().filter(|v| !v.trim().is_empty());
        let export_pipe_bytes = env::var("STEVEDORE_EXPORT_PIPE_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_EXPORT_PIPE_BYTES);

        DaemonConfig {
            namespace,
            bind_host,
            api_port,
            docker_host,
            export_pipe_bytes,
        }
    }
}
