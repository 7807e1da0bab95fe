//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default ceiling on the time a single request may spend fetching and streaming.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time in-flight requests get to finish after a shutdown signal.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Configuration for the delivery server.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen_addr: SocketAddr,
    /// Per-request deadline for the fetch and the response body.
    pub fetch_timeout: Duration,
    /// Grace period for in-flight requests on shutdown.
    pub shutdown_grace: Duration,
    /// Path or name of the git binary.
    pub git_program: PathBuf,
    /// Directory request workspaces are created in; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            git_program: PathBuf::from("git"),
            scratch_dir: None,
        }
    }
}

impl ServerConfig {
    /// Sets the per-request deadline.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the workspace root.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Returns the directory workspaces are created in.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
