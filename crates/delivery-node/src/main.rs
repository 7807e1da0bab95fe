//! git-delivery - serve single files from remote git repositories over HTTP.
//!
//! This is the main entry point for running the delivery server.

use anyhow::Context;
use clap::Parser;
use delivery_git::GitCli;
use delivery_node::api::{create_router, AppState};
use delivery_node::config::{ServerConfig, DEFAULT_PORT};
use delivery_node::observability::{init_logging, LogFormat};
use delivery_node::server::{serve, shutdown_signal};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// git-delivery - fetch one file from a git host and stream it back
#[derive(Parser, Debug)]
#[command(name = "git-delivery")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Per-request deadline in seconds
    #[arg(long, default_value_t = 30)]
    fetch_timeout_secs: u64,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long, default_value_t = 10)]
    shutdown_grace_secs: u64,

    /// Git binary to run
    #[arg(long = "git", env = "GIT_BIN", default_value = "git")]
    git_program: PathBuf,

    /// Directory for per-request workspaces (defaults to the system temp dir)
    #[arg(long, env = "SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, json)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            listen_addr: SocketAddr::new(self.bind, self.port),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            git_program: self.git_program,
            scratch_dir: self.scratch_dir,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, LogFormat::parse(&args.log_format));

    let config = args.into_config();

    let (git, version) = GitCli::discover(&config.git_program)
        .await
        .with_context(|| format!("git binary {} is not usable", config.git_program.display()))?;
    tracing::info!(program = %git.program().display(), version = %version, "Found git");

    if let Some(dir) = &config.scratch_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create scratch directory {}", dir.display()))?;
    }

    let listen_addr = config.listen_addr;
    let grace = config.shutdown_grace;

    tracing::info!(
        addr = %listen_addr,
        fetch_timeout_secs = config.fetch_timeout.as_secs(),
        scratch_dir = %config.scratch_root().display(),
        "Server configuration"
    );

    let app = create_router(AppState::new(config, Arc::new(git)));

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;

    tracing::info!(addr = %listen_addr, "Starting git-delivery HTTP server");

    serve(listener, app, grace, shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["git-delivery"]).unwrap();
        let config = args.into_config();
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_grace, Duration::from_secs(10));
        assert_eq!(config.git_program, PathBuf::from("git"));
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::try_parse_from([
            "git-delivery",
            "--port",
            "9000",
            "--bind",
            "127.0.0.1",
            "--fetch-timeout-secs",
            "5",
            "--scratch-dir",
            "/var/tmp/delivery",
        ])
        .unwrap();
        let config = args.into_config();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.scratch_dir, Some(PathBuf::from("/var/tmp/delivery")));
    }
}
