//! Listener lifecycle and graceful shutdown.

use axum::Router;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// After `shutdown` the listener stops accepting connections and in-flight
/// requests get `grace` to finish before the server task is aborted.
pub async fn serve<F>(listener: TcpListener, app: Router, grace: Duration, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(token.clone().cancelled_owned());
    let mut server = tokio::spawn(async move { graceful.await });

    tokio::select! {
        result = &mut server => return flatten(result),
        _ = shutdown => {}
    }

    tracing::info!(grace_secs = grace.as_secs(), "Shutting down HTTP server");
    token.cancel();

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => flatten(result),
        Err(_) => {
            tracing::warn!("Grace period elapsed, closing remaining connections");
            server.abort();
            Ok(())
        }
    }
}

fn flatten(result: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    result.map_err(io::Error::other)?
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
