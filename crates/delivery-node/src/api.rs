//! HTTP API for git-delivery.
//!
//! A single catch-all route streams one file out of a remote repository:
//!
//! ```text
//! GET /{host}/{owner}/{repo}/{file...}
//! ```
//!
//! Every response carries permissive CORS headers and `OPTIONS` requests are
//! answered without touching the network.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use delivery_git::{FetchError, FetchOrchestrator, RepoTool};
use delivery_types::{resolve, Credentials, ParseError};
use std::sync::Arc;
use std::time::Instant;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::observability::request_id_middleware;
use crate::stream::serve_file;
use crate::workspace::Workspace;

/// Value of `Access-Control-Allow-Headers` on every response.
pub const CORS_ALLOW_HEADERS: &str =
    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Immutable server configuration.
    pub config: Arc<ServerConfig>,
    /// Fetch pipeline over the external tool.
    pub fetcher: FetchOrchestrator,
}

impl AppState {
    /// Creates state from a configuration and a repository tool.
    pub fn new(config: ServerConfig, tool: Arc<dyn RepoTool>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher: FetchOrchestrator::new(tool),
        }
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("could not parse path: {0}")]
    MalformedPath(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the status code the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Parse(_) | ApiError::MalformedPath(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Fetch(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Fetch(_) | ApiError::Workspace(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/{*path}", get(fetch_file).options(preflight))
        .fallback(root)
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET"),
        ))
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_header(name: HeaderName, value: HeaderValue) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, value)
}

/// CORS preflight: headers only, empty body.
async fn preflight(method: Method, uri: Uri) -> StatusCode {
    Completion::start(&method, &uri).finish(StatusCode::OK);
    StatusCode::OK
}

/// Requests for `/`, which names no repository.
async fn root(method: Method, uri: Uri) -> Response {
    if method == Method::OPTIONS {
        return preflight(method, uri).await.into_response();
    }

    let completion = Completion::start(&method, &uri);
    let response = ApiError::from(ParseError::Empty).into_response();
    completion.finish(response.status());
    response
}

/// Streams one file from a remote repository.
async fn fetch_file(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let completion = Completion::start(&method, &uri);

    let response = match deliver(&state, &method, &headers, path).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, status = %e.status(), "Request failed");
            e.into_response()
        }
    };

    completion.finish(response.status());
    response
}

async fn deliver(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let deadline = tokio::time::Instant::now() + state.config.fetch_timeout;

    let Path(path) = path.map_err(|e| ApiError::MalformedPath(e.body_text()))?;
    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(Credentials::from_authorization);

    let (repo, file) = resolve(&path, credentials)?;

    let workspace =
        Workspace::acquire_in(state.config.scratch_root()).map_err(ApiError::Workspace)?;

    let entry = state
        .fetcher
        .fetch(&repo, &file, workspace.path(), deadline)
        .await?;

    tracing::debug!(repo = %repo, file = %file, object = %entry.object, "Fetched blob");

    let response = serve_file(workspace.path(), &file, method, headers, deadline).await?;

    // The body holds an open handle, so the directory can go now.
    workspace.release();
    Ok(response)
}

/// Logs one completion line per request, including cancelled ones.
struct Completion {
    method: Method,
    path: String,
    started: Instant,
    status: Option<StatusCode>,
}

impl Completion {
    fn start(method: &Method, uri: &Uri) -> Self {
        Self {
            method: method.clone(),
            path: uri.path().to_string(),
            started: Instant::now(),
            status: None,
        }
    }

    fn finish(mut self, status: StatusCode) {
        self.status = Some(status);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        match self.status {
            Some(status) => tracing::info!(
                method = %self.method,
                path = %self.path,
                status = status.as_u16(),
                elapsed_ms = %format!("{elapsed_ms:.2}"),
                "Request finished"
            ),
            None => tracing::info!(
                method = %self.method,
                path = %self.path,
                elapsed_ms = %format!("{elapsed_ms:.2}"),
                "Request cancelled"
            ),
        }
    }
}
