//! # Delivery Node
//!
//! HTTP server that streams a single file out of a remote git repository
//! without cloning its history or its other files.
//!
//! ## Request pipeline
//!
//! ```text
//! GET /github/octocat/Hello-World/README
//!   -> resolve path        (delivery_types::resolve)
//!   -> acquire workspace   (workspace::Workspace)
//!   -> sparse fetch        (delivery_git::FetchOrchestrator)
//!   -> stream file         (stream::serve_file)
//!   -> release workspace
//! ```
//!
//! Every request is independent: it gets its own temporary directory and
//! its own deadline, and nothing is cached between requests.
//!
//! ## Modules
//!
//! - [`api`] - Router, request handler and error mapping
//! - [`config`] - Server configuration
//! - [`observability`] - Structured logging and request IDs
//! - [`server`] - Listener lifecycle and graceful shutdown
//! - [`stream`] - Conditional and range-aware file responses
//! - [`workspace`] - Per-request scratch directories
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use delivery_git::GitCli;
//! use delivery_node::api::{create_router, AppState};
//! use delivery_node::config::ServerConfig;
//!
//! let state = AppState::new(ServerConfig::default(), Arc::new(GitCli::default()));
//! let app = create_router(state);
//! ```

pub mod api;
pub mod config;
pub mod observability;
pub mod server;
pub mod stream;
pub mod workspace;
