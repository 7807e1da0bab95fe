//! Sparse single-file retrieval for git-delivery.
//!
//! The crate never speaks the git protocol itself. It drives an external
//! tool (the `git` binary in production, see [`GitCli`]) through a fixed
//! sequence of stages that fetch one blob without downloading history or
//! other file content:
//!
//! ```text
//! clone --filter=blob:none --depth=1 --sparse
//!   -> sparse-checkout init --cone
//!   -> ls-tree HEAD -- <file>      (must be exactly one blob)
//!   -> sparse-checkout set <file>
//! ```
//!
//! The tool sits behind the [`RepoTool`] trait so the orchestration can be
//! tested without spawning processes.

mod cli;
mod error;
mod orchestrator;
mod tool;
mod tree;

pub use cli::GitCli;
pub use error::{FetchError, FetchStage, ToolError};
pub use orchestrator::FetchOrchestrator;
pub use tool::RepoTool;
pub use tree::{ObjectKind, TreeEntry, TreeInspection};

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
