//! The external repository tool capability.

use async_trait::async_trait;
use delivery_types::{RelativeFilePath, RepoReference};
use std::path::Path;

use crate::error::ToolError;

/// Operations the fetch pipeline needs from a version-control tool.
///
/// Every method receives the repository reference because a blob-filtered
/// clone fetches missing blobs lazily, so any stage may talk to the remote
/// and need its credentials. Dropping a returned future must stop the
/// underlying work.
#[async_trait]
pub trait RepoTool: Send + Sync {
    /// Clones `repo` into the empty directory `dest` without blobs or history.
    async fn clone_sparse(&self, repo: &RepoReference, dest: &Path) -> Result<(), ToolError>;

    /// Enables cone-mode sparse checkout in `dir`.
    async fn init_sparse_checkout(&self, repo: &RepoReference, dir: &Path)
        -> Result<(), ToolError>;

    /// Lists the `HEAD` tree entries matching `file`, as raw tool output.
    async fn list_tree(
        &self,
        repo: &RepoReference,
        dir: &Path,
        file: &RelativeFilePath,
    ) -> Result<Vec<u8>, ToolError>;

    /// Narrows the sparse checkout to `file` and materializes it in `dir`.
    async fn set_sparse_checkout(
        &self,
        repo: &RepoReference,
        dir: &Path,
        file: &RelativeFilePath,
    ) -> Result<(), ToolError>;
}
