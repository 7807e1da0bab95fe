//! Deadline-bound fetch orchestration.

use delivery_types::{RelativeFilePath, RepoReference};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchStage, ToolError};
use crate::tool::RepoTool;
use crate::tree::{TreeEntry, TreeInspection};

/// Drives a [`RepoTool`] through the four fetch stages.
#[derive(Clone)]
pub struct FetchOrchestrator {
    tool: Arc<dyn RepoTool>,
}

impl FetchOrchestrator {
    /// Creates an orchestrator over `tool`.
    pub fn new(tool: Arc<dyn RepoTool>) -> Self {
        Self { tool }
    }

    /// Fetches `file` from `repo` into `workdir`.
    ///
    /// Stages run strictly in order and share `deadline`. The tree listing
    /// must match exactly one blob before the checkout stage runs. On
    /// success the file exists at `workdir/file` and its tree entry is
    /// returned.
    pub async fn fetch(
        &self,
        repo: &RepoReference,
        file: &RelativeFilePath,
        workdir: &Path,
        deadline: Instant,
    ) -> Result<TreeEntry, FetchError> {
        let tool = self.tool.as_ref();

        run_stage(FetchStage::Clone, deadline, tool.clone_sparse(repo, workdir)).await?;

        run_stage(
            FetchStage::SparseInit,
            deadline,
            tool.init_sparse_checkout(repo, workdir),
        )
        .await?;

        let listing = run_stage(
            FetchStage::ListTree,
            deadline,
            tool.list_tree(repo, workdir, file),
        )
        .await?;

        let entry = TreeInspection::parse(&listing)?.into_blob(file.as_str())?;
        debug!(file = %file, object = %entry.object, mode = %entry.mode, "Tree entry resolved");

        run_stage(
            FetchStage::SparseSet,
            deadline,
            tool.set_sparse_checkout(repo, workdir, file),
        )
        .await?;

        Ok(entry)
    }
}

/// Runs one stage, dropping (and so killing) it when `deadline` passes.
async fn run_stage<T, F>(stage: FetchStage, deadline: Instant, operation: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, ToolError>>,
{
    let started = Instant::now();

    match tokio::time::timeout_at(deadline, operation).await {
        Ok(Ok(value)) => {
            debug!(
                stage = %stage,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Fetch stage completed"
            );
            Ok(value)
        }
        Ok(Err(source)) => {
            debug!(stage = %stage, error = %source, "Fetch stage failed");
            Err(FetchError::Tool { stage, source })
        }
        Err(_) => {
            warn!(
                stage = %stage,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Fetch stage exceeded deadline"
            );
            Err(FetchError::Timeout { stage })
        }
    }
}
