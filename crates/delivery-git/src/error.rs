//! Fetch error types.

use thiserror::Error;

/// The stages of a sparse single-file fetch, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Blob-filtered, shallow, sparse clone.
    Clone,
    /// Cone-mode sparse-checkout initialization.
    SparseInit,
    /// Tree listing of the requested path at `HEAD`.
    ListTree,
    /// Narrowing the sparse checkout to the requested path.
    SparseSet,
}

impl FetchStage {
    /// Returns the git subcommand the stage runs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStage::Clone => "clone",
            FetchStage::SparseInit => "sparse-checkout init",
            FetchStage::ListTree => "ls-tree",
            FetchStage::SparseSet => "sparse-checkout set",
        }
    }
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a single external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("{}", describe_exit(.status, .stderr))]
    Exit {
        /// Exit code, `None` when terminated by a signal.
        status: Option<i32>,
        /// Captured standard error, verbatim.
        stderr: String,
    },
}

fn describe_exit(status: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Errors that abort a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A stage's tool invocation failed.
    #[error("{stage} failed: {source}")]
    Tool {
        /// Stage that failed.
        stage: FetchStage,
        /// Tool failure.
        #[source]
        source: ToolError,
    },

    /// The deadline passed while a stage was running.
    #[error("{stage} timed out")]
    Timeout {
        /// Stage that was in flight.
        stage: FetchStage,
    },

    /// No tree entry matches the requested path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path matches more than one tree entry.
    #[error("not a single file: {path} matches {entries} entries")]
    Ambiguous {
        /// Requested path.
        path: String,
        /// Number of matching entries.
        entries: usize,
    },

    /// The path names something other than a blob.
    #[error("must be a blob: {path} is a {kind}")]
    NotABlob {
        /// Requested path.
        path: String,
        /// Object type reported by the tree listing.
        kind: String,
    },

    /// The tree listing could not be parsed.
    #[error("unexpected ls-tree output: {0}")]
    MalformedTree(String),
}

impl FetchError {
    /// Returns true when the requested path is not a single blob.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound(_) | FetchError::Ambiguous { .. } | FetchError::NotABlob { .. }
        )
    }

    /// Returns the stage the error was raised in.
    pub fn stage(&self) -> FetchStage {
        match self {
            FetchError::Tool { stage, .. } | FetchError::Timeout { stage } => *stage,
            FetchError::NotFound(_)
            | FetchError::Ambiguous { .. }
            | FetchError::NotABlob { .. }
            | FetchError::MalformedTree(_) => FetchStage::ListTree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_text_is_verbatim() {
        let err = FetchError::Tool {
            stage: FetchStage::Clone,
            source: ToolError::Exit {
                status: Some(128),
                stderr: "fatal: repository 'https://github.com/a/b/' not found\n".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "clone failed: fatal: repository 'https://github.com/a/b/' not found"
        );
    }

    #[test]
    fn test_exit_without_stderr() {
        let err = ToolError::Exit {
            status: Some(1),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "exit status 1");
    }

    #[test]
    fn test_not_found_classification() {
        assert!(FetchError::NotFound("x".into()).is_not_found());
        assert!(FetchError::NotABlob {
            path: "src".into(),
            kind: "tree".into()
        }
        .is_not_found());
        assert!(!FetchError::Timeout {
            stage: FetchStage::Clone
        }
        .is_not_found());
    }
}
