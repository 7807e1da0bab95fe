//! Path parsing error types.

use thiserror::Error;

/// Errors produced while resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The path has no segments at all.
    #[error("invalid git repository: empty path")]
    Empty,

    /// The first segment is neither a known alias nor a host name.
    #[error("unsupported host: {0}")]
    UnsupportedHost(String),

    /// Host, owner and repository name are not all present.
    #[error("could not parse path: expected /{{host}}/{{owner}}/{{repo}}/{{file}}")]
    Incomplete,

    /// The path names a repository but no file inside it.
    #[error("could not parse path: no file path after repository")]
    MissingFilePath,

    /// The file path contains an empty segment.
    ///
    /// This includes a trailing slash (`/github/o/r/src/`) and doubled
    /// slashes (`a//b`); directory-style paths are rejected here rather
    /// than reported as not found.
    #[error("invalid file path: {0}")]
    InvalidFilePath(String),
}
