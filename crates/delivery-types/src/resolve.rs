//! Request path resolution.

use crate::error::ParseError;
use crate::path::RelativeFilePath;
use crate::repository::{Credentials, RepoReference};

/// Resolves a request path into a repository reference and a file path.
///
/// The path has the form `/{host}/{owner}/{repo}/{file...}`, where `{host}`
/// is an alias such as `github` or a fully-qualified host name. Credentials,
/// when given, are attached to the returned reference.
pub fn resolve(
    path: &str,
    credentials: Option<Credentials>,
) -> Result<(RepoReference, RelativeFilePath), ParseError> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        return Err(ParseError::Empty);
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 3 {
        return Err(ParseError::Incomplete);
    }

    let repo = RepoReference::new(segments[0], segments[1], segments[2])?
        .with_credentials(credentials);
    let file = RelativeFilePath::from_segments(segments[3..].iter().copied())?;

    Ok((repo, file))
}
