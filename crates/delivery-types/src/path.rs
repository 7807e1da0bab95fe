//! Paths inside a repository.

use crate::error::ParseError;

/// A slash-separated path to a file inside a repository.
///
/// The path is never empty and has no empty segments, so it can be joined
/// onto a checkout directory without ever becoming absolute. No `..`
/// normalization is done here; git's own pathspec handling is the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativeFilePath(String);

impl RelativeFilePath {
    /// Builds a path from its slash-joined form.
    pub fn new(path: impl Into<String>) -> Result<Self, ParseError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ParseError::MissingFilePath);
        }
        if path.split('/').any(str::is_empty) {
            return Err(ParseError::InvalidFilePath(path));
        }
        Ok(Self(path))
    }

    /// Builds a path by joining segments with `/`.
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Result<Self, ParseError> {
        Self::new(segments.into_iter().collect::<Vec<_>>().join("/"))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the path's segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl AsRef<str> for RelativeFilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelativeFilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
