//! Tree listing inspection.
//!
//! Parses `git ls-tree` output, in either its newline-terminated or `-z`
//! form. Each record looks like
//!
//! ```text
//! <mode> SP <type> SP <object>[ SP <size>] TAB <path>
//! ```

use crate::error::FetchError;

/// Object type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// File content.
    Blob,
    /// Directory.
    Tree,
    /// Submodule commit.
    Commit,
}

impl ObjectKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(ObjectKind::Blob),
            "tree" => Some(ObjectKind::Tree),
            "commit" => Some(ObjectKind::Commit),
            _ => None,
        }
    }

    /// Returns the type name used by git.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

/// A single `ls-tree` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File mode, e.g. `100644`.
    pub mode: String,
    /// Object type.
    pub kind: ObjectKind,
    /// Object id (hex).
    pub object: String,
    /// Object size, present only in long listings of blobs.
    pub size: Option<u64>,
    /// Path relative to the repository root.
    pub path: String,
}

impl TreeEntry {
    fn parse(record: &str) -> Result<Self, FetchError> {
        let malformed = || FetchError::MalformedTree(record.to_string());

        let (meta, path) = record.split_once('\t').ok_or_else(malformed)?;
        let mut fields = meta.split_whitespace();

        let mode = fields.next().ok_or_else(malformed)?;
        let kind = fields
            .next()
            .and_then(ObjectKind::parse)
            .ok_or_else(malformed)?;
        let object = fields.next().ok_or_else(malformed)?;
        let size = match fields.next() {
            Some("-") | None => None,
            Some(size) => Some(size.parse().map_err(|_| malformed())?),
        };

        Ok(Self {
            mode: mode.to_string(),
            kind,
            object: object.to_string(),
            size,
            path: path.to_string(),
        })
    }
}

/// The entries matched by a tree listing for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeInspection {
    entries: Vec<TreeEntry>,
}

impl TreeInspection {
    /// Parses raw `ls-tree` output.
    pub fn parse(output: &[u8]) -> Result<Self, FetchError> {
        let text = String::from_utf8_lossy(output);
        let separator = if text.contains('\0') { '\0' } else { '\n' };

        let entries = text
            .split(separator)
            .filter(|record| !record.is_empty())
            .map(TreeEntry::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// Returns the number of matched entries.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the matched entries.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Accepts the listing only if it is exactly one blob.
    pub fn into_blob(mut self, path: &str) -> Result<TreeEntry, FetchError> {
        match self.entries.len() {
            0 => Err(FetchError::NotFound(path.to_string())),
            1 => {
                let entry = self.entries.remove(0);
                if entry.kind == ObjectKind::Blob {
                    Ok(entry)
                } else {
                    Err(FetchError::NotABlob {
                        path: path.to_string(),
                        kind: entry.kind.as_str().to_string(),
                    })
                }
            }
            entries => Err(FetchError::Ambiguous {
                path: path.to_string(),
                entries,
            }),
        }
    }
}
