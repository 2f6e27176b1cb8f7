//! VFS error types.

use thiserror::Error;

/// Error from navigating the virtual tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// Path does not name anything reachable from the starting node.
    #[error("path not found: {0}")]
    NotFound(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// No valid structure snapshot has been loaded yet.
    #[error("drive structure is unavailable")]
    Unavailable,
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

/// A structure snapshot could not be turned into a tree.
///
/// Any of these voids the whole snapshot; no partial tree is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// An entry is missing `type`, `name` or `path`.
    #[error("malformed snapshot: {entry} entry is missing `{field}`")]
    MissingField {
        /// "directory", "file" or "root".
        entry: &'static str,
        field: &'static str,
    },

    /// Two siblings (of either kind) share a name.
    #[error("malformed snapshot: duplicate name `{name}` in {parent}")]
    DuplicateName { name: String, parent: String },
}

impl SnapshotError {
    pub(crate) fn missing(entry: &'static str, field: &'static str) -> Self {
        Self::MissingField { entry, field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        assert_eq!(
            VfsError::not_found("docs/missing.txt").to_string(),
            "path not found: docs/missing.txt"
        );
        let err = SnapshotError::DuplicateName {
            name: "a".into(),
            parent: "~/docs/".into(),
        };
        assert!(err.to_string().contains("`a`"));
        assert!(err.to_string().contains("~/docs/"));
        assert!(
            SnapshotError::missing("file", "path")
                .to_string()
                .contains("file entry is missing `path`")
        );
    }
}
