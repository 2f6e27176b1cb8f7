//! Structure snapshot entries as the server sends them.
//!
//! Every identifying field is optional at this layer: the wire payload is
//! taken as-is and validation happens when the kernel builds a tree from it,
//! so a single malformed entry can void the whole snapshot.

use serde::{Deserialize, Serialize};

/// Entry type tag for directories.
pub const ENTRY_DIR: &str = "D";
/// Entry type tag for files.
pub const ENTRY_FILE: &str = "F";
/// Name of the drive's base directory.
pub const ROOT_NAME: &str = "~";
/// Canonical path of the drive's base directory.
pub const ROOT_PATH: &str = "~/";

/// One directory or file in a structure snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub dirs: Vec<SnapshotEntry>,
    #[serde(default)]
    pub files: Vec<SnapshotEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl SnapshotEntry {
    /// A directory entry with no children.
    pub fn dir(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: Some(path.into()),
            kind: Some(ENTRY_DIR.to_string()),
            ..Default::default()
        }
    }

    /// A file entry.
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: Some(name.into()),
            path: Some(path.into()),
            kind: Some(ENTRY_FILE.to_string()),
            size: Some(size),
            ..Default::default()
        }
    }

    /// The drive's base directory with no children.
    pub fn root() -> Self {
        Self::dir(ROOT_NAME, ROOT_PATH)
    }

    /// Add a child directory.
    pub fn with_dir(mut self, dir: SnapshotEntry) -> Self {
        self.dirs.push(dir);
        self
    }

    /// Add a child file.
    pub fn with_file(mut self, file: SnapshotEntry) -> Self {
        self.files.push(file);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_server_payload() {
        let json = r#"{
            "name": "~", "path": "~/", "type": "D",
            "dirs": [{
                "name": "docs", "path": "~/docs/", "type": "D", "dirs": [],
                "files": [{"name": "a.txt", "path": "~/docs/a.txt", "type": "F", "size": 10}]
            }],
            "files": []
        }"#;
        let root: SnapshotEntry = serde_json::from_str(json).unwrap();
        assert_eq!(root.path.as_deref(), Some("~/"));
        assert_eq!(root.kind.as_deref(), Some(ENTRY_DIR));
        assert_eq!(root.dirs.len(), 1);
        let file = &root.dirs[0].files[0];
        assert_eq!(file.name.as_deref(), Some("a.txt"));
        assert_eq!(file.kind.as_deref(), Some(ENTRY_FILE));
        assert_eq!(file.size, Some(10));
    }

    #[test]
    fn test_missing_fields_survive_decoding() {
        let entry: SnapshotEntry = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(entry.kind.is_none());
        assert!(entry.path.is_none());
        assert!(entry.dirs.is_empty());
    }

    #[test]
    fn test_builders() {
        let root = SnapshotEntry::root()
            .with_dir(SnapshotEntry::dir("docs", "~/docs/"))
            .with_file(SnapshotEntry::file("a.txt", "~/a.txt", 3));
        assert_eq!(root.name.as_deref(), Some(ROOT_NAME));
        assert_eq!(root.dirs[0].kind.as_deref(), Some(ENTRY_DIR));
        assert_eq!(root.files[0].size, Some(3));
    }
}
