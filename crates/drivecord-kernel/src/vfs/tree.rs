//! The drive tree: an arena of directory and file nodes.
//!
//! Nodes live in a flat `Vec` owned by [`Tree`]; parents own their children
//! through [`NodeId`] lists and children point back with a plain id, so no
//! reference cycle exists. A tree is never patched: every refresh builds a
//! fresh one from a snapshot and ids from the old tree become meaningless.

use std::collections::HashSet;

use drivecord_types::{ROOT_NAME, ROOT_PATH, SnapshotEntry};

use super::error::{SnapshotError, VfsError, VfsResult};

/// Handle to a node inside one particular [`Tree`].
///
/// The default id is the root of any tree.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Directory or file payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Directory { dirs: Vec<NodeId>, files: Vec<NodeId> },
    File { size: u64 },
}

/// A single directory or file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    name: String,
    path: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    /// Entry name (not full path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical path from the drive root (`~/docs/`, `~/docs/a.txt`).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parent directory, `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Size in bytes for files, `None` for directories.
    pub fn file_size(&self) -> Option<u64> {
        match self.kind {
            NodeKind::File { size } => Some(size),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Child directories (empty for files).
    pub fn dirs(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { dirs, .. } => dirs,
            NodeKind::File { .. } => &[],
        }
    }

    /// Child files (empty for files).
    pub fn files(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { files, .. } => files,
            NodeKind::File { .. } => &[],
        }
    }
}

/// Immutable drive tree built from one structure snapshot.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    /// Aggregate size per node, indexed like `nodes`.
    sizes: Vec<u64>,
}

impl Tree {
    /// Build a tree from a snapshot.
    ///
    /// The root is always named `~` with path `~/`, whatever the snapshot's
    /// own root entry says, but that entry still has to carry `type`, `name`
    /// and `path`. Any entry missing one of them, or two siblings sharing a
    /// name, voids the whole build.
    ///
    /// Stored paths are rebuilt from the ancestors' names; the snapshot's
    /// `path` strings are only checked for presence.
    pub fn from_snapshot(snapshot: &SnapshotEntry) -> Result<Self, SnapshotError> {
        check_identified(snapshot, "root")?;

        let mut tree = Tree {
            nodes: vec![Node {
                name: ROOT_NAME.to_string(),
                path: ROOT_PATH.to_string(),
                parent: None,
                kind: NodeKind::Directory {
                    dirs: Vec::new(),
                    files: Vec::new(),
                },
            }],
            sizes: Vec::new(),
        };
        let root = tree.root();
        tree.load_children(root, snapshot)?;
        tree.sizes = tree.sum_sizes();
        Ok(tree)
    }

    /// One pass from the last node back to the root. Children are always
    /// pushed after their parent, so every child is final before it is added.
    fn sum_sizes(&self) -> Vec<u64> {
        let mut sizes: Vec<u64> = self
            .nodes
            .iter()
            .map(|node| node.file_size().unwrap_or(0))
            .collect();
        for index in (1..self.nodes.len()).rev() {
            if let Some(parent) = self.nodes[index].parent {
                sizes[parent.0] = sizes[parent.0].saturating_add(sizes[index]);
            }
        }
        sizes
    }

    fn load_children(&mut self, parent: NodeId, entry: &SnapshotEntry) -> Result<(), SnapshotError> {
        let mut seen = HashSet::new();
        let mut dirs = Vec::with_capacity(entry.dirs.len());
        let mut files = Vec::with_capacity(entry.files.len());

        for dir in &entry.dirs {
            let name = check_identified(dir, "directory")?;
            self.claim_name(&mut seen, name, parent)?;
            let id = self.push(name, parent, NodeKind::Directory {
                dirs: Vec::new(),
                files: Vec::new(),
            });
            self.load_children(id, dir)?;
            dirs.push(id);
        }

        for file in &entry.files {
            let name = check_identified(file, "file")?;
            self.claim_name(&mut seen, name, parent)?;
            let size = file.size.unwrap_or(0);
            files.push(self.push(name, parent, NodeKind::File { size }));
        }

        self.nodes[parent.0].kind = NodeKind::Directory { dirs, files };
        Ok(())
    }

    fn claim_name<'a>(
        &self,
        seen: &mut HashSet<&'a str>,
        name: &'a str,
        parent: NodeId,
    ) -> Result<(), SnapshotError> {
        if seen.insert(name) {
            Ok(())
        } else {
            Err(SnapshotError::DuplicateName {
                name: name.to_string(),
                parent: self.node(parent).path.clone(),
            })
        }
    }

    fn push(&mut self, name: &str, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut path = format!("{}{name}", self.node(parent).path);
        if matches!(kind, NodeKind::Directory { .. }) {
            path.push('/');
        }
        self.nodes.push(Node {
            name: name.to_string(),
            path,
            parent: Some(parent),
            kind,
        });
        id
    }

    /// The drive's base directory.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Look up a node.
    ///
    /// Panics if `id` was produced by a different tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Look up a node, `None` if `id` is out of range for this tree.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always contains at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All node ids, root first, parents before their children.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Child directory or file called `name`, directories searched first.
    pub fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(dir);
        node.dirs()
            .iter()
            .chain(node.files())
            .copied()
            .find(|&id| self.node(id).name == name)
    }

    /// Resolve `path` starting at `from`.
    ///
    /// Backslashes count as slashes and empty segments are dropped. `~` is
    /// only legal as the first segment and jumps to the root, `.` stays put
    /// and `..` climbs one level (staying at the root when already there).
    /// Nothing may follow a file.
    pub fn resolve(&self, from: NodeId, path: &str) -> VfsResult<NodeId> {
        let normalized = path.replace('\\', "/");
        let mut current = from;

        for (index, segment) in normalized.split('/').filter(|s| !s.is_empty()).enumerate() {
            if segment == ROOT_NAME {
                if index != 0 {
                    return Err(VfsError::not_found(path));
                }
                current = self.root();
                continue;
            }

            if self.node(current).is_file() {
                return Err(VfsError::not_found(path));
            }

            match segment {
                "." => {}
                ".." => current = self.node(current).parent.unwrap_or(current),
                name => {
                    current = self
                        .child(current, name)
                        .ok_or_else(|| VfsError::not_found(path))?;
                }
            }
        }

        Ok(current)
    }

    /// Resolve `path` and require the result to be a directory.
    pub fn resolve_dir(&self, from: NodeId, path: &str) -> VfsResult<NodeId> {
        let id = self.resolve(from, path)?;
        if self.node(id).is_dir() {
            Ok(id)
        } else {
            Err(VfsError::not_a_directory(path))
        }
    }

    /// Resolve `path` and require the result to be a file.
    pub fn resolve_file(&self, from: NodeId, path: &str) -> VfsResult<NodeId> {
        let id = self.resolve(from, path)?;
        if self.node(id).is_file() {
            Ok(id)
        } else {
            Err(VfsError::is_a_directory(path))
        }
    }

    /// Total bytes stored under `id`: its own size for a file, the recursive
    /// sum of all files for a directory. Computed once when the tree is built.
    pub fn aggregate_size(&self, id: NodeId) -> u64 {
        self.sizes[id.0]
    }

    /// Rebuild a node's path from its ancestors' names.
    ///
    /// Directories end with `/`, files do not; the root is `~/`.
    pub fn derive_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(next) = current {
            let node = self.node(next);
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        names.reverse();

        let mut path = String::from(ROOT_PATH);
        path.push_str(&names.join("/"));
        if self.node(id).is_dir() && !names.is_empty() {
            path.push('/');
        }
        path
    }
}

/// The entry's name, once `type`, `name` and `path` are all present.
fn check_identified<'a>(
    entry: &'a SnapshotEntry,
    what: &'static str,
) -> Result<&'a str, SnapshotError> {
    if entry.kind.is_none() {
        return Err(SnapshotError::missing(what, "type"));
    }
    let name = entry
        .name
        .as_deref()
        .ok_or(SnapshotError::missing(what, "name"))?;
    if entry.path.is_none() {
        return Err(SnapshotError::missing(what, "path"));
    }
    Ok(name)
}
