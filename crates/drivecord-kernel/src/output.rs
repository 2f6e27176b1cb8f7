//! Render-ready output emitted by the shell core.
//!
//! The core never styles text. Handlers and the dispatch loop emit
//! [`Output`] values and the frontend decides how they look: colors,
//! box drawing, icons.

use drivecord_types::{Rank, TraceHop};
use serde::{Deserialize, Serialize};

use crate::vfs::{NodeId, Tree};

// ============================================================================
// Output
// ============================================================================

/// One piece of output for the frontend to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// An operation completed.
    Success { message: String },
    /// A recoverable failure (parse error, denied command, handler failure).
    Error { message: String },
    /// Something worth noticing that did not fail.
    Warning { message: String },
    /// Plain informational text.
    Info { message: String },
    /// Directory listing in tree form.
    Tree(TreeView),
    /// Titled, grouped list (commands, members, usage).
    List(ListView),
    /// Full documentation of a single command.
    CommandHelp(CommandDoc),
    /// File content to display.
    FileContent { name: String, text: String },
    /// Storage trace of a file, first hop is the header.
    Trace { hops: Vec<TraceHop> },
}

impl Output {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning { message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Info { message: message.into() }
    }
}

/// Prompt contents for one read of the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub rank: Rank,
    pub instance: String,
    pub cwd: String,
}

// ============================================================================
// Tree view
// ============================================================================

/// Entry type for colorizing listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    File,
    Directory,
}

/// One line of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Nesting level, 0 for direct children of the listed directory.
    pub depth: usize,
    pub kind: EntryType,
    pub name: String,
    /// File size, or aggregate size for directories.
    pub size: u64,
    /// Last directory among its siblings (drives `╰─` vs `├─`).
    pub last: bool,
}

/// A directory listing: files first, then directories, each directory
/// followed by its own contents when `recursive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeView {
    pub root: String,
    pub recursive: bool,
    pub entries: Vec<TreeEntry>,
}

impl TreeView {
    /// Lay out `dir` of `tree`.
    pub fn build(tree: &Tree, dir: NodeId, recursive: bool) -> Self {
        let mut entries = Vec::new();
        // (node, depth, last) in display order; pushed reversed onto the stack
        let mut stack: Vec<(NodeId, usize, bool)> = Vec::new();
        push_children(tree, dir, 0, false, &mut stack);

        while let Some((id, depth, last)) = stack.pop() {
            let node = tree.node(id);
            let kind = if node.is_dir() {
                EntryType::Directory
            } else {
                EntryType::File
            };
            entries.push(TreeEntry {
                depth,
                kind,
                name: node.name().to_string(),
                size: tree.aggregate_size(id),
                last,
            });
            if recursive && node.is_dir() {
                push_children(tree, id, depth + 1, true, &mut stack);
            }
        }

        Self {
            root: tree.node(dir).path().to_string(),
            recursive,
            entries,
        }
    }
}

fn push_children(
    tree: &Tree,
    dir: NodeId,
    depth: usize,
    mark_last: bool,
    stack: &mut Vec<(NodeId, usize, bool)>,
) {
    let node = tree.node(dir);
    let dirs = node.dirs();
    let mut ordered: Vec<(NodeId, usize, bool)> = node
        .files()
        .iter()
        .map(|&id| (id, depth, false))
        .collect();
    ordered.extend(
        dirs.iter()
            .enumerate()
            .map(|(i, &id)| (id, depth, mark_last && i + 1 == dirs.len())),
    );
    stack.extend(ordered.into_iter().rev());
}

// ============================================================================
// List view
// ============================================================================

/// A titled list split into groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListView {
    pub title: String,
    pub groups: Vec<ListGroup>,
}

impl ListView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            groups: Vec::new(),
        }
    }

    /// Start a new group.
    pub fn group(mut self, label: impl Into<String>) -> Self {
        self.groups.push(ListGroup {
            label: Some(label.into()),
            items: Vec::new(),
        });
        self
    }

    /// Append to the current group (an unlabeled one if none was started).
    pub fn item(mut self, item: ListItem) -> Self {
        if self.groups.is_empty() {
            self.groups.push(ListGroup {
                label: None,
                items: Vec::new(),
            });
        }
        if let Some(group) = self.groups.last_mut() {
            group.items.push(item);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListGroup {
    pub label: Option<String>,
    pub items: Vec<ListItem>,
}

/// One list row: a highlighted label with optional detail, note and rank badge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub label: String,
    pub detail: Option<String>,
    pub note: Option<String>,
    pub rank: Option<Rank>,
    /// Render de-emphasized (unregistered members).
    pub dimmed: bool,
}

impl ListItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_rank(mut self, rank: Option<Rank>) -> Self {
        self.rank = rank;
        self
    }

    pub fn dimmed(mut self) -> Self {
        self.dimmed = true;
        self
    }
}

// ============================================================================
// Command documentation
// ============================================================================

/// Everything `help <command>` shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDoc {
    pub name: String,
    pub group: String,
    pub aliases: Vec<String>,
    pub params: Vec<ParamDoc>,
    pub rank: Option<Rank>,
    pub docs: String,
}

/// One parameter in [`CommandDoc`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDoc {
    pub name: String,
    pub type_name: String,
    /// Rendered default, `None` for required parameters.
    pub default: Option<String>,
}

impl ParamDoc {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

// ============================================================================
// Sizes
// ============================================================================

/// Human-readable byte count: `10b`, `1.5Kb`, `2Mb`.
///
/// One decimal place, dropped when it is zero.
pub fn format_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in ["", "K", "M", "G"] {
        if num < 1024.0 {
            return format!("{}{unit}b", trim_decimal(num));
        }
        num /= 1024.0;
    }
    format!("{num:.1}Tb")
}

fn trim_decimal(num: f64) -> String {
    let rounded = format!("{num:.1}");
    match rounded.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => rounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivecord_types::SnapshotEntry;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0b");
        assert_eq!(format_size(10), "10b");
        assert_eq!(format_size(1024), "1Kb");
        assert_eq!(format_size(1536), "1.5Kb");
        assert_eq!(format_size(5 * 1024 * 1024), "5Mb");
        assert_eq!(format_size(3 * 1024u64.pow(4)), "3.0Tb");
    }

    fn tree() -> Tree {
        let snapshot = SnapshotEntry::root()
            .with_file(SnapshotEntry::file("top.md", "~/top.md", 5))
            .with_dir(
                SnapshotEntry::dir("docs", "~/docs/")
                    .with_file(SnapshotEntry::file("a.txt", "~/docs/a.txt", 10))
                    .with_dir(SnapshotEntry::dir("x", "~/docs/x/"))
                    .with_dir(SnapshotEntry::dir("y", "~/docs/y/")),
            )
            .with_dir(SnapshotEntry::dir("empty", "~/empty/"));
        Tree::from_snapshot(&snapshot).unwrap()
    }

    #[test]
    fn test_flat_tree_view() {
        let tree = tree();
        let view = TreeView::build(&tree, tree.root(), false);
        assert_eq!(view.root, "~/");
        let names: Vec<_> = view.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["top.md", "docs", "empty"]);
        assert!(view.entries.iter().all(|e| e.depth == 0 && !e.last));
        assert_eq!(view.entries[1].size, 10);
        assert_eq!(view.entries[1].kind, EntryType::Directory);
    }

    #[test]
    fn test_recursive_tree_view() {
        let tree = tree();
        let view = TreeView::build(&tree, tree.root(), true);
        let lines: Vec<_> = view
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.depth, e.last))
            .collect();
        assert_eq!(
            lines,
            [
                ("top.md", 0, false),
                ("docs", 0, false),
                ("a.txt", 1, false),
                ("x", 1, false),
                ("y", 1, true),
                ("empty", 0, false),
            ]
        );
    }

    #[test]
    fn test_list_view_groups() {
        let view = ListView::new("Members")
            .item(ListItem::new("loose"))
            .group("Registered: 1")
            .item(ListItem::new("amy").with_rank(Some(Rank::Owner)))
            .group("Unregistered: 1")
            .item(ListItem::new("bob").dimmed());
        assert_eq!(view.groups.len(), 3);
        assert_eq!(view.groups[0].label, None);
        assert_eq!(view.groups[1].items[0].rank, Some(Rank::Owner));
        assert!(view.groups[2].items[0].dimmed);
    }

    #[test]
    fn test_output_serialization() {
        let json = serde_json::to_string(&Output::success("done")).unwrap();
        assert!(json.contains("\"type\":\"success\""));
        let parsed: Output = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Output::success("done"));
    }
}
