//! Virtual filesystem over a drive's structure snapshot.
//!
//! - [`Tree`] - arena of directories and files built from a snapshot
//! - [`NodeId`] - handle into one tree, invalid after a rebuild
//! - [`VfsError`] - navigation failures
//! - [`SnapshotError`] - a snapshot that cannot become a tree
//!
//! ## Design Decisions
//!
//! - **Rebuild, never patch**: the session swaps in a new tree after every
//!   structure fetch and re-resolves its working directory by path.
//! - **Ids, not pointers**: parent links are plain [`NodeId`]s, so the tree
//!   has a single owning direction and no reference cycles.

mod error;
mod tree;

pub use error::{SnapshotError, VfsError, VfsResult};
pub use tree::{Node, NodeId, NodeKind, Tree};
