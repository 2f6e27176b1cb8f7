//! Shared permission, snapshot, and payload types for DriveCord.
//!
//! A pure leaf crate: everything the shell core exchanges with the remote
//! API lives here as plain serde values, with no I/O and no internal
//! dependencies.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`Permissions`]   | Capability record per (user, drive)          |
//! | [`Rank`]          | Highest tier a record satisfies              |
//! | [`SnapshotEntry`] | One node of a structure snapshot             |
//! | [`Instance`]      | A drive the user can open                    |
//! | [`Member`]        | Drive member with optional permissions       |
//! | [`PulledObject`]  | Downloaded file or zipped directory          |
//! |-------------------|----------------------------------------------|

pub mod instance;
pub mod perms;
pub mod snapshot;

pub use instance::{Instance, InstanceId, Member, MemoryUsage, PulledObject, TraceHop};
pub use perms::{Permissions, PrivilegeCodeError, Rank};
pub use snapshot::{ENTRY_DIR, ENTRY_FILE, ROOT_NAME, ROOT_PATH, SnapshotEntry};
