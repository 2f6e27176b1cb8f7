//! DriveCord shell core.
//!
//! Everything between a line of user input and a call to the drive API:
//! the virtual tree, the command registry, the parser and the session loop.
//! Transport and terminal rendering plug in through [`DriveApi`] and
//! [`Frontend`].
//!
//! # Architecture
//!
//! ```text
//!  Frontend ──line──▶ ShellSession ──parse──▶ CommandRegistry
//!     ▲                   │  │                     │
//!     │                   │  └──rank check◀── Invocation
//!     └──── Output ◀──────┤
//!                         ├──▶ Tree (cwd, resolve)
//!                         └──▶ DriveApi (remote state)
//! ```
//!
//! # Key Types
//!
//! |--------------------|------------------------------------------------|
//! | Type               | Purpose                                        |
//! |--------------------|------------------------------------------------|
//! | [`ShellSession`]   | Selected drive, rank, tree, cwd, the loop      |
//! | [`Tree`]           | Arena of directories and files from a snapshot |
//! | [`CommandRegistry`]| Commands by name or alias                      |
//! | [`Invocation`]     | Parsed command waiting for the rank check      |
//! | [`DriveApi`]       | Remote operations                              |
//! | [`Frontend`]       | Input, selection, editing, rendering           |
//! | [`MemoryDrive`]    | In-process [`DriveApi`]                        |
//! |--------------------|------------------------------------------------|

pub mod api;
pub mod commands;
pub mod downloads;
pub mod frontend;
pub mod memory;
pub mod output;
pub mod session;
pub mod vfs;

pub use api::{ApiError, ApiResult, DriveApi};
pub use commands::{
    Arguments, Command, CommandError, CommandGroup, CommandRegistry, CommandResult, Invocation,
    ParamType, Parameter, ParseError, RegistryError, Value, parse,
};
pub use frontend::{Frontend, ReadOutcome, ScriptedFrontend, Transcript};
pub use memory::MemoryDrive;
pub use output::{
    CommandDoc, EntryType, ListGroup, ListItem, ListView, Output, ParamDoc, Prompt, TreeEntry,
    TreeView, format_size,
};
pub use session::{ExitReason, Flow, SessionConfig, SessionError, ShellSession};
pub use vfs::{Node, NodeId, NodeKind, SnapshotError, Tree, VfsError, VfsResult};
