//! Remote drive operations.
//!
//! [`DriveApi`] is everything the shell core asks of the server. The HTTP
//! client lives in `drivecord-client`; [`MemoryDrive`](crate::MemoryDrive)
//! implements the same trait in-process.
//!
//! Filesystem calls carry the session's working directory as `cwd`
//! (canonical `~/...` form) and a `path` relative to it, the way the
//! server expects them.

use drivecord_types::{
    Instance, InstanceId, Member, MemoryUsage, Permissions, PulledObject, SnapshotEntry,
    TraceHop,
};
use thiserror::Error;

/// Failure talking to the drive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Credentials rejected. Ends the session.
    #[error("client authentication failed")]
    Unauthorized,

    #[error("you are not a member of this drive")]
    Forbidden,

    #[error("drive not found")]
    DriveNotFound,

    /// Server refused the operation; the text is the server's explanation.
    #[error("{0}")]
    Conflict(String),

    #[error("unexpected response status {0}")]
    Status(u16),

    #[error("request error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether the session must stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Blocking operations against one account's drives.
///
/// Calls are made one at a time from the dispatch loop.
pub trait DriveApi: Send + Sync {
    // ========================================================================
    // Account
    // ========================================================================

    /// Drives the user can open.
    fn instances(&self) -> ApiResult<Vec<Instance>>;

    /// Burn the current access token.
    fn logout(&self) -> ApiResult<()>;

    // ========================================================================
    // Instance
    // ========================================================================

    /// The user's own permission record on `instance`.
    fn permissions(&self, instance: InstanceId) -> ApiResult<Permissions>;

    /// Every member of the drive, registered or not.
    fn members(&self, instance: InstanceId) -> ApiResult<Vec<Member>>;

    /// Replace a member's permission record.
    fn update_permissions(
        &self,
        instance: InstanceId,
        member_id: u64,
        permissions: Permissions,
    ) -> ApiResult<()>;

    // ========================================================================
    // Filesystem
    // ========================================================================

    /// Full structure snapshot rooted at `~`.
    fn structure(&self, instance: InstanceId) -> ApiResult<SnapshotEntry>;

    fn make_file(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()>;

    fn make_dir(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()>;

    /// Remove a file, or a directory recursively.
    fn remove(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()>;

    fn rename(&self, instance: InstanceId, cwd: &str, path: &str, new_name: &str)
    -> ApiResult<()>;

    fn read_file(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<String>;

    /// Download a file, or a directory as a base64 zip.
    fn pull(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<PulledObject>;

    /// Replace a file's text content.
    fn write_file(&self, instance: InstanceId, cwd: &str, path: &str, content: &str)
    -> ApiResult<()>;

    /// Create a file from base64 bytes.
    fn upload(&self, instance: InstanceId, cwd: &str, path: &str, content: &str)
    -> ApiResult<()>;

    // ========================================================================
    // Debug
    // ========================================================================

    fn memory_usage(&self, instance: InstanceId) -> ApiResult<MemoryUsage>;

    /// Cache dump of one storage bucket.
    fn dump_cache(&self, instance: InstanceId, index: u64) -> ApiResult<String>;

    /// Recalculate a bucket's cache and return the new dump.
    fn recache(&self, instance: InstanceId, index: u64) -> ApiResult<String>;

    /// Storage route of the file at canonical `path`.
    fn trace(&self, instance: InstanceId, path: &str) -> ApiResult<Vec<TraceHop>>;
}
