//! Drive instances, members, and the payloads of the less common endpoints.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::perms::Permissions;

/// Numeric drive identifier assigned by the server.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A drive the user can open, as listed by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
}

impl Instance {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: InstanceId(id),
            name: name.into(),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A member of a drive.
///
/// `permissions` is `None` for members who have not registered an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub id: u64,
    pub permissions: Option<Permissions>,
}

impl Member {
    pub fn is_registered(&self) -> bool {
        self.permissions.is_some()
    }
}

/// Result of pulling a file or directory.
///
/// Directories arrive zipped, with `content` holding base64 bytes; plain files
/// carry their text directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulledObject {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub is_zip: bool,
}

/// Memory usage totals reported by the debug endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total: String,
    #[serde(default)]
    pub per_bucket: BTreeMap<String, String>,
}

/// One hop in a file's storage trace: a message id and where it lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceHop {
    pub id: String,
    pub url: String,
}
