//! Permission records and the four-tier rank derived from them.
//!
//! A [`Permissions`] record is what the server stores per (user, drive) pair.
//! The shell never inspects individual flags when gating commands; it
//! collapses the record into a single [`Rank`] and compares ranks.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

/// Privilege tier, ordered `Read < Write < Admin < Owner`.
///
/// There is no "no access" tier: an authenticated, registered member always
/// ranks at least [`Rank::Read`].
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Rank {
    Read,
    Write,
    Admin,
    Owner,
}

impl Rank {
    /// Whether this rank may run something that requires `required`.
    ///
    /// `None` means the command is open to everyone.
    pub fn satisfies(self, required: Option<Rank>) -> bool {
        match required {
            None => true,
            Some(required) => self >= required,
        }
    }

    /// Display name ("Read", "Write", ...).
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability record for one member of one drive.
///
/// Unknown keys in the server payload are ignored and missing keys default to
/// `false`. Records are immutable values; use the `with_*` builders to derive
/// a changed copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub admin: bool,
    pub owner: bool,
}

impl Permissions {
    /// A record with no flags set.
    pub fn none() -> Self {
        Self::default()
    }

    /// Copy with `read` set.
    pub fn with_read(self, read: bool) -> Self {
        Self { read, ..self }
    }

    /// Copy with `write` set.
    pub fn with_write(self, write: bool) -> Self {
        Self { write, ..self }
    }

    /// Copy with `admin` set.
    pub fn with_admin(self, admin: bool) -> Self {
        Self { admin, ..self }
    }

    /// Copy with `owner` set.
    pub fn with_owner(self, owner: bool) -> Self {
        Self { owner, ..self }
    }

    /// Highest tier this record satisfies, in precedence owner > admin > write > read.
    pub fn rank(&self) -> Rank {
        if self.owner {
            Rank::Owner
        } else if self.admin {
            Rank::Admin
        } else if self.write {
            Rank::Write
        } else {
            Rank::Read
        }
    }

    /// Build a record from a privilege code such as `"rw"` or `"a"`.
    ///
    /// Only `a`, `r` and `w` are accepted (case-insensitive). The owner flag
    /// can never be granted this way.
    pub fn from_code(code: &str) -> Result<Self, PrivilegeCodeError> {
        let mut perms = Self::none();
        for c in code.chars() {
            perms = match c.to_ascii_lowercase() {
                'a' => perms.with_admin(true),
                'r' => perms.with_read(true),
                'w' => perms.with_write(true),
                _ => return Err(PrivilegeCodeError(c)),
            };
        }
        Ok(perms)
    }
}

/// A privilege code contained something other than `a`, `r` or `w`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid privilege indicator: `{0}`")]
pub struct PrivilegeCodeError(pub char);

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_rank_precedence() {
        assert_eq!(Permissions::none().rank(), Rank::Read);
        assert_eq!(Permissions::none().with_read(true).rank(), Rank::Read);
        assert_eq!(Permissions::none().with_write(true).rank(), Rank::Write);
        assert_eq!(Permissions::none().with_admin(true).rank(), Rank::Admin);
    }

    #[test]
    fn test_owner_always_wins() {
        for read in [false, true] {
            for write in [false, true] {
                for admin in [false, true] {
                    let perms = Permissions { read, write, admin, owner: true };
                    assert_eq!(perms.rank(), Rank::Owner);
                }
            }
        }
    }

    #[test]
    fn test_admin_without_owner() {
        for read in [false, true] {
            for write in [false, true] {
                let perms = Permissions { read, write, admin: true, owner: false };
                assert_eq!(perms.rank(), Rank::Admin);
            }
        }
    }

    #[test]
    fn test_satisfies_table() {
        assert!(Rank::Read.satisfies(None));
        assert!(Rank::Read.satisfies(Some(Rank::Read)));
        assert!(!Rank::Read.satisfies(Some(Rank::Write)));

        assert!(Rank::Write.satisfies(Some(Rank::Read)));
        assert!(Rank::Write.satisfies(Some(Rank::Write)));
        assert!(!Rank::Write.satisfies(Some(Rank::Admin)));

        assert!(Rank::Admin.satisfies(Some(Rank::Admin)));
        assert!(!Rank::Admin.satisfies(Some(Rank::Owner)));

        for required in Rank::iter() {
            assert!(Rank::Owner.satisfies(Some(required)));
        }
    }

    #[test]
    fn test_builder_leaves_original_untouched() {
        let base = Permissions::none().with_read(true);
        let promoted = base.with_write(true);
        assert!(!base.write);
        assert!(promoted.read && promoted.write);
    }

    #[test]
    fn test_from_code() {
        let perms = Permissions::from_code("RW").unwrap();
        assert_eq!(perms, Permissions::none().with_read(true).with_write(true));

        let admin = Permissions::from_code("a").unwrap();
        assert!(admin.admin && !admin.owner);

        assert_eq!(Permissions::from_code("rx"), Err(PrivilegeCodeError('x')));
        assert_eq!(Permissions::from_code("").unwrap(), Permissions::none());
    }

    #[test]
    fn test_deserialize_ignores_unknown_and_defaults_missing() {
        let perms: Permissions =
            serde_json::from_str(r#"{"read": true, "admin": true, "banned": true}"#).unwrap();
        assert_eq!(perms, Permissions::none().with_read(true).with_admin(true));
    }

    #[test]
    fn test_rank_strings() {
        assert_eq!(Rank::Owner.to_string(), "Owner");
        assert_eq!("write".parse::<Rank>().unwrap(), Rank::Write);
    }
}
