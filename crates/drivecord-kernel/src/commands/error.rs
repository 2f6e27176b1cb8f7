//! Command and registry error types.

use std::io;

use drivecord_types::Rank;
use thiserror::Error;

use super::param::ParamType;
use crate::api::ApiError;
use crate::vfs::VfsError;

/// Failure while running a command.
///
/// Everything except a fatal [`ApiError`] is reported to the user and the
/// session carries on.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A user-facing failure raised by a handler.
    #[error("{0}")]
    Failed(String),

    #[error("`{command}` requires at least {required} permissions")]
    PermissionDenied { command: String, required: Rank },

    /// A handler asked for an argument the parser did not bind.
    #[error("argument `{name}` is not bound as {expected}")]
    Argument { name: String, expected: &'static str },

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl CommandError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn argument(name: impl Into<String>, expected: ParamType) -> Self {
        Self::Argument {
            name: name.into(),
            expected: expected.name(),
        }
    }

    /// The session cannot continue after this.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_fatal())
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// A command could not be added to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name or an alias is already taken by another command.
    #[error("`{token}` of command `{command}` is already registered by `{existing}`")]
    Duplicate {
        token: String,
        command: String,
        existing: String,
    },

    /// An alias repeats within one command, or repeats its name.
    #[error("command `{command}` lists `{token}` more than once")]
    RepeatedToken { command: String, token: String },

    /// A required parameter follows an optional one.
    #[error("command `{command}`: required parameter `{param}` follows an optional one")]
    RequiredAfterOptional { command: String, param: String },
}
