//! Commands: typed parameters, the registry, the input parser and the
//! built-in handlers.
//!
//! - [`ParamType`] / [`Parameter`] - positional parameter definitions
//! - [`Command`] / [`CommandRegistry`] - what can be invoked, by name or alias
//! - [`parse`] - raw input line to a deferred [`Invocation`]

mod error;
mod handlers;
mod param;
mod parser;
mod registry;

pub use error::{CommandError, CommandResult, RegistryError};
pub use param::{Arguments, FALSY, ParamType, Parameter, TRUTHY, Value};
pub use parser::{Invocation, ParseError, parse};
pub use registry::{Command, CommandGroup, CommandRegistry, Handler};
