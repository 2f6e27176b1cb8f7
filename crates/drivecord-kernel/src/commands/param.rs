//! Typed positional parameters and bound argument values.

use std::collections::BTreeMap;
use std::fmt;

use strum::IntoStaticStr;

use super::error::{CommandError, CommandResult};
use crate::output::ParamDoc;

/// Tokens accepted as `true` by [`ParamType::Boolean`] (case-insensitive).
pub const TRUTHY: [&str; 6] = ["+", "1", "true", "t", "yes", "y"];
/// Tokens accepted as `false` by [`ParamType::Boolean`] (case-insensitive).
pub const FALSY: [&str; 6] = ["-", "0", "false", "f", "no", "n"];

/// Base type of a parameter.
///
/// Validation and conversion are separate steps. [`ParamType::convert`] is
/// only meaningful for input that passed [`ParamType::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum ParamType {
    Text,
    Number,
    Boolean,
}

impl ParamType {
    /// Display name ("Text", "Number", "Boolean").
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn validate(self, raw: &str) -> bool {
        match self {
            Self::Text => true,
            Self::Number => {
                !raw.is_empty()
                    && raw.bytes().all(|b| b.is_ascii_digit())
                    && raw.parse::<u64>().is_ok()
            }
            Self::Boolean => is_truthy(raw) || is_falsy(raw),
        }
    }

    pub fn convert(self, raw: &str) -> Value {
        match self {
            Self::Text => Value::Text(raw.to_string()),
            Self::Number => Value::Number(raw.parse().unwrap_or_default()),
            Self::Boolean => Value::Boolean(is_truthy(raw)),
        }
    }
}

fn is_truthy(raw: &str) -> bool {
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(raw))
}

fn is_falsy(raw: &str) -> bool {
    FALSY.iter().any(|f| f.eq_ignore_ascii_case(raw))
}

/// A converted argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Number(u64),
    Boolean(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// One positional parameter of a command.
///
/// A parameter with a default is optional. Optional parameters follow all
/// required ones; the registry refuses commands that break this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    kind: ParamType,
    default: Option<Value>,
}

impl Parameter {
    pub fn required(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// An optional parameter. `default` should be of type `kind`.
    pub fn optional(name: impl Into<String>, kind: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Some(default),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamType {
        self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// `<Path: Text>` or ``[Recursive?: Boolean = `false`]``.
    pub fn full_help(&self) -> String {
        match &self.default {
            None => format!("<{}: {}>", self.name, self.kind.name()),
            Some(default) => format!("[{}?: {} = `{default}`]", self.name, self.kind.name()),
        }
    }

    /// `<Path>` or `[Recursive?]`.
    pub fn brief_help(&self) -> String {
        match self.default {
            None => format!("<{}>", self.name),
            Some(_) => format!("[{}?]", self.name),
        }
    }

    pub fn doc(&self) -> ParamDoc {
        ParamDoc {
            name: self.name.clone(),
            type_name: self.kind.name().to_string(),
            default: self.default.as_ref().map(Value::to_string),
        }
    }
}

/// Parameter name to bound value, as handed to a handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Arguments::bind`].
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind(name, value);
        self
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn text(&self, name: &str) -> CommandResult<&str> {
        match self.values.get(name) {
            Some(Value::Text(text)) => Ok(text),
            _ => Err(CommandError::argument(name, ParamType::Text)),
        }
    }

    pub fn number(&self, name: &str) -> CommandResult<u64> {
        match self.values.get(name) {
            Some(Value::Number(n)) => Ok(*n),
            _ => Err(CommandError::argument(name, ParamType::Number)),
        }
    }

    pub fn boolean(&self, name: &str) -> CommandResult<bool> {
        match self.values.get(name) {
            Some(Value::Boolean(b)) => Ok(*b),
            _ => Err(CommandError::argument(name, ParamType::Boolean)),
        }
    }
}
