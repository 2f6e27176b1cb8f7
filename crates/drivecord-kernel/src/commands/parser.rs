//! Turns one line of input into a bound, not-yet-run command.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::error::CommandResult;
use super::param::Arguments;
use super::registry::{Command, CommandRegistry};
use crate::session::{Flow, ShellSession};

/// Input that does not form a valid invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("blank input")]
    Blank,

    /// Unbalanced quotes or a trailing escape.
    #[error("cannot split input into words (check quotes)")]
    Tokenize,

    #[error("command `{0}` not found")]
    CommandNotFound(String),

    #[error("too many parameters ({given}) for a command that takes at most {max}")]
    TooManyParameters { given: usize, max: usize },

    #[error("invalid value `{token}` for parameter of type {expected}")]
    InvalidValue {
        token: String,
        expected: &'static str,
    },

    /// `position` is 1-based; `description` is the parameter's full help.
    #[error("missing parameter {position} {description}")]
    MissingParameter { position: usize, description: String },
}

/// A command with its validated arguments, waiting to be run.
#[derive(Debug, Clone)]
pub struct Invocation {
    command: Arc<Command>,
    args: Arguments,
}

impl Invocation {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn args(&self) -> &Arguments {
        &self.args
    }

    /// Run the handler.
    pub fn invoke(self, session: &mut ShellSession) -> CommandResult<Flow> {
        self.command.call(session, &self.args)
    }
}

/// Tokenize `raw` shell-style, find the command and bind its arguments.
///
/// Arguments are positional. Each present token is validated against its
/// parameter's type before conversion; absent ones take the default or fail.
pub fn parse(raw: &str, registry: &CommandRegistry) -> Result<Invocation, ParseError> {
    let tokens = shlex::split(raw).ok_or(ParseError::Tokenize)?;
    let (name, rest) = tokens.split_first().ok_or(ParseError::Blank)?;

    let command = registry
        .find(name)
        .ok_or_else(|| ParseError::CommandNotFound(name.clone()))?;

    let params = command.params();
    if rest.len() > params.len() {
        return Err(ParseError::TooManyParameters {
            given: rest.len(),
            max: params.len(),
        });
    }

    let mut args = Arguments::new();
    for (index, param) in params.iter().enumerate() {
        let value = match rest.get(index) {
            Some(token) => {
                if !param.kind().validate(token) {
                    return Err(ParseError::InvalidValue {
                        token: token.clone(),
                        expected: param.kind().name(),
                    });
                }
                param.kind().convert(token)
            }
            None => match param.default() {
                Some(default) => default.clone(),
                None => {
                    return Err(ParseError::MissingParameter {
                        position: index + 1,
                        description: param.full_help(),
                    });
                }
            },
        };
        args.bind(param.name(), value);
    }

    debug!(command = %command.name(), ?args, "parsed input");
    Ok(Invocation { command, args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::param::Value;

    fn registry() -> CommandRegistry {
        CommandRegistry::with_builtins().unwrap()
    }

    #[test]
    fn test_binds_required_text() {
        let invocation = parse("cd a/b", &registry()).unwrap();
        assert_eq!(invocation.command().name(), "cd");
        assert_eq!(invocation.args().get("Path"), Some(&Value::Text("a/b".into())));
    }

    #[test]
    fn test_quotes_make_one_token() {
        let invocation = parse(r#"rename "old name.txt" 'new name.txt'"#, &registry()).unwrap();
        assert_eq!(invocation.args().text("Path").unwrap(), "old name.txt");
        assert_eq!(invocation.args().text("NewName").unwrap(), "new name.txt");
    }

    #[test]
    fn test_alias_resolves() {
        let invocation = parse("rm x", &registry()).unwrap();
        assert_eq!(invocation.command().name(), "remove");
    }

    #[test]
    fn test_defaults_fill_missing_optionals() {
        let invocation = parse("ls", &registry()).unwrap();
        assert!(!invocation.args().boolean("Recursive").unwrap());

        let invocation = parse("ls Y", &registry()).unwrap();
        assert!(invocation.args().boolean("Recursive").unwrap());

        let invocation = parse("cachedump", &registry()).unwrap();
        assert_eq!(invocation.args().number("BucketIndex").unwrap(), 0);
    }

    #[test]
    fn test_missing_parameter() {
        let err = parse("cd", &registry()).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingParameter {
                position: 1,
                description: "<Path: Text>".into(),
            }
        );

        let err = parse("rename a", &registry()).unwrap_err();
        assert!(matches!(err, ParseError::MissingParameter { position: 2, .. }));
    }

    #[test]
    fn test_too_many_parameters() {
        let err = parse("mkfile a b", &registry()).unwrap_err();
        assert_eq!(err, ParseError::TooManyParameters { given: 2, max: 1 });

        let err = parse("home x", &registry()).unwrap_err();
        assert_eq!(err, ParseError::TooManyParameters { given: 1, max: 0 });
    }

    #[test]
    fn test_invalid_values() {
        let err = parse("cachedump 12a", &registry()).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue {
                token: "12a".into(),
                expected: "Number",
            }
        );

        let err = parse("ls nope", &registry()).unwrap_err();
        assert!(err.to_string().contains("Boolean"));
        assert!(err.to_string().contains("`nope`"));
    }

    #[test]
    fn test_blank_and_unknown() {
        assert_eq!(parse("", &registry()).unwrap_err(), ParseError::Blank);
        assert_eq!(parse("   ", &registry()).unwrap_err(), ParseError::Blank);
        assert_eq!(
            parse("LS", &registry()).unwrap_err(),
            ParseError::CommandNotFound("LS".into())
        );
        assert_eq!(parse("cd \"docs", &registry()).unwrap_err(), ParseError::Tokenize);
    }

    #[test]
    fn test_validation_precedes_conversion() {
        // An overflowing number is refused rather than converted to something.
        let err = parse("recache 184467440737095516160", &registry()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }
}
