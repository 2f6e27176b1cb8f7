//! Command definitions and the registry that holds them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use drivecord_types::Rank;
use strum::{Display, EnumIter};
use tracing::debug;

use super::error::{CommandResult, RegistryError};
use super::param::{Arguments, Parameter};
use crate::output::{CommandDoc, ListItem};
use crate::session::{Flow, ShellSession};

/// Signature of every command handler.
pub type Handler = fn(&mut ShellSession, &Arguments) -> CommandResult<Flow>;

/// Section a command is listed under in `help`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum CommandGroup {
    #[strum(to_string = "System.")]
    System,
    #[strum(to_string = "Management.")]
    Management,
    #[strum(to_string = "File system.")]
    FileSystem,
    #[strum(to_string = "Debug.")]
    Debug,
}

/// A registered command.
#[derive(Clone)]
pub struct Command {
    name: String,
    group: CommandGroup,
    aliases: Vec<String>,
    params: Vec<Parameter>,
    required: Option<Rank>,
    docs: String,
    handler: Handler,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("aliases", &self.aliases)
            .field("params", &self.params)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// A command open to everyone, with no aliases or parameters.
    pub fn new(name: impl Into<String>, group: CommandGroup, handler: Handler) -> Self {
        Self {
            name: name.into(),
            group,
            aliases: Vec::new(),
            params: Vec::new(),
            required: None,
            docs: String::new(),
            handler,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    /// Append a positional parameter.
    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.required = Some(rank);
        self
    }

    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = docs.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> CommandGroup {
        self.group
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Minimum rank to run this command, `None` if open to everyone.
    pub fn required(&self) -> Option<Rank> {
        self.required
    }

    pub fn docs(&self) -> &str {
        &self.docs
    }

    /// Exact, case-sensitive match against the name or an alias.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }

    /// Run the handler with already-bound arguments.
    pub fn call(&self, session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
        (self.handler)(session, args)
    }

    /// One-line summary for the command list.
    pub fn help_inline(&self) -> ListItem {
        let params: Vec<String> = self.params.iter().map(Parameter::brief_help).collect();
        let mut item = ListItem::new(&self.name)
            .with_note(&self.docs)
            .with_rank(self.required);
        if !params.is_empty() {
            item = item.with_detail(params.join(" "));
        }
        item
    }

    /// Full documentation for `help <name>`.
    pub fn doc(&self) -> CommandDoc {
        CommandDoc {
            name: self.name.clone(),
            group: self.group.to_string(),
            aliases: self.aliases.clone(),
            params: self.params.iter().map(Parameter::doc).collect(),
            rank: self.required,
            docs: self.docs.clone(),
        }
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Append-only set of commands, looked up by name or alias.
///
/// Built once at startup and shared by reference with the parser and `help`.
/// Every name and alias is unique across the whole registry.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<Command>>,
    by_token: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for command in super::handlers::builtins() {
            registry.register(command)?;
        }
        Ok(registry)
    }

    /// Add a command. Nothing is changed if it is refused.
    pub fn register(&mut self, command: Command) -> Result<(), RegistryError> {
        let mut seen: Vec<&str> = Vec::new();
        for token in command.tokens() {
            if seen.contains(&token) {
                return Err(RegistryError::RepeatedToken {
                    command: command.name.clone(),
                    token: token.to_string(),
                });
            }
            if let Some(&index) = self.by_token.get(token) {
                return Err(RegistryError::Duplicate {
                    token: token.to_string(),
                    command: command.name.clone(),
                    existing: self.commands[index].name.clone(),
                });
            }
            seen.push(token);
        }

        let mut optional_seen = false;
        for param in &command.params {
            if param.is_required() && optional_seen {
                return Err(RegistryError::RequiredAfterOptional {
                    command: command.name.clone(),
                    param: param.name().to_string(),
                });
            }
            optional_seen |= !param.is_required();
        }

        let index = self.commands.len();
        for token in command.tokens() {
            self.by_token.insert(token.to_string(), index);
        }
        debug!(command = %command.name, aliases = ?command.aliases, "registered command");
        self.commands.push(Arc::new(command));
        Ok(())
    }

    /// Look up by exact name or alias.
    pub fn find(&self, token: &str) -> Option<Arc<Command>> {
        self.by_token
            .get(token)
            .map(|&index| Arc::clone(&self.commands[index]))
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    /// Commands of one group, in registration order.
    pub fn in_group(&self, group: CommandGroup) -> impl Iterator<Item = &Command> {
        self.iter().filter(move |c| c.group == group)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
