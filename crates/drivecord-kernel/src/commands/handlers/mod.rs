//! Built-in command handlers, one module per group.

mod debug;
mod files;
mod manage;
mod system;

use super::registry::Command;

/// Every built-in command, in the order `help` lists them.
pub(crate) fn builtins() -> Vec<Command> {
    let mut commands = system::commands();
    commands.extend(manage::commands());
    commands.extend(files::commands());
    commands.extend(debug::commands());
    commands
}

/// Last path segment, for display.
fn base_name(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
}
