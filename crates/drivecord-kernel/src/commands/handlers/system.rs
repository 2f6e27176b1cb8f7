//! help, exit, logout, switch.

use strum::IntoEnumIterator;
use tracing::warn;

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::param::{Arguments, ParamType, Parameter, Value};
use crate::commands::registry::{Command, CommandGroup};
use crate::output::{ListView, Output};
use crate::session::{ExitReason, Flow, ShellSession};

pub(super) fn commands() -> Vec<Command> {
    vec![
        Command::new("help", CommandGroup::System, help)
            .with_aliases(&["?"])
            .with_param(Parameter::optional("CmdName", ParamType::Text, Value::Text(String::new())))
            .with_docs(
                "Display the list of all commands with their brief help, or the full \
                 documentation of the command named in `CmdName`.",
            ),
        Command::new("exit", CommandGroup::System, exit)
            .with_aliases(&["quit", "q"])
            .with_param(Parameter::optional("Logout", ParamType::Boolean, Value::Boolean(false)))
            .with_docs("Exit the shell. Also log out when `Logout` is set."),
        Command::new("logout", CommandGroup::System, logout)
            .with_docs("Exit the shell and burn the current access token. Same as `exit yes`."),
        Command::new("switch", CommandGroup::System, switch)
            .with_aliases(&["instance"])
            .with_docs("Switch the current drive instance."),
    ]
}

fn help(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let name = args.text("CmdName")?;

    let output = if name.is_empty() {
        let registry = session.registry();
        let mut list = ListView::new("List of commands.");
        for group in CommandGroup::iter() {
            list = list.group(group.to_string());
            for command in registry.in_group(group) {
                list = list.item(command.help_inline());
            }
        }
        Output::List(list)
    } else {
        let command = session.registry().find(name).ok_or_else(|| {
            CommandError::failed(format!(
                "cannot display documentation for `{name}` (command not found)"
            ))
        })?;
        Output::CommandHelp(command.doc())
    };

    session.emit(output);
    Ok(Flow::Continue)
}

fn exit(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    if args.boolean("Logout")? {
        return logout(session, args);
    }
    Ok(Flow::Exit(ExitReason::Exit))
}

fn logout(session: &mut ShellSession, _args: &Arguments) -> CommandResult<Flow> {
    match session.api().logout() {
        Ok(()) => session.emit(Output::success("Logged out.")),
        Err(err) => {
            warn!(error = %err, "logout failed");
            session.emit(Output::warning(format!("Logout failed: {err}")));
        }
    }
    Ok(Flow::Exit(ExitReason::Logout))
}

fn switch(session: &mut ShellSession, _args: &Arguments) -> CommandResult<Flow> {
    session.switch_instance()?;
    let message = format!("Switched to {}", session.instance().name);
    session.emit(Output::success(message));
    Ok(Flow::Continue)
}
