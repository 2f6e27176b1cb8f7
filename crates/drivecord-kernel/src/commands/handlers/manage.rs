//! Member listing and permission management.

use drivecord_types::{Permissions, Rank};
use tracing::info;

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::param::{Arguments, ParamType, Parameter, Value};
use crate::commands::registry::{Command, CommandGroup};
use crate::output::{ListItem, ListView, Output};
use crate::session::{Flow, ShellSession};

pub(super) fn commands() -> Vec<Command> {
    vec![
        Command::new("members", CommandGroup::Management, members)
            .with_aliases(&["users"])
            .with_param(Parameter::optional("ShowID", ParamType::Boolean, Value::Boolean(false)))
            .with_rank(Rank::Read)
            .with_docs("View all members of the drive and their permissions."),
        Command::new("perms", CommandGroup::Management, perms)
            .with_aliases(&["permissions"])
            .with_param(Parameter::required("member", ParamType::Text))
            .with_param(Parameter::required("privileges", ParamType::Text))
            .with_rank(Rank::Admin)
            .with_docs(
                "Update a member's permissions. Owner permissions cannot be changed, Admin \
                 permissions only by the Owner, and only the Owner can grant Admin. Use `a`, \
                 `r` and `w` in `privileges` for Admin, Read and Write, e.g. `rw`.",
            ),
    ]
}

fn members(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let show_ids = args.boolean("ShowID")?;
    let members = session.api().members(session.instance().id)?;

    let (registered, unregistered): (Vec<_>, Vec<_>) =
        members.into_iter().partition(|m| m.is_registered());

    let row = |name: &str, id: u64| {
        let item = ListItem::new(name);
        if show_ids { item.with_detail(id.to_string()) } else { item }
    };

    let mut list = ListView::new(format!("{}'s members.", session.instance().name))
        .group(format!("Registered: {}", registered.len()));
    for member in &registered {
        let rank = member.permissions.map(|p| p.rank());
        list = list.item(row(&member.name, member.id).with_rank(rank));
    }
    list = list.group(format!("Unregistered: {}", unregistered.len()));
    for member in &unregistered {
        list = list.item(row(&member.name, member.id).dimmed());
    }

    session.emit(Output::List(list));
    Ok(Flow::Continue)
}

fn perms(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let target = args.text("member")?;
    let code = args.text("privileges")?;
    let requested =
        Permissions::from_code(code).map_err(|err| CommandError::failed(err.to_string()))?;

    let target_id: Option<u64> = target.parse().ok();
    let members = session.api().members(session.instance().id)?;
    let member = members
        .iter()
        .find(|m| m.name == target || Some(m.id) == target_id)
        .ok_or_else(|| CommandError::failed(format!("member not found: `{target}`")))?;

    if session.config().user_id == Some(member.id) {
        return Err(CommandError::failed("you cannot change your own permissions"));
    }

    let current = member.permissions.ok_or_else(|| {
        CommandError::failed(format!("member `{}` is not registered", member.name))
    })?;
    let own = session.rank();
    match current.rank() {
        Rank::Owner => {
            return Err(CommandError::failed(format!(
                "member `{}` has Owner permissions",
                member.name
            )));
        }
        Rank::Admin if own == Rank::Admin => {
            return Err(CommandError::failed(format!(
                "member `{}` has Admin permissions; only the Owner can manage them",
                member.name
            )));
        }
        _ => {}
    }
    if requested.admin && own == Rank::Admin {
        return Err(CommandError::failed("only the Owner can grant Admin permissions"));
    }

    let updated = Permissions::none()
        .with_read(requested.read)
        .with_write(requested.write)
        .with_admin(requested.admin);
    session
        .api()
        .update_permissions(session.instance().id, member.id, updated)?;

    info!(member = member.id, rank = %updated.rank(), "updated permissions");
    let message = format!(
        "Updated permissions of `{}` to {}",
        member.name,
        updated.rank()
    );
    session.emit(Output::success(message));
    Ok(Flow::Continue)
}
