//! Storage diagnostics.

use drivecord_types::Rank;

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::param::{Arguments, ParamType, Parameter, Value};
use crate::commands::registry::{Command, CommandGroup};
use crate::output::{ListItem, ListView, Output};
use crate::session::{Flow, ShellSession};
use crate::vfs::VfsError;

pub(super) fn commands() -> Vec<Command> {
    let bucket = || Parameter::optional("BucketIndex", ParamType::Number, Value::Number(0));
    vec![
        Command::new("usage", CommandGroup::Debug, usage)
            .with_rank(Rank::Read)
            .with_docs("Show total memory used and usage per bucket."),
        Command::new("cachedump", CommandGroup::Debug, cache_dump)
            .with_aliases(&["cache"])
            .with_param(bucket())
            .with_rank(Rank::Admin)
            .with_docs("Display the cache dump of a bucket as `ChannelID: SizeB` lines (advanced)."),
        Command::new("recache", CommandGroup::Debug, recache)
            .with_param(bucket())
            .with_rank(Rank::Admin)
            .with_docs("Recalculate the cache of a bucket (advanced)."),
        Command::new("trace", CommandGroup::Debug, trace)
            .with_param(Parameter::required("Path", ParamType::Text))
            .with_rank(Rank::Admin)
            .with_docs(
                "Trace where a file's content is stored: its messages, chunks and header \
                 address (advanced).",
            ),
    ]
}

fn usage(session: &mut ShellSession, _args: &Arguments) -> CommandResult<Flow> {
    let usage = session.api().memory_usage(session.instance().id)?;
    session.emit(Output::info(format!("Total memory used: {}", usage.total)));

    let mut list = ListView::new("Usage per bucket.");
    for (bucket, used) in &usage.per_bucket {
        list = list.item(ListItem::new(bucket).with_detail(used));
    }
    session.emit(Output::List(list));
    Ok(Flow::Continue)
}

fn cache_dump(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let index = args.number("BucketIndex")?;
    let text = session.api().dump_cache(session.instance().id, index)?;
    session.emit(Output::FileContent {
        name: format!("data_{index} bucket cache"),
        text,
    });
    Ok(Flow::Continue)
}

fn recache(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let index = args.number("BucketIndex")?;
    let text = session.api().recache(session.instance().id, index)?;
    session.emit(Output::success("Recalculated bucket's cache."));
    session.emit(Output::FileContent {
        name: format!("data_{index} recalculated bucket cache"),
        text,
    });
    Ok(Flow::Continue)
}

fn trace(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let tree = session.tree()?;
    let file = tree
        .resolve_file(session.cwd(), path)
        .map_err(|err| match err {
            VfsError::NotFound(_) => CommandError::failed(format!("invalid path: {path}")),
            VfsError::IsADirectory(_) => {
                CommandError::failed(format!("`{path}` is a directory, file expected"))
            }
            other => other.into(),
        })?;
    let canonical = tree.node(file).path().to_string();

    let hops = session.api().trace(session.instance().id, &canonical)?;
    session.emit(Output::success("Found file trace."));
    session.emit(Output::Trace { hops });
    Ok(Flow::Continue)
}
