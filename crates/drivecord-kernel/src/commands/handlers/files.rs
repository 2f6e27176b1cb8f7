//! Navigation and file manipulation.
//!
//! Every handler that changes the drive refreshes the tree before it reports
//! success. Navigation refreshes first so it never walks a stale tree.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drivecord_types::{ROOT_NAME, Rank};
use tracing::info;

use super::base_name;
use crate::commands::error::{CommandError, CommandResult};
use crate::commands::param::{Arguments, ParamType, Parameter, Value};
use crate::commands::registry::{Command, CommandGroup};
use crate::downloads;
use crate::output::{Output, TreeView};
use crate::session::{Flow, ShellSession};
use crate::vfs::VfsError;

pub(super) fn commands() -> Vec<Command> {
    let path = || Parameter::required("Path", ParamType::Text);
    let group = CommandGroup::FileSystem;
    vec![
        Command::new("ls", group, list)
            .with_aliases(&["dir"])
            .with_param(Parameter::optional("Recursive", ParamType::Boolean, Value::Boolean(false)))
            .with_rank(Rank::Read)
            .with_docs("Display files and directories of the working directory as a tree."),
        Command::new("cd", group, change_dir)
            .with_param(path())
            .with_rank(Rank::Read)
            .with_docs("Change the working directory to the given path."),
        Command::new("home", group, home)
            .with_aliases(&["~"])
            .with_rank(Rank::Read)
            .with_docs("Change the working directory to the drive root (~/)."),
        Command::new("mkfile", group, make_file)
            .with_aliases(&["mkf", "touch"])
            .with_param(path())
            .with_rank(Rank::Write)
            .with_docs("Create a file at a path relative to the working directory."),
        Command::new("mkdir", group, make_dir)
            .with_aliases(&["mkd"])
            .with_param(path())
            .with_rank(Rank::Write)
            .with_docs("Create a directory at a path relative to the working directory."),
        Command::new("remove", group, remove)
            .with_aliases(&["rm", "del", "delete"])
            .with_param(path())
            .with_rank(Rank::Write)
            .with_docs("Delete a file, or a directory recursively."),
        Command::new("rename", group, rename)
            .with_aliases(&["ren"])
            .with_param(path())
            .with_param(Parameter::required("NewName", ParamType::Text))
            .with_rank(Rank::Write)
            .with_docs("Rename an object. `NewName` must not exist in its directory."),
        Command::new("read", group, read)
            .with_aliases(&["cat"])
            .with_param(path())
            .with_rank(Rank::Read)
            .with_docs("Display a file's content."),
        Command::new("download", group, download)
            .with_aliases(&["pull", "get"])
            .with_param(path())
            .with_param(Parameter::optional("Override", ParamType::Boolean, Value::Boolean(false)))
            .with_rank(Rank::Read)
            .with_docs(
                "Download a file, or a directory as a ZIP, into the downloads directory \
                 under the drive's name.",
            ),
        Command::new("edit", group, edit)
            .with_aliases(&["edt", "write"])
            .with_param(path())
            .with_rank(Rank::Write)
            .with_docs("Edit a file's content in a text editor; saving uploads it."),
        Command::new("push", group, push)
            .with_aliases(&["up", "upload"])
            .with_param(Parameter::required("LocalPath", ParamType::Text))
            .with_rank(Rank::Write)
            .with_docs("Upload a local file into the working directory."),
    ]
}

fn list(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let recursive = args.boolean("Recursive")?;
    session.refresh()?;
    let view = TreeView::build(session.tree()?, session.cwd(), recursive);
    session.emit(Output::Tree(view));
    Ok(Flow::Continue)
}

fn change_dir(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    enter(session, path)?;
    Ok(Flow::Continue)
}

fn home(session: &mut ShellSession, _args: &Arguments) -> CommandResult<Flow> {
    enter(session, ROOT_NAME)?;
    Ok(Flow::Continue)
}

fn enter(session: &mut ShellSession, path: &str) -> CommandResult<()> {
    session.refresh()?;
    let tree = session.tree()?;
    let target = tree.resolve(session.cwd(), path).map_err(|err| match err {
        VfsError::NotFound(_) => CommandError::failed(format!(
            "target path doesn't exist: {}{path}",
            session.cwd_path()
        )),
        other => other.into(),
    })?;
    if tree.node(target).is_file() {
        return Err(CommandError::failed(format!("selected object `{path}` is a file")));
    }
    session.set_cwd(target)?;
    Ok(())
}

fn make_file(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let cwd = session.cwd_path();
    session.api().make_file(session.instance().id, &cwd, path)?;
    session.refresh()?;
    session.emit(Output::success(format!("Created file: {path}")));
    Ok(Flow::Continue)
}

fn make_dir(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let cwd = session.cwd_path();
    session.api().make_dir(session.instance().id, &cwd, path)?;
    session.refresh()?;
    session.emit(Output::success(format!("Created directory: {path}")));
    Ok(Flow::Continue)
}

fn remove(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let cwd = session.cwd_path();
    session.api().remove(session.instance().id, &cwd, path)?;
    session.refresh()?;
    session.emit(Output::success(format!("Removed: {path}")));
    Ok(Flow::Continue)
}

fn rename(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let new_name = args.text("NewName")?;
    let cwd = session.cwd_path();
    session
        .api()
        .rename(session.instance().id, &cwd, path, new_name)?;
    session.refresh()?;
    session.emit(Output::success(format!("Renamed: {path} -> {new_name}")));
    Ok(Flow::Continue)
}

fn read(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let cwd = session.cwd_path();
    let text = session.api().read_file(session.instance().id, &cwd, path)?;
    session.emit(Output::FileContent {
        name: base_name(path).to_string(),
        text,
    });
    Ok(Flow::Continue)
}

fn download(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let overwrite = args.boolean("Override")?;
    let cwd = session.cwd_path();
    let object = session.api().pull(session.instance().id, &cwd, path)?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let saved = downloads::save_pulled(
        &session.config().downloads_dir,
        &session.instance().name,
        &object,
        overwrite,
        stamp,
    )?;

    for dir in &saved.created_dirs {
        session.emit(Output::info(format!("Created directory {}", dir.display())));
    }
    if saved.overwritten {
        session.emit(Output::info(format!("Overriding existing {} file.", saved.file_name)));
    }
    if saved.renamed {
        session.emit(Output::info(format!(
            "File already saved, override disabled. Saving as: {}",
            saved.file_name
        )));
    }
    info!(path = %saved.path.display(), "downloaded");
    session.emit(Output::success(format!("Downloaded: {}", saved.file_name)));
    Ok(Flow::Continue)
}

fn edit(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let path = args.text("Path")?;
    let cwd = session.cwd_path();
    let id = session.instance().id;
    let content = session.api().read_file(id, &cwd, path)?;

    let edited = session
        .frontend_mut()
        .edit(base_name(path), &content)?
        .ok_or_else(|| CommandError::failed("edit operation cancelled"))?;

    session.api().write_file(id, &cwd, path, &edited)?;
    session.refresh()?;
    session.emit(Output::success(format!("Edited content of {path}")));
    Ok(Flow::Continue)
}

fn push(session: &mut ShellSession, args: &Arguments) -> CommandResult<Flow> {
    let local = args.text("LocalPath")?;
    let expanded = shellexpand::tilde(local);
    let local_path = Path::new(expanded.as_ref());
    if !local_path.is_file() {
        return Err(CommandError::failed(format!("local file not found: {local}")));
    }
    let file_name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CommandError::failed(format!("local path has no file name: {local}")))?;

    let content = STANDARD.encode(fs::read(local_path)?);
    let cwd = session.cwd_path();
    let target = format!("{cwd}{file_name}");
    session
        .api()
        .upload(session.instance().id, &cwd, &target, &content)?;
    session.refresh()?;
    session.emit(Output::success(format!("File uploaded: {target}")));
    Ok(Flow::Continue)
}
