//! The interactive shell session.
//!
//! A [`ShellSession`] owns everything a user is working with: the selected
//! drive, the cached permission rank, the current tree and the working
//! directory inside it. [`ShellSession::run`] is the read-eval loop.
//!
//! ## Lifecycle
//!
//! ```text
//! SelectingInstance ──▶ Initializing ──▶ Interactive ──▶ Terminated
//!   (start)              (permissions,     (run)          (ExitReason)
//!                          structure)
//! ```
//!
//! ## Design Decisions
//!
//! - **Parse, gate, then run**: the parser hands back an [`Invocation`]
//!   without running it, so the rank check always sits between the two.
//! - **Re-resolve by path**: the working directory is a [`NodeId`] into the
//!   current tree. After every rebuild the old cwd path is resolved again,
//!   falling back to the root with a warning.
//! - **Exit is a value**: commands end the loop by returning [`Flow::Exit`];
//!   the binary turns the [`ExitReason`] into a process exit code.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use drivecord_types::{Instance, InstanceId, Permissions, Rank};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, DriveApi};
use crate::commands::{CommandError, CommandRegistry, CommandResult, parse};
use crate::frontend::{Frontend, ReadOutcome};
use crate::output::{Output, Prompt};
use crate::vfs::{NodeId, Tree, VfsError, VfsResult};

/// Default directory downloads are saved under.
pub const DEFAULT_DOWNLOADS_DIR: &str = "./downloads";

/// What a handler wants the loop to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(ExitReason),
}

/// Why the loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// `exit` without logging out.
    Exit,
    /// `logout` or `exit yes`.
    Logout,
    /// Ctrl-C or end of input.
    Interrupted,
}

impl ExitReason {
    /// Process exit code for this reason.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Exit | Self::Logout => 0,
            Self::Interrupted => 1,
        }
    }
}

/// A failure that ends the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no drive instances are available to this account")]
    NoInstances,

    #[error("instance selection was cancelled")]
    SelectionCancelled,

    #[error("failed to fetch permissions for {instance}: {source}")]
    Permissions {
        instance: String,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A command failure the session could not recover from.
    #[error(transparent)]
    Command(CommandError),

    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

impl From<CommandError> for SessionError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Api(err) => Self::Api(err),
            other => Self::Command(other),
        }
    }
}

/// Per-session settings supplied by the binary.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// The logged-in user's id, used to refuse changing one's own permissions.
    pub user_id: Option<u64>,
    /// Root of downloaded files; each drive gets a subdirectory.
    pub downloads_dir: PathBuf,
    /// Drive to open without asking when several are available.
    pub preferred_instance: Option<InstanceId>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            downloads_dir: PathBuf::from(DEFAULT_DOWNLOADS_DIR),
            preferred_instance: None,
        }
    }
}

/// One user's interactive session against one drive at a time.
pub struct ShellSession {
    api: Box<dyn DriveApi>,
    frontend: Box<dyn Frontend>,
    registry: Arc<CommandRegistry>,
    config: SessionConfig,
    instances: Vec<Instance>,
    instance: Instance,
    permissions: Permissions,
    rank: Rank,
    tree: Option<Tree>,
    cwd: NodeId,
}

impl std::fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellSession")
            .field("instance", &self.instance)
            .field("rank", &self.rank)
            .field("cwd", &self.cwd_path())
            .field("commands", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl ShellSession {
    /// Select a drive, fetch its permissions and structure.
    ///
    /// A missing permission record is fatal. A malformed or unavailable
    /// structure is only a warning: the session starts but cannot navigate
    /// until a later refresh succeeds.
    pub fn start(
        api: Box<dyn DriveApi>,
        mut frontend: Box<dyn Frontend>,
        registry: Arc<CommandRegistry>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let instances = api.instances()?;
        info!(count = instances.len(), "fetched drive instances");

        let instance = select_instance(
            &instances,
            config.preferred_instance,
            frontend.as_mut(),
        )?;
        let permissions = fetch_permissions(api.as_ref(), &instance)?;

        let mut session = Self {
            api,
            frontend,
            registry,
            config,
            instances,
            rank: permissions.rank(),
            permissions,
            instance,
            tree: None,
            cwd: NodeId::default(),
        };
        session.load_initial_structure()?;
        Ok(session)
    }

    fn load_initial_structure(&mut self) -> Result<(), SessionError> {
        match self.refresh() {
            Ok(()) => Ok(()),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                warn!(error = %err, "initial structure unavailable");
                self.emit(Output::warning(format!(
                    "Drive structure is unavailable: {err}"
                )));
                Ok(())
            }
        }
    }

    // ========================================================================
    // Read-eval loop
    // ========================================================================

    /// Read and dispatch lines until a command exits or input is interrupted.
    pub fn run(&mut self) -> Result<ExitReason, SessionError> {
        info!(instance = %self.instance, rank = %self.rank, "interactive session started");
        self.emit(Output::success("Interactive shell session started..."));

        loop {
            let prompt = self.prompt();
            match self.frontend.read_line(&prompt)? {
                ReadOutcome::Line(line) => {
                    if let Flow::Exit(reason) = self.dispatch(&line)? {
                        info!(?reason, "session ended");
                        return Ok(reason);
                    }
                }
                ReadOutcome::Interrupted | ReadOutcome::Eof => {
                    self.emit(Output::error("Exiting..."));
                    info!("session interrupted");
                    return Ok(ExitReason::Interrupted);
                }
            }
        }
    }

    /// Parse, permission-check and run one line.
    ///
    /// Every failure is reported through the frontend and the loop goes on,
    /// except an [`ApiError`] that invalidates the whole session.
    pub fn dispatch(&mut self, line: &str) -> Result<Flow, SessionError> {
        let invocation = match parse(line, &self.registry) {
            Ok(invocation) => invocation,
            Err(err) => {
                debug!(%line, error = %err, "parse failed");
                self.emit(Output::error(err.to_string()));
                return Ok(Flow::Continue);
            }
        };

        let command = invocation.command();
        if !self.rank.satisfies(command.required()) {
            let denied = CommandError::PermissionDenied {
                command: command.name().to_string(),
                required: command.required().unwrap_or(Rank::Owner),
            };
            debug!(rank = %self.rank, error = %denied, "permission denied");
            self.emit(Output::error(denied.to_string()));
            return Ok(Flow::Continue);
        }

        let name = command.name().to_string();
        match invocation.invoke(self) {
            Ok(flow) => Ok(flow),
            Err(err) if err.is_fatal() => {
                warn!(command = %name, error = %err, "fatal api error");
                self.emit(Output::error(err.to_string()));
                Err(err.into())
            }
            Err(err) => {
                debug!(command = %name, error = %err, "command failed");
                self.emit(Output::error(err.to_string()));
                Ok(Flow::Continue)
            }
        }
    }

    /// Prompt for the next read.
    pub fn prompt(&self) -> Prompt {
        Prompt {
            rank: self.rank,
            instance: self.instance.name.clone(),
            cwd: self.cwd_path(),
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Fetch a fresh snapshot and swap in a new tree.
    ///
    /// A malformed snapshot keeps the previous tree and only warns. The
    /// working directory is re-resolved by path in the new tree.
    pub fn refresh(&mut self) -> CommandResult<()> {
        let snapshot = self.api.structure(self.instance.id)?;
        match Tree::from_snapshot(&snapshot) {
            Ok(tree) => {
                debug!(nodes = tree.len(), "structure refreshed");
                self.install_tree(tree);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "keeping previous structure");
                let kept = if self.tree.is_some() {
                    "keeping the previous structure"
                } else {
                    "drive is not navigable yet"
                };
                self.emit(Output::warning(format!("{err} ({kept})")));
                Ok(())
            }
        }
    }

    fn install_tree(&mut self, tree: Tree) {
        let previous = self.tree.as_ref().map(|old| old.node(self.cwd).path().to_string());
        let root = tree.root();
        self.cwd = match &previous {
            None => root,
            Some(path) => match tree.resolve_dir(root, path) {
                Ok(id) => id,
                Err(_) => {
                    warn!(cwd = %path, "working directory vanished, moving to root");
                    self.emit(Output::warning(format!(
                        "Updated structure no longer contains your working directory {path}; moved to {}",
                        tree.node(root).path()
                    )));
                    root
                }
            },
        };
        self.tree = Some(tree);
    }

    /// The current tree, if a valid snapshot has been loaded.
    pub fn tree(&self) -> VfsResult<&Tree> {
        self.tree.as_ref().ok_or(VfsError::Unavailable)
    }

    /// Working directory node in [`ShellSession::tree`].
    pub fn cwd(&self) -> NodeId {
        self.cwd
    }

    /// Change directory to `id`, which must be a directory of the current tree.
    pub fn set_cwd(&mut self, id: NodeId) -> VfsResult<()> {
        let tree = self.tree()?;
        match tree.get(id) {
            Some(node) if node.is_dir() => {
                debug!(cwd = %node.path(), "changed directory");
                self.cwd = id;
                Ok(())
            }
            Some(node) => Err(VfsError::not_a_directory(node.path())),
            None => Err(VfsError::not_found(format!("{id:?}"))),
        }
    }

    /// Canonical path of the working directory (`~/` before any tree loads).
    pub fn cwd_path(&self) -> String {
        match &self.tree {
            Some(tree) => tree.node(self.cwd).path().to_string(),
            None => drivecord_types::ROOT_PATH.to_string(),
        }
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Ask the user for a drive again and re-initialize against it.
    ///
    /// The current drive stays selected if the choice is cancelled or the
    /// new drive's permissions cannot be fetched.
    pub fn switch_instance(&mut self) -> CommandResult<()> {
        let instance = select_instance(&self.instances, None, self.frontend.as_mut())
            .map_err(|err| CommandError::failed(err.to_string()))?;
        let permissions = match fetch_permissions(self.api.as_ref(), &instance) {
            Ok(permissions) => permissions,
            Err(SessionError::Permissions { source, .. }) => return Err(source.into()),
            Err(err) => return Err(CommandError::failed(err.to_string())),
        };

        info!(from = %self.instance, to = %instance, "switching instance");
        self.instance = instance;
        self.permissions = permissions;
        self.rank = permissions.rank();
        self.tree = None;
        self.cwd = NodeId::default();

        match self.refresh() {
            Err(err) if !err.is_fatal() => {
                self.emit(Output::warning(format!("Drive structure is unavailable: {err}")));
                Ok(())
            }
            other => other,
        }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    pub fn api(&self) -> &dyn DriveApi {
        self.api.as_ref()
    }

    pub fn frontend_mut(&mut self) -> &mut dyn Frontend {
        self.frontend.as_mut()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Send output to the frontend.
    pub fn emit(&mut self, output: Output) {
        self.frontend.emit(output);
    }
}

/// Pick the drive to work on.
///
/// A single candidate is taken without asking, as is `preferred` when it is
/// one of the candidates. Otherwise the frontend asks the user.
fn select_instance(
    instances: &[Instance],
    preferred: Option<InstanceId>,
    frontend: &mut dyn Frontend,
) -> Result<Instance, SessionError> {
    match instances {
        [] => Err(SessionError::NoInstances),
        [only] => {
            frontend.emit(Output::success(format!(
                "Selected the only instance: {}",
                only.name
            )));
            Ok(only.clone())
        }
        _ => {
            if let Some(id) = preferred {
                if let Some(found) = instances.iter().find(|i| i.id == id) {
                    frontend.emit(Output::success(format!("Selected instance: {}", found.name)));
                    return Ok(found.clone());
                }
                warn!(%id, "preferred instance is not available");
                frontend.emit(Output::warning(format!(
                    "Preferred instance {id} is not available"
                )));
            }
            let chosen = frontend
                .choose_instance(instances)
                .ok_or(SessionError::SelectionCancelled)?;
            instances
                .iter()
                .find(|i| i.id == chosen)
                .cloned()
                .ok_or(SessionError::SelectionCancelled)
        }
    }
}

fn fetch_permissions(api: &dyn DriveApi, instance: &Instance) -> Result<Permissions, SessionError> {
    api.permissions(instance.id)
        .map_err(|source| SessionError::Permissions {
            instance: instance.to_string(),
            source,
        })
}
