//! DriveCord interactive shell.
//!
//! Usage:
//!   # Against a server, credentials from flags, env or config.toml
//!   drivecord --user-id 1234 --token <token>
//!
//!   # No token yet: sign in with the account password for this run
//!   drivecord --user-id 1234
//!
//!   # Offline demo drive, nothing leaves the process
//!   drivecord --offline
//!
//! Logs go to stderr (`--log-level` or `RUST_LOG`); stdout belongs to the shell.

mod config;
mod editor;
mod login;
mod render;
mod terminal;

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use drivecord_client::{AccessClient, HttpDrive};
use drivecord_kernel::{CommandRegistry, DriveApi, MemoryDrive, Output, ShellSession};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{FileConfig, Settings};
use crate::terminal::Terminal;

/// Interactive shell for DriveCord drives.
#[derive(Parser, Debug)]
#[command(name = "drivecord", version)]
#[command(about = "Interactive shell for DriveCord drives")]
pub(crate) struct Args {
    /// Base URL of the DriveCord API
    #[arg(long, env = "DRIVECORD_API_URL")]
    api_url: Option<String>,

    /// Account user id
    #[arg(long, env = "DRIVECORD_USER_ID")]
    user_id: Option<u64>,

    /// Access token for the account
    #[arg(long, env = "DRIVECORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Open this drive instance without asking
    #[arg(short, long)]
    instance: Option<u64>,

    /// Where downloads are saved (one subdirectory per drive)
    #[arg(long)]
    downloads_dir: Option<String>,

    /// Config file [default: <config dir>/drivecord/config.toml]
    #[arg(short, long)]
    config: Option<String>,

    /// Log filter, e.g. `info` or `drivecord_kernel=debug`
    #[arg(long)]
    log_level: Option<String>,

    /// Use a built-in in-memory demo drive instead of a server
    #[arg(long)]
    offline: bool,
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "×".red());
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let args = Args::parse();
    let (file, config_path) = FileConfig::discover(args.config.as_deref())?;
    let settings = Settings::resolve(&args, file);
    init_tracing(args.log_level.is_some(), &settings.log_level);

    if let Some(path) = &config_path {
        info!(path = %path.display(), "loaded config file");
    }

    println!("{}", render::banner("DriveCord Shell"));
    let mut session_config = settings.session_config();
    let api: Box<dyn DriveApi> = if settings.offline {
        info!("starting with the in-memory demo drive");
        Box::new(MemoryDrive::demo())
    } else {
        let drive = connect(&settings)?;
        session_config.user_id = Some(drive.user_id());
        Box::new(drive)
    };

    let registry = Arc::new(CommandRegistry::with_builtins()?);
    let terminal = Terminal::new(&registry, settings.editor.as_deref())?;

    let mut session = ShellSession::start(api, Box::new(terminal), registry, session_config)?;
    let reason = session.run()?;
    Ok(reason.exit_code())
}

/// An explicit `--log-level` beats `RUST_LOG`, which beats the config file.
fn init_tracing(explicit: bool, level: &str) {
    let filter = if explicit {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn connect(settings: &Settings) -> Result<HttpDrive> {
    let access = AccessClient::new(&settings.api_url)?;
    if !access.is_reachable() {
        bail!("the DriveCord API is not reachable at {}", access.base_url());
    }
    info!(url = %access.base_url(), "connected");
    println!("{}", render::output(&Output::success("Connected to API.")));

    let credentials = login::credentials(&access, settings)?;
    Ok(HttpDrive::new(access.base_url(), credentials)?)
}
