//! Settings from the command line, the environment and the config file.
//!
//! Precedence is command line (or its environment variable) over the TOML
//! file over built-in defaults. The file lives at
//! `<config dir>/drivecord/config.toml` unless `--config` names another one:
//!
//! ```toml
//! api_url = "http://localhost:8000/api/"
//! user_id = 1234
//! token = "..."
//! instance = 42
//! downloads_dir = "~/Downloads/drivecord"
//! editor = "nvim"
//! log_level = "info"
//! ```
//!
//! Credentials are only ever read here, never written back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use drivecord_client::DEFAULT_API_URL;
use drivecord_kernel::SessionConfig;
use drivecord_kernel::session::DEFAULT_DOWNLOADS_DIR;
use drivecord_types::InstanceId;
use serde::Deserialize;

use crate::Args;

/// Level used when neither `--log-level`, `RUST_LOG` nor the file set one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// User id of the account that owns the offline demo drive.
const OFFLINE_USER_ID: u64 = 1;

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub user_id: Option<u64>,
    pub token: Option<String>,
    pub instance: Option<u64>,
    pub downloads_dir: Option<String>,
    pub editor: Option<String>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load `explicit` (which must exist), or the default file if present.
    ///
    /// Returns the path actually read, if any.
    pub fn discover(explicit: Option<&str>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(raw) = explicit {
            let path = expand(raw);
            return Ok((Self::load(&path)?, Some(path)));
        }
        match default_config_path() {
            Some(path) if path.is_file() => Ok((Self::load(&path)?, Some(path))),
            _ => Ok((Self::default(), None)),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("drivecord").join("config.toml"))
}

/// Fully resolved settings for one run of the binary.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub user_id: Option<u64>,
    pub token: Option<String>,
    pub instance: Option<InstanceId>,
    pub downloads_dir: PathBuf,
    pub editor: Option<String>,
    pub log_level: String,
    pub offline: bool,
}

impl Settings {
    pub fn resolve(args: &Args, file: FileConfig) -> Self {
        let user_id = args.user_id.or(file.user_id);
        let downloads = args
            .downloads_dir
            .clone()
            .or(file.downloads_dir)
            .unwrap_or_else(|| DEFAULT_DOWNLOADS_DIR.to_string());

        Self {
            api_url: args
                .api_url
                .clone()
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            user_id: if args.offline {
                user_id.or(Some(OFFLINE_USER_ID))
            } else {
                user_id
            },
            token: args.token.clone().or(file.token),
            instance: args.instance.or(file.instance).map(InstanceId),
            downloads_dir: expand(&downloads),
            editor: file.editor,
            log_level: args
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            offline: args.offline,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            user_id: self.user_id,
            downloads_dir: self.downloads_dir.clone(),
            preferred_instance: self.instance,
        }
    }
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let argv = std::iter::once("drivecord").chain(extra.iter().copied());
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&args(&[]), FileConfig::default());
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.downloads_dir, PathBuf::from(DEFAULT_DOWNLOADS_DIR));
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(settings.instance, None);
        assert!(!settings.offline);
    }

    #[test]
    fn test_command_line_beats_file() {
        let file = FileConfig {
            api_url: Some("http://file/api/".into()),
            user_id: Some(7),
            instance: Some(3),
            editor: Some("nano".into()),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(
            &args(&["--api-url", "http://cli/api/", "--instance", "9"]),
            file,
        );
        assert_eq!(settings.api_url, "http://cli/api/");
        assert_eq!(settings.user_id, Some(7));
        assert_eq!(settings.instance, Some(InstanceId(9)));
        assert_eq!(settings.editor.as_deref(), Some("nano"));
    }

    #[test]
    fn test_offline_has_a_user() {
        let settings = Settings::resolve(&args(&["--offline"]), FileConfig::default());
        assert!(settings.offline);
        assert_eq!(settings.session_config().user_id, Some(OFFLINE_USER_ID));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "user_id = 12\ntoken = \"abc\"\ndownloads_dir = \"/tmp/dl\"\n").unwrap();

        let (file, found) = FileConfig::discover(path.to_str()).unwrap();
        assert_eq!(found, Some(path));
        assert_eq!(file.user_id, Some(12));
        assert_eq!(file.token.as_deref(), Some("abc"));
        assert_eq!(file.downloads_dir.as_deref(), Some("/tmp/dl"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "user = 12\n").unwrap();
        let err = FileConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(FileConfig::discover(missing.to_str()).is_err());
    }
}
