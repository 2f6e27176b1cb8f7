//! External text editor for the `edit` command.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

use tracing::debug;

#[cfg(windows)]
const FALLBACK_EDITOR: &str = "notepad";
#[cfg(not(windows))]
const FALLBACK_EDITOR: &str = "vi";

/// Editor command: the configured one, then `$VISUAL`, then `$EDITOR`.
pub fn resolve_editor(configured: Option<&str>) -> String {
    configured
        .map(str::to_string)
        .or_else(|| env::var("VISUAL").ok())
        .or_else(|| env::var("EDITOR").ok())
        .filter(|command| !command.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_EDITOR.to_string())
}

/// Open `content` in `command` and return the saved text.
///
/// `None` means the file came back unchanged, which counts as cancelling.
/// The temporary file keeps `name`'s extension for syntax highlighting.
pub fn edit_text(command: &str, name: &str, content: &str) -> io::Result<Option<String>> {
    let words = shlex::split(command).unwrap_or_default();
    let (program, args) = words.split_first().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot parse editor command `{command}`"),
        )
    })?;

    let suffix = Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut file = tempfile::Builder::new()
        .prefix("drivecord-")
        .suffix(&suffix)
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;

    debug!(editor = %command, path = %file.path().display(), "launching editor");
    let status = Command::new(program).args(args).arg(file.path()).status()?;
    if !status.success() {
        return Err(io::Error::other(format!(
            "editor `{command}` exited with {status}"
        )));
    }

    let edited = fs::read_to_string(file.path())?;
    Ok((edited != content).then_some(edited))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_editor_wins() {
        assert_eq!(resolve_editor(Some("nano -w")), "nano -w");
    }

    #[test]
    fn test_blank_command_is_rejected() {
        let err = edit_text("", "a.txt", "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[cfg(unix)]
    #[test]
    fn test_unchanged_file_cancels() {
        assert_eq!(edit_text("true", "a.txt", "same").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_changes_come_back() {
        let edited = edit_text(r#"sh -c 'printf changed > "$0"'"#, "a.txt", "old").unwrap();
        assert_eq!(edited.as_deref(), Some("changed"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_editor_is_an_error() {
        assert!(edit_text("false", "a.txt", "x").is_err());
    }
}
