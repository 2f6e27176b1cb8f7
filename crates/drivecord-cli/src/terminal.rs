//! Line-editing terminal frontend.
//!
//! Reads commands through `rustyline` (history, Ctrl-C, Ctrl-D, completion
//! of command names and of local paths for uploads), asks for a drive with a
//! numbered menu and prints rendered output to stdout.

use std::io;

use anyhow::{Context as _, Result};
use drivecord_kernel::{CommandRegistry, Frontend, Output, Prompt, ReadOutcome};
use drivecord_types::{Instance, InstanceId};
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;

use crate::editor;
use crate::render;

/// Command whose argument is a path on the local machine.
const LOCAL_PATH_COMMAND: &str = "push";

// ============================================================================
// Completion
// ============================================================================

pub struct ShellHelper {
    tokens: Vec<String>,
    local_path_tokens: Vec<String>,
    files: FilenameCompleter,
}

impl ShellHelper {
    pub fn new(registry: &CommandRegistry) -> Self {
        let mut tokens: Vec<String> = registry
            .iter()
            .flat_map(|command| {
                std::iter::once(command.name().to_string()).chain(command.aliases().iter().cloned())
            })
            .collect();
        tokens.sort();

        let local_path_tokens = registry
            .find(LOCAL_PATH_COMMAND)
            .map(|command| {
                std::iter::once(command.name().to_string())
                    .chain(command.aliases().iter().cloned())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            tokens,
            local_path_tokens,
            files: FilenameCompleter::new(),
        }
    }

    /// Command names and aliases starting with `prefix`.
    fn command_candidates(&self, prefix: &str) -> Vec<Pair> {
        self.tokens
            .iter()
            .filter(|token| token.starts_with(prefix))
            .map(|token| Pair {
                display: token.clone(),
                replacement: token.clone(),
            })
            .collect()
    }

    fn wants_local_path(&self, head: &str) -> bool {
        head.split_whitespace()
            .next()
            .is_some_and(|command| self.local_path_tokens.iter().any(|t| t == command))
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        match head.rfind(' ') {
            None => Ok((0, self.command_candidates(head))),
            Some(_) if self.wants_local_path(head) => self.files.complete(line, pos, ctx),
            Some(_) => Ok((pos, Vec::new())),
        }
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

// ============================================================================
// Frontend
// ============================================================================

pub struct Terminal {
    editor: Editor<ShellHelper, DefaultHistory>,
    editor_command: String,
}

impl Terminal {
    pub fn new(registry: &CommandRegistry, editor_command: Option<&str>) -> Result<Self> {
        let mut line_editor: Editor<ShellHelper, DefaultHistory> =
            Editor::new().context("failed to initialize line editor")?;
        line_editor.set_helper(Some(ShellHelper::new(registry)));
        Ok(Self {
            editor: line_editor,
            editor_command: editor::resolve_editor(editor_command),
        })
    }

    fn read(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        debug!(error = %err, "history entry dropped");
                    }
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::other(err.to_string())),
        }
    }
}

impl Frontend for Terminal {
    fn read_line(&mut self, prompt: &Prompt) -> io::Result<ReadOutcome> {
        self.read(&render::prompt(prompt))
    }

    fn choose_instance(&mut self, candidates: &[Instance]) -> Option<InstanceId> {
        println!("{}", render::instance_menu(candidates));
        loop {
            let answer = match self.read("│ ~ ") {
                Ok(ReadOutcome::Line(answer)) => answer,
                Ok(_) => return None,
                Err(err) => {
                    debug!(error = %err, "instance selection aborted");
                    return None;
                }
            };
            match pick(candidates, answer.trim()) {
                Some(id) => {
                    println!("│\n{}", render::output(&Output::info("Instance selected.")));
                    return Some(id);
                }
                None => println!(
                    "{}",
                    render::output(&Output::error(format!(
                        "Answer must be a number from 1 to {}",
                        candidates.len()
                    )))
                ),
            }
        }
    }

    fn edit(&mut self, name: &str, content: &str) -> io::Result<Option<String>> {
        println!(
            "{}",
            render::output(&Output::info(format!(
                "Opening {name} in `{}`...",
                self.editor_command
            )))
        );
        editor::edit_text(&self.editor_command, name, content)
    }

    fn emit(&mut self, output: Output) {
        println!("{}", render::output(&output));
    }
}

/// 1-based menu position to instance id.
fn pick(candidates: &[Instance], answer: &str) -> Option<InstanceId> {
    let index: usize = answer.parse().ok()?;
    candidates
        .get(index.checked_sub(1)?)
        .map(|instance| instance.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> ShellHelper {
        ShellHelper::new(&CommandRegistry::with_builtins().unwrap())
    }

    #[test]
    fn test_pick_by_position() {
        let candidates = [Instance::new(10, "a"), Instance::new(20, "b")];
        assert_eq!(pick(&candidates, "2"), Some(InstanceId(20)));
        assert_eq!(pick(&candidates, "0"), None);
        assert_eq!(pick(&candidates, "3"), None);
        assert_eq!(pick(&candidates, "b"), None);
    }

    #[test]
    fn test_command_completion() {
        let helper = helper();
        let names: Vec<_> = helper
            .command_candidates("re")
            .into_iter()
            .map(|pair| pair.replacement)
            .collect();
        assert_eq!(names, ["read", "recache", "remove", "ren", "rename"]);
    }

    #[test]
    fn test_push_aliases_complete_local_paths() {
        let helper = helper();
        assert!(helper.wants_local_path("push ~/Doc"));
        assert!(helper.wants_local_path("upload ./"));
        assert!(!helper.wants_local_path("cd do"));
    }
}
