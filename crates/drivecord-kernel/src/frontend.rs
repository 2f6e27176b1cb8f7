//! The session's channel to the user.
//!
//! A [`Frontend`] reads input lines, asks the user to pick a drive, opens an
//! editor, and renders [`Output`]. The terminal implementation lives in the
//! binary; [`ScriptedFrontend`] replays canned input for tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use drivecord_types::{Instance, InstanceId};

use crate::output::{Output, Prompt};

/// Result of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// The user cancelled (Ctrl-C).
    Interrupted,
    /// Input closed (Ctrl-D or end of a script).
    Eof,
}

/// User-facing side of a shell session.
pub trait Frontend {
    /// Show `prompt` and read one line.
    fn read_line(&mut self, prompt: &Prompt) -> io::Result<ReadOutcome>;

    /// Let the user pick one of `candidates`. `None` means cancelled.
    fn choose_instance(&mut self, candidates: &[Instance]) -> Option<InstanceId>;

    /// Let the user edit `content` of the file `name`. `None` means cancelled.
    fn edit(&mut self, name: &str, content: &str) -> io::Result<Option<String>>;

    /// Render one piece of output.
    fn emit(&mut self, output: Output);
}

/// Everything a [`ScriptedFrontend`] was shown.
#[derive(Debug, Default)]
struct Recorded {
    outputs: Vec<Output>,
    prompts: Vec<Prompt>,
}

/// Shared view of a [`ScriptedFrontend`]'s recording.
///
/// Clone it before handing the frontend to a session, inspect it after.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    inner: Arc<Mutex<Recorded>>,
}

impl Transcript {
    fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// All emitted outputs, in order.
    pub fn outputs(&self) -> Vec<Output> {
        self.with(|r| r.outputs.clone())
    }

    /// All prompts shown, in order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.with(|r| r.prompts.clone())
    }

    /// Messages of every `Error` output.
    pub fn errors(&self) -> Vec<String> {
        self.collect(|o| match o {
            Output::Error { message } => Some(message.clone()),
            _ => None,
        })
    }

    /// Messages of every `Warning` output.
    pub fn warnings(&self) -> Vec<String> {
        self.collect(|o| match o {
            Output::Warning { message } => Some(message.clone()),
            _ => None,
        })
    }

    /// Messages of every `Success` output.
    pub fn successes(&self) -> Vec<String> {
        self.collect(|o| match o {
            Output::Success { message } => Some(message.clone()),
            _ => None,
        })
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.with(|r| {
            r.outputs.clear();
            r.prompts.clear();
        });
    }

    fn collect<T>(&self, f: impl Fn(&Output) -> Option<T>) -> Vec<T> {
        self.with(|r| r.outputs.iter().filter_map(&f).collect())
    }
}

/// A frontend that replays queued input and records output.
///
/// Input lines run out as [`ReadOutcome::Eof`]. Instance choices and edits
/// come from their own queues, cancelling when empty.
#[derive(Debug, Default)]
pub struct ScriptedFrontend {
    lines: VecDeque<ReadOutcome>,
    choices: VecDeque<InstanceId>,
    edits: VecDeque<Option<String>>,
    transcript: Transcript,
}

impl ScriptedFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue input lines.
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .extend(lines.into_iter().map(|l| ReadOutcome::Line(l.into())));
        self
    }

    /// Queue a Ctrl-C after the lines queued so far.
    pub fn with_interrupt(mut self) -> Self {
        self.lines.push_back(ReadOutcome::Interrupted);
        self
    }

    /// Queue an answer for the next instance selection.
    pub fn with_choice(mut self, id: u64) -> Self {
        self.choices.push_back(InstanceId(id));
        self
    }

    /// Queue the result of the next edit (`None` cancels it).
    pub fn with_edit(mut self, content: Option<&str>) -> Self {
        self.edits.push_back(content.map(str::to_string));
        self
    }

    /// Handle to the recorded prompts and outputs.
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl Frontend for ScriptedFrontend {
    fn read_line(&mut self, prompt: &Prompt) -> io::Result<ReadOutcome> {
        self.transcript.with(|r| r.prompts.push(prompt.clone()));
        Ok(self.lines.pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn choose_instance(&mut self, candidates: &[Instance]) -> Option<InstanceId> {
        let choice = self.choices.pop_front()?;
        candidates.iter().any(|c| c.id == choice).then_some(choice)
    }

    fn edit(&mut self, _name: &str, _content: &str) -> io::Result<Option<String>> {
        Ok(self.edits.pop_front().flatten())
    }

    fn emit(&mut self, output: Output) {
        self.transcript.with(|r| r.outputs.push(output));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivecord_types::Rank;

    fn prompt() -> Prompt {
        Prompt {
            rank: Rank::Read,
            instance: "family".into(),
            cwd: "~/".into(),
        }
    }

    #[test]
    fn test_lines_then_eof() {
        let mut frontend = ScriptedFrontend::new().with_lines(["ls", "cd docs"]);
        assert_eq!(
            frontend.read_line(&prompt()).unwrap(),
            ReadOutcome::Line("ls".into())
        );
        assert_eq!(
            frontend.read_line(&prompt()).unwrap(),
            ReadOutcome::Line("cd docs".into())
        );
        assert_eq!(frontend.read_line(&prompt()).unwrap(), ReadOutcome::Eof);
        assert_eq!(frontend.transcript().prompts().len(), 3);
    }

    #[test]
    fn test_choice_must_be_a_candidate() {
        let candidates = [Instance::new(1, "a"), Instance::new(2, "b")];
        let mut frontend = ScriptedFrontend::new().with_choice(2).with_choice(9);
        assert_eq!(frontend.choose_instance(&candidates), Some(InstanceId(2)));
        assert_eq!(frontend.choose_instance(&candidates), None);
        assert_eq!(frontend.choose_instance(&candidates), None);
    }

    #[test]
    fn test_transcript_is_shared() {
        let mut frontend = ScriptedFrontend::new();
        let transcript = frontend.transcript();
        frontend.emit(Output::error("boom"));
        frontend.emit(Output::success("ok"));
        assert_eq!(transcript.errors(), ["boom"]);
        assert_eq!(transcript.successes(), ["ok"]);
        transcript.clear();
        assert!(transcript.outputs().is_empty());
    }
}
