//! Tab completion cycling.
//!
//! The first Tab parses the line at the caret, asks every command for
//! candidates and replaces the section under the caret with the first one.
//! Further Tabs (or Shift+Tabs) step through the same candidate list as long
//! as the line still looks exactly as the last completion left it. Any other
//! edit starts a fresh cycle on the next Tab.

use command_shell_core::{parse, quote_if_needed};
use tracing::trace;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::shell::Shell;

/// Direction to step through candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleDirection {
    Forward,
    Backward,
}

/// Completion state carried between Tab presses.
#[derive(Debug, Default)]
pub(crate) struct SuggestionCycle {
    active: Option<ActiveCycle>,
}

#[derive(Debug)]
struct ActiveCycle {
    candidates: Vec<String>,
    index: usize,
    prefix: String,
    suffix: String,
    applied_text: String,
    applied_caret: usize,
}

impl ActiveCycle {
    fn step(&mut self, direction: CycleDirection) {
        let len = self.candidates.len();
        self.index = match direction {
            CycleDirection::Forward => (self.index + 1) % len,
            CycleDirection::Backward => (self.index + len - 1) % len,
        };
    }

    /// Line text and caret with the current candidate applied.
    fn render(&self) -> (String, usize) {
        let candidate = quote_if_needed(&self.candidates[self.index]);
        let caret = self.prefix.chars().count() + candidate.chars().count();
        (format!("{}{candidate}{}", self.prefix, self.suffix), caret)
    }
}

impl SuggestionCycle {
    /// Drops any cycle in progress.
    pub(crate) fn reset(&mut self) {
        self.active = None;
    }

    fn continues(&self, text: &str, caret: usize) -> bool {
        self.active
            .as_ref()
            .is_some_and(|cycle| cycle.applied_text == text && cycle.applied_caret == caret)
    }
}

/// Applies the next or previous completion candidate to the input line.
pub(crate) fn cycle<S: 'static>(
    shell: &mut Shell<S>,
    state: &S,
    direction: CycleDirection,
) -> Result<()> {
    let text = shell.input.text();
    let caret = shell.input.caret();

    if shell.suggestions.continues(&text, caret) {
        if let Some(active) = shell.suggestions.active.as_mut() {
            active.step(direction);
        }
    } else {
        let parsed = parse(&text, caret);
        let candidates = Dispatcher::suggestions(shell, state, &parsed);
        trace!(line = %text, caret, candidates = candidates.len(), "Collected suggestions");
        if candidates.is_empty() {
            shell.suggestions.reset();
            return Ok(());
        }

        let (start, end) = if parsed.starts_new_section() {
            (caret, caret)
        } else {
            let selected = parsed.selected_section();
            let start = parsed.section_start(selected);
            (start, start + parsed.section_len(selected))
        };
        let index = match direction {
            CycleDirection::Forward => 0,
            CycleDirection::Backward => candidates.len() - 1,
        };
        shell.suggestions.active = Some(ActiveCycle {
            candidates,
            index,
            prefix: text.chars().take(start).collect(),
            suffix: text.chars().skip(end).collect(),
            applied_text: String::new(),
            applied_caret: 0,
        });
    }

    let Some(active) = shell.suggestions.active.as_mut() else {
        return Ok(());
    };
    let (line, new_caret) = active.render();
    active.applied_text = line.clone();
    active.applied_caret = new_caret;

    let console = shell.console.as_mut();
    shell.input.set_input(console, &line)?;
    shell.input.set_caret(console, new_caret)
}
