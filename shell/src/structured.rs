//! Grammar-driven commands.
//!
//! A [`StructuredCommand`] declares a [`CommandInputSpecification`] and works
//! with bound [`CommandInput`]s instead of raw parse results. The blanket
//! [`Command`] implementation derives dispatch, diagnostics and completion
//! from the grammar:
//!
//! - **can_handle** binds the line. A name mismatch is `NotMine`. Processing
//!   issues and then the detailed help are written to the error stream, and
//!   the answer is `MineButInvalid`.
//! - **suggest** completes name tokens while the caret is inside the name,
//!   option forms when the fragment starts with the preamble, and otherwise
//!   asks the command for argument or option-value candidates.
//! - **execute** rebinds and calls [`StructuredCommand::execute_input`].

use async_trait::async_trait;
use command_shell_core::{
    Binding, CommandInput, CommandInputSpecification, InputElementKind, ParseResult, bind,
    eq_ignore_case, normalize_section, render_aliases, render_usage, starts_with_ignore_case,
};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::command::{CanHandle, Command};
use crate::error::Result;
use crate::shell::Shell;

/// A command defined by a declarative grammar.
///
/// Only [`specification`](Self::specification) and
/// [`execute_input`](Self::execute_input) are required.
#[async_trait(?Send)]
pub trait StructuredCommand<S> {
    /// Grammar of the command.
    fn specification(&self) -> &CommandInputSpecification;

    /// One-line description for the help listing.
    fn summary(&self, _shell: &Shell<S>, _state: &S) -> Option<String> {
        None
    }

    /// Detailed help. Defaults to the summary, a usage line and aliases.
    fn details(&self, shell: &Shell<S>, state: &S, _input: &CommandInput) -> Option<String> {
        let spec = self.specification();
        let mut lines = Vec::new();
        if let Some(summary) = self.summary(shell, state) {
            lines.push(summary);
            lines.push(String::new());
        }
        lines.push(format!("Usage: {}", render_usage(spec)));
        if let Some(aliases) = render_aliases(spec) {
            lines.push(format!("Aliases: {aliases}"));
        }
        Some(lines.join("\n"))
    }

    /// Final semantic check on an input that bound without issues.
    fn can_handle_input(&self, _shell: &Shell<S>, _state: &S, _input: &CommandInput) -> bool {
        true
    }

    /// Candidates for the positional argument under the caret. `fragment`
    /// is the normalized text before the caret.
    fn suggest_argument(
        &self,
        _shell: &Shell<S>,
        _state: &S,
        _input: &CommandInput,
        _fragment: &str,
    ) -> Vec<String> {
        Vec::new()
    }

    /// Candidates for the value of option `option_id` under the caret.
    fn suggest_option_value(
        &self,
        _shell: &Shell<S>,
        _state: &S,
        _input: &CommandInput,
        _option_id: &str,
        _fragment: &str,
    ) -> Vec<String> {
        Vec::new()
    }

    /// Runs the command on a bound input.
    async fn execute_input(
        &self,
        shell: &mut Shell<S>,
        state: &mut S,
        input: &CommandInput,
        cancel: &CancelToken,
    ) -> Result<()>;
}

#[async_trait(?Send)]
impl<S: 'static, T> Command<S> for T
where
    T: StructuredCommand<S>,
{
    fn name(&self) -> String {
        self.specification().display_name()
    }

    fn input_specification(&self) -> Option<&CommandInputSpecification> {
        Some(self.specification())
    }

    fn can_handle(
        &self,
        shell: &mut Shell<S>,
        state: &mut S,
        parse: &ParseResult,
    ) -> Result<CanHandle> {
        match bind(self.specification(), parse) {
            Binding::Mismatch(_) => Ok(CanHandle::NotMine),
            Binding::Bound { input, issues } if !issues.is_empty() => {
                debug!(command = %self.specification().display_name(), issues = issues.len(), "Input has processing issues");
                for issue in &issues {
                    shell.console_mut().write_error_line(&issue.message)?;
                }
                if let Some(details) = self.details(shell, state, &input) {
                    shell.console_mut().write_error_line(&details)?;
                }
                Ok(CanHandle::MineButInvalid)
            }
            Binding::Bound { input, .. } => {
                if self.can_handle_input(shell, state, &input) {
                    Ok(CanHandle::MineAndValid)
                } else {
                    Ok(CanHandle::MineButInvalid)
                }
            }
        }
    }

    fn suggest(&self, shell: &Shell<S>, state: &S, parse: &ParseResult) -> Vec<String> {
        let spec = self.specification();
        if let Some(names) = name_suggestions(spec, parse) {
            return names;
        }

        let binding = bind(spec, parse);
        let Some(input) = binding.input() else {
            return Vec::new();
        };
        let Some(selected) = input.selected_element() else {
            return Vec::new();
        };

        let fragment = parse.selected_fragment();
        if fragment.starts_with(spec.option_preamble()) {
            return option_suggestions(spec, input, &fragment);
        }

        let normalized = normalize_section(&fragment);
        match selected.kind {
            InputElementKind::CommandName => Vec::new(),
            InputElementKind::OptionName => option_suggestions(spec, input, &fragment),
            InputElementKind::OptionValue => match selected.option_id.as_deref() {
                Some(id) => self.suggest_option_value(shell, state, input, id, &normalized),
                None => Vec::new(),
            },
            InputElementKind::Argument => {
                let mut suggestions = self.suggest_argument(shell, state, input, &normalized);
                if selected.is_empty() {
                    suggestions.extend(option_suggestions(spec, input, ""));
                }
                suggestions
            }
        }
    }

    async fn execute(
        &self,
        shell: &mut Shell<S>,
        state: &mut S,
        parse: &ParseResult,
        cancel: &CancelToken,
    ) -> Result<()> {
        match bind(self.specification(), parse) {
            Binding::Mismatch(_) => Ok(()),
            Binding::Bound { input, .. } => self.execute_input(shell, state, &input, cancel).await,
        }
    }

    fn help_summary(&self, shell: &Shell<S>, state: &S) -> Option<String> {
        self.summary(shell, state)
    }

    fn help_details(&self, shell: &Shell<S>, state: &S, parse: &ParseResult) -> Option<String> {
        match bind(self.specification(), parse) {
            Binding::Mismatch(_) => None,
            Binding::Bound { input, .. } => self.details(shell, state, &input),
        }
    }
}

/// Name-token completions while the caret is inside the name region of some
/// variant. `None` when the caret is past every name.
fn name_suggestions(spec: &CommandInputSpecification, parse: &ParseResult) -> Option<Vec<String>> {
    let selected = parse.selected_section();
    let fragment = normalize_section(&parse.selected_fragment());
    let mut in_name = false;
    let mut suggestions: Vec<String> = Vec::new();

    for variant in spec.command_names() {
        if selected >= variant.len() {
            continue;
        }
        let typed_prefix_matches = variant[..selected]
            .iter()
            .zip(parse.sections())
            .all(|(token, section)| eq_ignore_case(token, &normalize_section(section)));
        if !typed_prefix_matches {
            continue;
        }

        in_name = true;
        let token = &variant[selected];
        if starts_with_ignore_case(token, &fragment) && !suggestions.contains(token) {
            suggestions.push(token.clone());
        }
    }

    in_name.then_some(suggestions)
}

/// Option forms starting with `fragment` for options that may still occur.
fn option_suggestions(
    spec: &CommandInputSpecification,
    input: &CommandInput,
    fragment: &str,
) -> Vec<String> {
    let typing = input
        .selected_element()
        .filter(|element| element.kind == InputElementKind::OptionName)
        .and_then(|element| element.option_id.as_deref());

    spec.options()
        .iter()
        .filter(|option| {
            let mut count = input.option_count(option.id());
            if typing == Some(option.id()) {
                count = count.saturating_sub(1);
            }
            count < option.maximum_occurrences()
        })
        .flat_map(|option| option.forms().iter())
        .filter(|form| form.starts_with(fragment))
        .cloned()
        .collect()
}
