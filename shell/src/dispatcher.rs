//! Command registry and line execution.
//!
//! The dispatcher owns the ordered list of commands. When a line is
//! submitted it is parsed once and offered to each command in registration
//! order; the first command answering anything but
//! [`CanHandle::NotMine`] ends the search. A command's execution races the
//! cancellation token so the break key aborts it at its next await point.
//!
//! After every line the dispatcher makes sure the shell signals readiness
//! exactly once, normally by writing the prompt.

use std::fmt;
use std::rc::Rc;

use command_shell_core::{
    ParseResult, ValidationError, eq_ignore_case, find_ambiguities, parse, validate_specification,
};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::command::{CanHandle, Command};
use crate::error::{Result, ShellError};
use crate::shell::Shell;

/// Message shown when no command accepts a line.
pub const NO_MATCHING_COMMAND: &str = "No matching command found.";

/// Message shown when the break key aborts a command.
pub const COMMAND_CANCELLED: &str = "Command cancelled.";

/// Callback run when the shell becomes ready for the next line.
pub type ReadyCallback<S> = Rc<dyn Fn(&mut Shell<S>, &S) -> Result<()>>;

/// Ordered command registry.
pub struct Dispatcher<S> {
    commands: Vec<Rc<dyn Command<S>>>,
    ready: bool,
    on_ready: Option<ReadyCallback<S>>,
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            ready: false,
            on_ready: None,
        }
    }
}

impl<S> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.commands.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

impl<S: 'static> Dispatcher<S> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command after every command already registered.
    ///
    /// The command's grammar is validated and checked for name overlaps
    /// with earlier commands. Problems are logged and returned, but the
    /// command is registered regardless; the earlier command wins on
    /// overlapping input.
    pub fn add_command(&mut self, command: impl Command<S> + 'static) -> Vec<ValidationError> {
        self.add_shared_command(Rc::new(command))
    }

    /// Registers an already shared command.
    pub fn add_shared_command(&mut self, command: Rc<dyn Command<S>>) -> Vec<ValidationError> {
        let mut problems = Vec::new();
        if let Some(spec) = command.input_specification() {
            problems.extend(validate_specification(spec));
            let registered = self
                .commands
                .iter()
                .filter_map(|existing| existing.input_specification());
            problems.extend(find_ambiguities(registered, spec));
        }

        for problem in &problems {
            warn!(command = %command.name(), problem = %problem, "Command registered with grammar problem");
        }
        debug!(command = %command.name(), position = self.commands.len(), "Registered command");
        self.commands.push(command);
        problems
    }

    /// Registered commands in dispatch order.
    pub fn commands(&self) -> &[Rc<dyn Command<S>>] {
        &self.commands
    }

    /// Whether readiness was signalled since the last line was submitted.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Replaces the readiness callback.
    pub fn set_ready_callback(
        &mut self,
        callback: impl Fn(&mut Shell<S>, &S) -> Result<()> + 'static,
    ) {
        self.on_ready = Some(Rc::new(callback));
    }

    /// Signals readiness: runs the readiness callback unless it already ran
    /// since the last submitted line. Commands may call this themselves to
    /// print the prompt before producing further output.
    pub fn on_ready(shell: &mut Shell<S>, state: &S) -> Result<()> {
        if shell.dispatcher.ready {
            return Ok(());
        }
        shell.dispatcher.ready = true;
        match shell.dispatcher.on_ready.clone() {
            Some(callback) => callback(shell, state),
            None => {
                let prompt = shell.config.prompt.clone();
                shell.console.write(&prompt)
            }
        }
    }

    /// Candidates from every command for the caret position in `parse`,
    /// de-duplicated and sorted ignoring case.
    pub fn suggestions(shell: &Shell<S>, state: &S, parse: &ParseResult) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for command in &shell.dispatcher.commands {
            for suggestion in command.suggest(shell, state, parse) {
                if !all.iter().any(|known| eq_ignore_case(known, &suggestion)) {
                    all.push(suggestion);
                }
            }
        }
        all.sort_by_cached_key(|suggestion| suggestion.to_lowercase());
        all
    }

    /// Submits the current input line.
    ///
    /// Blank lines only re-signal readiness. Otherwise the line goes to
    /// history and is dispatched; command failures are reported on the
    /// console and never propagate. Only console I/O errors are returned.
    pub async fn execute_command(shell: &mut Shell<S>, state: &mut S, cancel: &CancelToken) -> Result<()> {
        shell.dispatcher.ready = false;
        shell.suggestions.reset();
        shell.console.write_line("")?;

        let line = shell.input.text();
        if !line.trim().is_empty() {
            shell.history.add(&line);
            Self::dispatch(shell, state, &line, cancel).await?;
        }

        if !shell.dispatcher.ready {
            shell.console.write_line("")?;
            Self::on_ready(shell, state)?;
        }
        shell.input.reset_input();
        Ok(())
    }

    async fn dispatch(shell: &mut Shell<S>, state: &mut S, line: &str, cancel: &CancelToken) -> Result<()> {
        let parsed = parse(line, line.chars().count());
        let commands = shell.dispatcher.commands.clone();

        for command in &commands {
            match command.can_handle(shell, state, &parsed)? {
                CanHandle::NotMine => continue,
                CanHandle::MineButInvalid => {
                    debug!(command = %command.name(), "Command rejected malformed input");
                    return Ok(());
                }
                CanHandle::MineAndValid => {
                    info!(command = %command.name(), "Executing command");
                    let token = cancel.child();
                    let outcome = tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(ShellError::Cancelled),
                        result = command.execute(shell, state, &parsed, &token) => result,
                    };
                    return Self::report(shell, command.as_ref(), outcome);
                }
            }
        }

        debug!(line = %line, "No command accepted the line");
        shell.console.write_error_line(NO_MATCHING_COMMAND)
    }

    fn report(shell: &mut Shell<S>, command: &dyn Command<S>, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(ShellError::Cancelled) => {
                info!(command = %command.name(), "Command cancelled");
                shell.console.write_error_line(COMMAND_CANCELLED)
            }
            Err(err) => {
                warn!(command = %command.name(), error = %err, "Command failed");
                shell.console.write_error_line(&format!("Error: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use async_trait::async_trait;
    use command_shell_core::CommandInputSpecification;

    use super::*;
    use crate::config::ShellConfig;
    use crate::console::MemoryConsole;

    enum Outcome {
        Succeed,
        Fail,
        Hang,
    }

    struct Fixed {
        name: &'static str,
        answer: CanHandle,
        outcome: Outcome,
        runs: Rc<Cell<usize>>,
    }

    impl Fixed {
        fn new(name: &'static str, answer: CanHandle) -> Self {
            Self {
                name,
                answer,
                outcome: Outcome::Succeed,
                runs: Rc::new(Cell::new(0)),
            }
        }

        fn with_outcome(mut self, outcome: Outcome) -> Self {
            self.outcome = outcome;
            self
        }
    }

    #[async_trait(?Send)]
    impl Command<()> for Fixed {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn can_handle(&self, _: &mut Shell<()>, _: &mut (), _: &ParseResult) -> Result<CanHandle> {
            Ok(self.answer)
        }

        fn suggest(&self, _: &Shell<()>, _: &(), _: &ParseResult) -> Vec<String> {
            vec![self.name.to_string()]
        }

        async fn execute(
            &self,
            shell: &mut Shell<()>,
            _: &mut (),
            _: &ParseResult,
            _: &CancelToken,
        ) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            match self.outcome {
                Outcome::Succeed => shell.console_mut().write_line(&format!("ran {}", self.name)),
                Outcome::Fail => Err(ShellError::command("backend unavailable")),
                Outcome::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }

        fn help_summary(&self, _: &Shell<()>, _: &()) -> Option<String> {
            None
        }

        fn help_details(&self, _: &Shell<()>, _: &(), _: &ParseResult) -> Option<String> {
            None
        }
    }

    fn shell(console: &MemoryConsole, commands: Vec<Fixed>) -> Shell<()> {
        let mut builder = Shell::builder(console.clone())
            .config(ShellConfig {
                raw_mode: false,
                ..ShellConfig::default()
            })
            .handle_interrupts(false);
        for command in commands {
            builder = builder.command(command);
        }
        builder.build().unwrap()
    }

    async fn submit(shell: &mut Shell<()>, line: &str, cancel: &CancelToken) {
        shell.set_input(line).unwrap();
        Dispatcher::execute_command(shell, &mut (), cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_first_claiming_command_wins() {
        let console = MemoryConsole::new();
        let skipped = Fixed::new("skipped", CanHandle::NotMine);
        let chosen = Fixed::new("chosen", CanHandle::MineAndValid);
        let later = Fixed::new("later", CanHandle::MineAndValid);
        let (skipped_runs, chosen_runs, later_runs) =
            (skipped.runs.clone(), chosen.runs.clone(), later.runs.clone());
        let mut shell = shell(&console, vec![skipped, chosen, later]);

        submit(&mut shell, "anything", &CancelToken::new()).await;

        assert_eq!(skipped_runs.get(), 0);
        assert_eq!(chosen_runs.get(), 1);
        assert_eq!(later_runs.get(), 0);
        assert!(console.lines().contains(&"ran chosen".to_string()));
        assert_eq!(shell.history().entries(), ["anything"]);
    }

    #[tokio::test]
    async fn test_invalid_input_stops_dispatch() {
        let console = MemoryConsole::new();
        let invalid = Fixed::new("invalid", CanHandle::MineButInvalid);
        let fallback = Fixed::new("fallback", CanHandle::MineAndValid);
        let fallback_runs = fallback.runs.clone();
        let mut shell = shell(&console, vec![invalid, fallback]);

        submit(&mut shell, "invalid x", &CancelToken::new()).await;

        assert_eq!(fallback_runs.get(), 0);
        assert!(console.errors().is_empty());
    }

    #[tokio::test]
    async fn test_unclaimed_line_reports_no_match() {
        let console = MemoryConsole::new();
        let mut shell = shell(&console, vec![Fixed::new("other", CanHandle::NotMine)]);

        submit(&mut shell, "unknown", &CancelToken::new()).await;

        assert_eq!(console.errors(), vec![NO_MATCHING_COMMAND.to_string()]);
        assert!(shell.dispatcher().is_ready());
        assert_eq!(console.current_line(), "> ");
        assert!(shell.input().is_empty());
    }

    #[tokio::test]
    async fn test_command_error_is_reported() {
        let console = MemoryConsole::new();
        let failing = Fixed::new("failing", CanHandle::MineAndValid).with_outcome(Outcome::Fail);
        let mut shell = shell(&console, vec![failing]);

        submit(&mut shell, "failing", &CancelToken::new()).await;

        assert_eq!(console.errors(), vec!["Error: backend unavailable".to_string()]);
        assert!(shell.dispatcher().is_ready());
    }

    #[tokio::test]
    async fn test_cancelled_command_is_reported() {
        let console = MemoryConsole::new();
        let hanging = Fixed::new("hanging", CanHandle::MineAndValid).with_outcome(Outcome::Hang);
        let mut shell = shell(&console, vec![hanging]);

        let cancel = CancelToken::new();
        cancel.cancel();
        submit(&mut shell, "hanging", &cancel).await;

        assert_eq!(console.errors(), vec![COMMAND_CANCELLED.to_string()]);
    }

    #[tokio::test]
    async fn test_blank_line_only_reprompts() {
        let console = MemoryConsole::new();
        let command = Fixed::new("any", CanHandle::MineAndValid);
        let runs = command.runs.clone();
        let mut shell = shell(&console, vec![command]);

        submit(&mut shell, "   ", &CancelToken::new()).await;

        assert_eq!(runs.get(), 0);
        assert!(shell.history().is_empty());
        assert_eq!(console.current_line(), "> ");
    }

    #[tokio::test]
    async fn test_on_ready_runs_once_per_line() {
        let console = MemoryConsole::new();
        let mut shell = shell(&console, Vec::new());
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        shell.dispatcher_mut().set_ready_callback(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        Dispatcher::on_ready(&mut shell, &()).unwrap();
        Dispatcher::on_ready(&mut shell, &()).unwrap();
        assert_eq!(calls.get(), 1);

        submit(&mut shell, "", &CancelToken::new()).await;
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_suggestions_are_merged_and_sorted() {
        let console = MemoryConsole::new();
        let shell = shell(
            &console,
            vec![
                Fixed::new("beta", CanHandle::NotMine),
                Fixed::new("alpha", CanHandle::NotMine),
                Fixed::new("Alpha", CanHandle::NotMine),
                Fixed::new("Gamma", CanHandle::NotMine),
            ],
        );

        let parsed = parse("", 0);
        assert_eq!(
            Dispatcher::suggestions(&shell, &(), &parsed),
            vec!["alpha", "beta", "Gamma"]
        );
    }

    #[test]
    fn test_add_command_reports_grammar_problems() {
        struct Named(CommandInputSpecification);

        #[async_trait(?Send)]
        impl crate::structured::StructuredCommand<()> for Named {
            fn specification(&self) -> &CommandInputSpecification {
                &self.0
            }

            async fn execute_input(
                &self,
                _: &mut Shell<()>,
                _: &mut (),
                _: &command_shell_core::CommandInput,
                _: &CancelToken,
            ) -> Result<()> {
                Ok(())
            }
        }

        let mut dispatcher = Dispatcher::<()>::new();
        let set = CommandInputSpecification::builder(["set"]).maximum_arguments(2).finish();
        let set_base = CommandInputSpecification::builder(["set", "base"]).finish();

        assert!(dispatcher.add_command(Named(set)).is_empty());
        let problems = dispatcher.add_command(Named(set_base));
        assert!(matches!(
            problems.as_slice(),
            [ValidationError::AmbiguousCommandName { .. }]
        ));
        assert_eq!(dispatcher.commands().len(), 2);
    }
}
