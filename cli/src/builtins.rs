//! Built-in commands of the standalone shell.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

use async_trait::async_trait;
use command_shell::{
    CancelToken, Command, Console, KeyBinding, KeyCode, KeyPress, Result, Shell, ShellConfig,
    ShellError, StructuredCommand,
};
use command_shell_core::{
    CommandInput, CommandInputSpecification, InputElementKind, OptionSpecification, parse,
};
use regex::{Captures, Regex};

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("static regex must compile"));

/// Session variables shared by the built-in commands.
#[derive(Debug, Default)]
pub struct SessionState {
    variables: BTreeMap<String, String>,
}

impl SessionState {
    /// Replaces `$name` references with variable values. Unknown variables
    /// expand to nothing.
    pub fn expand(&self, text: &str) -> String {
        VARIABLE_RE
            .replace_all(text, |caps: &Captures<'_>| {
                self.variables.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

/// Builds the standalone shell on `console`.
pub fn build_shell(
    console: impl Console + 'static,
    config: ShellConfig,
    handle_interrupts: bool,
) -> Result<Shell<SessionState>> {
    Shell::builder(console)
        .config(config)
        .handle_interrupts(handle_interrupts)
        .command(Echo::new())
        .command(Set::new())
        .command(Clear::new())
        .command(HistoryCommand::new())
        .command(Help::new())
        .command(Exit::new())
        .key_binding(
            KeyPress::ctrl(KeyCode::Char('l')),
            KeyBinding::from_fn(|_key, shell: &mut Shell<SessionState>, _state| redraw(shell)),
        )
        .build()
}

/// Clears the screen and redraws the prompt and the line being edited.
fn redraw(shell: &mut Shell<SessionState>) -> Result<()> {
    let prompt = shell.config().prompt.clone();
    let text = shell.input().text();
    let back = shell.input().len() - shell.input().caret();

    let console = shell.console_mut();
    console.clear()?;
    console.write(&prompt)?;
    console.write(&text)?;
    console.move_caret(-(back as isize))
}

/// Whether the caret sits on the first positional argument.
fn is_first_argument(input: &CommandInput) -> bool {
    let Some(selected) = input.selected_element() else {
        return false;
    };
    selected.kind == InputElementKind::Argument
        && input
            .arguments()
            .iter()
            .all(|argument| argument.section_index >= selected.section_index)
}

struct Echo {
    spec: CommandInputSpecification,
}

impl Echo {
    fn new() -> Self {
        Self {
            spec: CommandInputSpecification::builder(["echo"])
                .unbounded_arguments()
                .finish(),
        }
    }
}

#[async_trait(?Send)]
impl StructuredCommand<SessionState> for Echo {
    fn specification(&self) -> &CommandInputSpecification {
        &self.spec
    }

    fn summary(&self, _shell: &Shell<SessionState>, _state: &SessionState) -> Option<String> {
        Some("Prints its arguments, expanding $variables.".to_string())
    }

    async fn execute_input(
        &self,
        shell: &mut Shell<SessionState>,
        state: &mut SessionState,
        input: &CommandInput,
        _cancel: &CancelToken,
    ) -> Result<()> {
        let words: Vec<String> = input
            .argument_values()
            .iter()
            .map(|word| state.expand(word))
            .collect();
        shell.console_mut().write_line(&words.join(" "))
    }
}

struct Set {
    spec: CommandInputSpecification,
}

impl Set {
    fn new() -> Self {
        Self {
            spec: CommandInputSpecification::builder(["set"])
                .with_option(OptionSpecification::new("delete").with_forms(["-d", "--delete"]))
                .maximum_arguments(2)
                .finish(),
        }
    }
}

#[async_trait(?Send)]
impl StructuredCommand<SessionState> for Set {
    fn specification(&self) -> &CommandInputSpecification {
        &self.spec
    }

    fn summary(&self, _shell: &Shell<SessionState>, _state: &SessionState) -> Option<String> {
        Some("Lists, shows, assigns or deletes session variables.".to_string())
    }

    fn suggest_argument(
        &self,
        _shell: &Shell<SessionState>,
        state: &SessionState,
        input: &CommandInput,
        fragment: &str,
    ) -> Vec<String> {
        if !is_first_argument(input) {
            return Vec::new();
        }
        state
            .variables
            .keys()
            .filter(|name| name.starts_with(fragment))
            .cloned()
            .collect()
    }

    async fn execute_input(
        &self,
        shell: &mut Shell<SessionState>,
        state: &mut SessionState,
        input: &CommandInput,
        _cancel: &CancelToken,
    ) -> Result<()> {
        let name = input.argument(0);
        let value = input.argument(1);

        if input.option_count("delete") > 0 {
            let name = name.ok_or_else(|| ShellError::command("Missing variable name"))?;
            if value.is_some() {
                return Err(ShellError::command("--delete takes only a variable name"));
            }
            return match state.variables.remove(name) {
                Some(_) => Ok(()),
                None => Err(ShellError::command(format!("Unknown variable '{name}'"))),
            };
        }

        match (name, value) {
            (None, _) => {
                for (name, value) in &state.variables {
                    shell.console_mut().write_line(&format!("{name}={value}"))?;
                }
                Ok(())
            }
            (Some(name), None) => match state.variables.get(name) {
                Some(value) => shell.console_mut().write_line(value),
                None => Err(ShellError::command(format!("Unknown variable '{name}'"))),
            },
            (Some(name), Some(value)) => {
                let value = state.expand(value);
                state.variables.insert(name.to_string(), value);
                Ok(())
            }
        }
    }
}

struct Clear {
    spec: CommandInputSpecification,
}

impl Clear {
    fn new() -> Self {
        Self {
            spec: CommandInputSpecification::builder(["clear"])
                .alternate_name(["cls"])
                .finish(),
        }
    }
}

#[async_trait(?Send)]
impl StructuredCommand<SessionState> for Clear {
    fn specification(&self) -> &CommandInputSpecification {
        &self.spec
    }

    fn summary(&self, _shell: &Shell<SessionState>, _state: &SessionState) -> Option<String> {
        Some("Clears the screen.".to_string())
    }

    async fn execute_input(
        &self,
        shell: &mut Shell<SessionState>,
        _state: &mut SessionState,
        _input: &CommandInput,
        _cancel: &CancelToken,
    ) -> Result<()> {
        shell.console_mut().clear()
    }
}

struct HistoryCommand {
    spec: CommandInputSpecification,
}

impl HistoryCommand {
    fn new() -> Self {
        Self {
            spec: CommandInputSpecification::builder(["history"])
                .with_option(OptionSpecification::new("clear").with_forms(["-c", "--clear"]))
                .finish(),
        }
    }
}

#[async_trait(?Send)]
impl StructuredCommand<SessionState> for HistoryCommand {
    fn specification(&self) -> &CommandInputSpecification {
        &self.spec
    }

    fn summary(&self, _shell: &Shell<SessionState>, _state: &SessionState) -> Option<String> {
        Some("Lists or clears command history.".to_string())
    }

    async fn execute_input(
        &self,
        shell: &mut Shell<SessionState>,
        _state: &mut SessionState,
        input: &CommandInput,
        _cancel: &CancelToken,
    ) -> Result<()> {
        if input.option_count("clear") > 0 {
            shell.history_mut().clear();
            return Ok(());
        }

        let lines: Vec<String> = shell
            .history()
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| format!("{:>4}  {entry}", index + 1))
            .collect();
        for line in lines {
            shell.console_mut().write_line(&line)?;
        }
        Ok(())
    }
}

struct Help {
    spec: CommandInputSpecification,
}

impl Help {
    fn new() -> Self {
        Self {
            spec: CommandInputSpecification::builder(["help"])
                .alternate_name(["?"])
                .unbounded_arguments()
                .finish(),
        }
    }
}

#[async_trait(?Send)]
impl StructuredCommand<SessionState> for Help {
    fn specification(&self) -> &CommandInputSpecification {
        &self.spec
    }

    fn summary(&self, _shell: &Shell<SessionState>, _state: &SessionState) -> Option<String> {
        Some("Lists commands, or describes one.".to_string())
    }

    fn suggest_argument(
        &self,
        shell: &Shell<SessionState>,
        _state: &SessionState,
        input: &CommandInput,
        fragment: &str,
    ) -> Vec<String> {
        if !is_first_argument(input) {
            return Vec::new();
        }
        shell
            .dispatcher()
            .commands()
            .iter()
            .filter_map(|command| command.input_specification())
            .flat_map(|spec| spec.command_names().iter().filter_map(|name| name.first()))
            .filter(|token| token.starts_with(fragment))
            .cloned()
            .collect()
    }

    async fn execute_input(
        &self,
        shell: &mut Shell<SessionState>,
        state: &mut SessionState,
        input: &CommandInput,
        _cancel: &CancelToken,
    ) -> Result<()> {
        let commands: Vec<Rc<dyn Command<SessionState>>> = shell.dispatcher().commands().to_vec();

        if input.argument_values().is_empty() {
            let entries: Vec<(String, String)> = commands
                .iter()
                .map(|command| {
                    let summary = command.help_summary(shell, state).unwrap_or_default();
                    (command.name(), summary)
                })
                .collect();
            let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, summary) in entries {
                let line = format!("{name:<width$}  {summary}");
                shell.console_mut().write_line(line.trim_end())?;
            }
            return Ok(());
        }

        let topic = input.argument_values().join(" ");
        let parsed = parse(&topic, topic.chars().count());
        let details = commands
            .iter()
            .find_map(|command| command.help_details(shell, state, &parsed));
        match details {
            Some(details) => shell.console_mut().write_line(&details),
            None => Err(ShellError::command(format!("No help available for '{topic}'"))),
        }
    }
}

struct Exit {
    spec: CommandInputSpecification,
}

impl Exit {
    fn new() -> Self {
        Self {
            spec: CommandInputSpecification::builder(["exit"])
                .alternate_name(["quit"])
                .finish(),
        }
    }
}

#[async_trait(?Send)]
impl StructuredCommand<SessionState> for Exit {
    fn specification(&self) -> &CommandInputSpecification {
        &self.spec
    }

    fn summary(&self, _shell: &Shell<SessionState>, _state: &SessionState) -> Option<String> {
        Some("Leaves the shell.".to_string())
    }

    async fn execute_input(
        &self,
        shell: &mut Shell<SessionState>,
        _state: &mut SessionState,
        _input: &CommandInput,
        _cancel: &CancelToken,
    ) -> Result<()> {
        shell.request_exit();
        Ok(())
    }
}
