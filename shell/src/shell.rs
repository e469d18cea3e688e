//! The shell composition root.
//!
//! A [`Shell`] ties together a console, the input line, history, the command
//! dispatcher and the key binding table, and runs the input loop until a
//! command requests exit or the console runs out of input. Build one with
//! [`Shell::builder`].

use std::collections::HashMap;

use tracing::{debug, info};

use crate::cancel::BreakScope;
use crate::command::Command;
use crate::config::ShellConfig;
use crate::console::{Console, KeyPress};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::history::History;
use crate::input::bindings::{KeyBinding, default_bindings};
use crate::input::{InputManager, event_loop};
use crate::suggestions::SuggestionCycle;

/// An interactive shell over application state `S`.
pub struct Shell<S> {
    pub(crate) console: Box<dyn Console>,
    pub(crate) input: InputManager,
    pub(crate) history: History,
    pub(crate) dispatcher: Dispatcher<S>,
    pub(crate) suggestions: SuggestionCycle,
    pub(crate) bindings: HashMap<KeyPress, KeyBinding<S>>,
    pub(crate) break_scope: BreakScope,
    pub(crate) config: ShellConfig,
    pub(crate) exit_requested: bool,
    handle_interrupts: bool,
}

impl<S: 'static> Shell<S> {
    /// Starts building a shell on `console`.
    pub fn builder(console: impl Console + 'static) -> ShellBuilder<S> {
        ShellBuilder::new(console)
    }

    /// Signals readiness, then reads and executes lines until exit is
    /// requested or input runs out.
    ///
    /// While running, the process's interrupt signal (Ctrl+C) cancels the
    /// active break scope instead of terminating the process, unless
    /// disabled with [`ShellBuilder::handle_interrupts`].
    pub async fn run(&mut self, state: &mut S) -> Result<()> {
        info!(commands = self.dispatcher.commands().len(), "Shell started");
        Dispatcher::on_ready(self, state)?;

        let result = if self.handle_interrupts {
            let breaks = self.break_scope.clone();
            let listener = async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    let cancelled = breaks.trigger();
                    debug!(cancelled, "Interrupt received");
                }
                std::future::pending::<()>().await
            };
            tokio::select! {
                result = event_loop::run(self, state) => result,
                () = listener => Ok(()),
            }
        } else {
            event_loop::run(self, state).await
        };

        info!("Shell stopped");
        result
    }

    /// The console.
    pub fn console_mut(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    /// The line being edited.
    pub fn input(&self) -> &InputManager {
        &self.input
    }

    /// Replaces the line being edited, redrawing it.
    pub fn set_input(&mut self, text: &str) -> Result<()> {
        self.input.set_input(self.console.as_mut(), text)
    }

    /// Command history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Mutable command history.
    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// The command dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// Mutable command dispatcher, e.g. to register commands at runtime.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<S> {
        &mut self.dispatcher
    }

    /// Signals readiness for the next line; see [`Dispatcher::on_ready`].
    pub fn signal_ready(&mut self, state: &S) -> Result<()> {
        Dispatcher::on_ready(self, state)
    }

    /// Binds `key`, replacing any previous binding.
    pub fn bind_key(&mut self, key: KeyPress, binding: impl Into<KeyBinding<S>>) {
        self.bindings.insert(key, binding.into());
    }

    /// Removes the binding of `key`, if any.
    pub fn unbind_key(&mut self, key: KeyPress) -> Option<KeyBinding<S>> {
        self.bindings.remove(&key)
    }

    /// Current binding of `key`.
    pub fn binding(&self, key: KeyPress) -> Option<&KeyBinding<S>> {
        self.bindings.get(&key)
    }

    /// The break scope slot shared with the interrupt listener.
    pub fn break_scope(&self) -> &BreakScope {
        &self.break_scope
    }

    /// Shell configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Asks the input loop to stop after the current key.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Whether exit was requested.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

/// Builder for [`Shell`].
///
/// # Examples
///
/// ```
/// use command_shell::{MemoryConsole, Shell, ShellConfig};
///
/// let config = ShellConfig { prompt: "api> ".into(), ..ShellConfig::default() };
/// let shell: Shell<()> = Shell::builder(MemoryConsole::new())
///     .config(config)
///     .handle_interrupts(false)
///     .build()
///     .unwrap();
/// assert_eq!(shell.config().prompt, "api> ");
/// ```
pub struct ShellBuilder<S> {
    console: Box<dyn Console>,
    config: ShellConfig,
    dispatcher: Dispatcher<S>,
    bindings: Vec<(KeyPress, KeyBinding<S>)>,
    history: Option<History>,
    handle_interrupts: bool,
}

impl<S: 'static> ShellBuilder<S> {
    fn new(console: impl Console + 'static) -> Self {
        Self {
            console: Box::new(console),
            config: ShellConfig::default(),
            dispatcher: Dispatcher::new(),
            bindings: Vec::new(),
            history: None,
            handle_interrupts: true,
        }
    }

    /// Uses `config` instead of the defaults.
    pub fn config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a command; see [`Dispatcher::add_command`].
    pub fn command(mut self, command: impl Command<S> + 'static) -> Self {
        self.dispatcher.add_command(command);
        self
    }

    /// Sets the readiness callback, which replaces the default prompt.
    pub fn on_ready(mut self, callback: impl Fn(&mut Shell<S>, &S) -> Result<()> + 'static) -> Self {
        self.dispatcher.set_ready_callback(callback);
        self
    }

    /// Binds a key on top of the default table.
    pub fn key_binding(mut self, key: KeyPress, binding: impl Into<KeyBinding<S>>) -> Self {
        self.bindings.push((key, binding.into()));
        self
    }

    /// Uses a prepared history instead of the one described by the config.
    pub fn history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    /// Whether [`Shell::run`] routes the interrupt signal to the break
    /// scope. Enabled by default.
    pub fn handle_interrupts(mut self, enabled: bool) -> Self {
        self.handle_interrupts = enabled;
        self
    }

    /// Builds the shell.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ShellError::Io) if the configured history file
    /// exists but cannot be read.
    pub fn build(self) -> Result<Shell<S>> {
        let history = match (self.history, &self.config.history.file) {
            (Some(history), _) => history,
            (None, Some(path)) => History::with_file(path, self.config.history.max_entries)?,
            (None, None) => History::new(self.config.history.max_entries),
        };

        let mut bindings = default_bindings();
        bindings.extend(self.bindings);

        Ok(Shell {
            console: self.console,
            input: InputManager::new().with_unicode_word_boundaries(self.config.unicode_word_boundaries),
            history,
            dispatcher: self.dispatcher,
            suggestions: SuggestionCycle::default(),
            bindings,
            break_scope: BreakScope::new(),
            config: self.config,
            exit_requested: false,
            handle_interrupts: self.handle_interrupts,
        })
    }
}
