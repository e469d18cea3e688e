//! Interactive shell engine.
//!
//! Builds a line-oriented shell on top of the grammars and binder in
//! [`command_shell_core`]:
//!
//! - [`Shell`]: composition root; runs the key loop over a [`Console`].
//! - [`InputManager`]: the edited line, caret and minimal redraws.
//! - [`Dispatcher`]: ordered command registry, execution and readiness.
//! - [`Command`] / [`StructuredCommand`]: the command contract and its
//!   grammar-driven implementation.
//! - [`CancelToken`] / [`BreakScope`]: cancellation wired to Ctrl+C.
//! - [`History`], [`ShellConfig`], [`RawModeGuard`].
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use command_shell::*;
//! use command_shell_core::{CommandInput, CommandInputSpecification};
//!
//! struct Echo(CommandInputSpecification);
//!
//! #[async_trait(?Send)]
//! impl StructuredCommand<()> for Echo {
//!     fn specification(&self) -> &CommandInputSpecification {
//!         &self.0
//!     }
//!
//!     async fn execute_input(
//!         &self,
//!         shell: &mut Shell<()>,
//!         _state: &mut (),
//!         input: &CommandInput,
//!         _cancel: &CancelToken,
//!     ) -> Result<()> {
//!         shell.console_mut().write_line(&input.argument_values().join(" "))
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let console = MemoryConsole::new();
//! console.type_line("echo hello world");
//!
//! let spec = CommandInputSpecification::builder(["echo"]).unbounded_arguments().finish();
//! let mut shell = Shell::builder(console.clone())
//!     .command(Echo(spec))
//!     .config(ShellConfig { raw_mode: false, ..ShellConfig::default() })
//!     .handle_interrupts(false)
//!     .build()?;
//! shell.run(&mut ()).await?;
//!
//! assert!(console.lines().contains(&"hello world".to_string()));
//! # Ok::<(), ShellError>(())
//! # }).unwrap();
//! ```

mod cancel;
mod command;
mod config;
mod console;
mod dispatcher;
mod error;
mod history;
mod input;
mod raw_mode;
mod shell;
mod structured;
mod suggestions;

pub use cancel::{BreakScope, CancelToken, ScopeGuard};
pub use command::{CanHandle, Command};
pub use config::{DEFAULT_HISTORY_SIZE, DEFAULT_PROMPT, HistoryConfig, ShellConfig};
pub use console::{Console, ConsoleOp, KeyPress, MemoryConsole, TerminalConsole};
pub use dispatcher::{COMMAND_CANCELLED, Dispatcher, NO_MATCHING_COMMAND, ReadyCallback};
pub use error::{Result, ShellError};
pub use history::History;
pub use input::InputManager;
pub use input::bindings::{EditAction, KeyBinding, KeyHandler, default_bindings};
pub use raw_mode::RawModeGuard;
pub use shell::{Shell, ShellBuilder};
pub use structured::StructuredCommand;

pub use crossterm::event::{KeyCode, KeyModifiers};
