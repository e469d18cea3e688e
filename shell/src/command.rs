//! The command contract the dispatcher works against.
//!
//! Most commands implement [`StructuredCommand`](crate::StructuredCommand)
//! and get this trait through a blanket implementation. Implementing
//! [`Command`] directly is for commands that parse their own input.

use async_trait::async_trait;
use command_shell_core::{CommandInputSpecification, ParseResult};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::shell::Shell;

/// Answer of [`Command::can_handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanHandle {
    /// The line is not addressed to this command.
    NotMine,
    /// The line names this command but is malformed. The command has
    /// already reported why; dispatch stops.
    MineButInvalid,
    /// The command will execute the line.
    MineAndValid,
}

/// A command the shell can dispatch to. `S` is the application state
/// threaded through every call.
#[async_trait(?Send)]
pub trait Command<S> {
    /// Display name, used in logs and help listings.
    fn name(&self) -> String;

    /// Grammar of the command, when it has one.
    fn input_specification(&self) -> Option<&CommandInputSpecification> {
        None
    }

    /// Decides whether this command handles `parse`. May write diagnostics
    /// when the answer is [`CanHandle::MineButInvalid`].
    fn can_handle(
        &self,
        shell: &mut Shell<S>,
        state: &mut S,
        parse: &ParseResult,
    ) -> Result<CanHandle>;

    /// Completion candidates for the section under the caret.
    fn suggest(&self, shell: &Shell<S>, state: &S, parse: &ParseResult) -> Vec<String>;

    /// Runs the command. Long-running work should observe `cancel`.
    async fn execute(
        &self,
        shell: &mut Shell<S>,
        state: &mut S,
        parse: &ParseResult,
        cancel: &CancelToken,
    ) -> Result<()>;

    /// One-line description for the help listing.
    fn help_summary(&self, shell: &Shell<S>, state: &S) -> Option<String>;

    /// Detailed help when `parse` addresses this command.
    fn help_details(&self, shell: &Shell<S>, state: &S, parse: &ParseResult) -> Option<String>;
}
