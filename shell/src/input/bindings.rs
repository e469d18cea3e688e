//! Key bindings.
//!
//! The shell keeps a table from key presses to [`KeyBinding`]s. A binding is
//! either one of the built-in [`EditAction`]s or a custom [`KeyHandler`].
//! Keys without a binding that carry a printable character are typed into
//! the line.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyModifiers};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::console::KeyPress;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::shell::Shell;
use crate::suggestions::{self, CycleDirection};

/// Built-in line editing actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditAction {
    /// Caret one character left.
    MoveLeft,
    /// Caret one character right.
    MoveRight,
    /// Caret to the start of the line.
    MoveToStart,
    /// Caret to the end of the line.
    MoveToEnd,
    /// Caret to the start of the previous word.
    MoveWordBack,
    /// Caret past the end of the next word.
    MoveWordForward,
    /// Replace the line with the previous history entry.
    PreviousHistory,
    /// Replace the line with the next history entry, or clear it.
    NextHistory,
    /// Apply the next completion candidate.
    NextSuggestion,
    /// Apply the previous completion candidate.
    PreviousSuggestion,
    /// Clear the line.
    ClearLine,
    /// Delete the character before the caret.
    RemovePrevious,
    /// Delete the character under the caret.
    RemoveCurrent,
    /// Switch between insert and overwrite mode.
    ToggleOverwrite,
    /// Submit the line to the dispatcher.
    Execute,
    /// Break key pressed while no command runs: discard the line.
    Break,
}

impl EditAction {
    pub(crate) async fn perform<S: 'static>(
        self,
        shell: &mut Shell<S>,
        state: &mut S,
        cancel: &CancelToken,
    ) -> Result<()> {
        let console = shell.console.as_mut();
        match self {
            Self::MoveLeft => shell.input.move_caret_left(console),
            Self::MoveRight => shell.input.move_caret_right(console),
            Self::MoveToStart => shell.input.move_to_start(console),
            Self::MoveToEnd => shell.input.move_to_end(console),
            Self::MoveWordBack => shell.input.move_word_back(console),
            Self::MoveWordForward => shell.input.move_word_forward(console),
            Self::PreviousHistory => match shell.history.previous() {
                Some(entry) => shell.input.set_input(console, entry),
                None => Ok(()),
            },
            Self::NextHistory => {
                let entry = shell.history.next().unwrap_or_default();
                shell.input.set_input(console, entry)
            }
            Self::NextSuggestion => suggestions::cycle(shell, state, CycleDirection::Forward),
            Self::PreviousSuggestion => suggestions::cycle(shell, state, CycleDirection::Backward),
            Self::ClearLine => shell.input.set_input(console, ""),
            Self::RemovePrevious => shell.input.remove_previous_character(console),
            Self::RemoveCurrent => shell.input.remove_current_character(console),
            Self::ToggleOverwrite => {
                shell.input.toggle_overwrite_mode();
                Ok(())
            }
            Self::Execute => Dispatcher::execute_command(shell, state, cancel).await,
            Self::Break => {
                debug!("Break while idle, discarding line");
                shell.input.set_input(console, "")
            }
        }
    }
}

/// Custom behavior bound to a key.
#[async_trait(?Send)]
pub trait KeyHandler<S> {
    /// Handles `key`. The handler runs inside its own break scope; `cancel`
    /// fires when the user presses the break key.
    async fn handle(
        &self,
        key: KeyPress,
        shell: &mut Shell<S>,
        state: &mut S,
        cancel: &CancelToken,
    ) -> Result<()>;
}

struct FnHandler<F>(F);

#[async_trait(?Send)]
impl<S, F> KeyHandler<S> for FnHandler<F>
where
    F: Fn(KeyPress, &mut Shell<S>, &mut S) -> Result<()>,
{
    async fn handle(
        &self,
        key: KeyPress,
        shell: &mut Shell<S>,
        state: &mut S,
        _cancel: &CancelToken,
    ) -> Result<()> {
        (self.0)(key, shell, state)
    }
}

/// What a key press does.
pub enum KeyBinding<S> {
    /// A built-in edit action.
    Action(EditAction),
    /// A custom handler.
    Handler(Rc<dyn KeyHandler<S>>),
}

impl<S: 'static> KeyBinding<S> {
    /// Wraps a custom handler.
    pub fn handler(handler: impl KeyHandler<S> + 'static) -> Self {
        Self::Handler(Rc::new(handler))
    }

    /// Wraps a synchronous closure.
    ///
    /// ```
    /// use command_shell::KeyBinding;
    ///
    /// let clear_screen: KeyBinding<()> =
    ///     KeyBinding::from_fn(|_key, shell, _state| shell.console_mut().clear());
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(KeyPress, &mut Shell<S>, &mut S) -> Result<()> + 'static,
    {
        Self::Handler(Rc::new(FnHandler(f)))
    }

    pub(crate) async fn invoke(
        &self,
        key: KeyPress,
        shell: &mut Shell<S>,
        state: &mut S,
        cancel: &CancelToken,
    ) -> Result<()> {
        match self {
            Self::Action(action) => action.perform(shell, state, cancel).await,
            Self::Handler(handler) => handler.handle(key, shell, state, cancel).await,
        }
    }
}

impl<S> Clone for KeyBinding<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Action(action) => Self::Action(*action),
            Self::Handler(handler) => Self::Handler(Rc::clone(handler)),
        }
    }
}

impl<S> fmt::Debug for KeyBinding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl<S> From<EditAction> for KeyBinding<S> {
    fn from(action: EditAction) -> Self {
        Self::Action(action)
    }
}

/// The standard key table.
pub fn default_bindings<S>() -> HashMap<KeyPress, KeyBinding<S>> {
    use EditAction::*;

    let table = [
        (KeyPress::plain(KeyCode::Left), MoveLeft),
        (KeyPress::plain(KeyCode::Right), MoveRight),
        (KeyPress::plain(KeyCode::Home), MoveToStart),
        (KeyPress::plain(KeyCode::End), MoveToEnd),
        (KeyPress::plain(KeyCode::Up), PreviousHistory),
        (KeyPress::plain(KeyCode::Down), NextHistory),
        (KeyPress::plain(KeyCode::Tab), NextSuggestion),
        (KeyPress::plain(KeyCode::BackTab), PreviousSuggestion),
        (KeyPress::new(KeyCode::BackTab, KeyModifiers::SHIFT), PreviousSuggestion),
        (KeyPress::new(KeyCode::Tab, KeyModifiers::SHIFT), PreviousSuggestion),
        (KeyPress::plain(KeyCode::Esc), ClearLine),
        (KeyPress::plain(KeyCode::Backspace), RemovePrevious),
        (KeyPress::plain(KeyCode::Delete), RemoveCurrent),
        (KeyPress::plain(KeyCode::Insert), ToggleOverwrite),
        (KeyPress::plain(KeyCode::Enter), Execute),
        (KeyPress::ctrl(KeyCode::Char('c')), Break),
    ];

    table
        .into_iter()
        .map(|(key, action)| (key, KeyBinding::Action(action)))
        .collect()
}

/// Editing chords recognized only while the terminal is in raw mode. They
/// are not part of the binding table and cannot be rebound.
pub(crate) fn raw_mode_chord(key: KeyPress) -> Option<EditAction> {
    let ctrl = key.modifiers == KeyModifiers::CONTROL;
    let alt = key.modifiers == KeyModifiers::ALT;
    match key.code {
        KeyCode::Char('a') if ctrl => Some(EditAction::MoveToStart),
        KeyCode::Char('e') if ctrl => Some(EditAction::MoveToEnd),
        KeyCode::Left if ctrl => Some(EditAction::MoveWordBack),
        KeyCode::Right if ctrl => Some(EditAction::MoveWordForward),
        KeyCode::Char('b') if alt => Some(EditAction::MoveWordBack),
        KeyCode::Char('f') if alt => Some(EditAction::MoveWordForward),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_covers_editing_keys() {
        let bindings = default_bindings::<()>();

        let action = |key: KeyPress| match bindings.get(&key) {
            Some(KeyBinding::Action(action)) => Some(*action),
            _ => None,
        };
        assert_eq!(action(KeyPress::plain(KeyCode::Enter)), Some(EditAction::Execute));
        assert_eq!(action(KeyPress::plain(KeyCode::Tab)), Some(EditAction::NextSuggestion));
        assert_eq!(
            action(KeyPress::new(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(EditAction::PreviousSuggestion)
        );
        assert_eq!(action(KeyPress::ctrl(KeyCode::Char('c'))), Some(EditAction::Break));
        assert_eq!(action(KeyPress::plain(KeyCode::Char('a'))), None);
    }

    #[test]
    fn test_raw_mode_chords() {
        assert_eq!(
            raw_mode_chord(KeyPress::ctrl(KeyCode::Char('a'))),
            Some(EditAction::MoveToStart)
        );
        assert_eq!(
            raw_mode_chord(KeyPress::alt(KeyCode::Char('f'))),
            Some(EditAction::MoveWordForward)
        );
        assert_eq!(raw_mode_chord(KeyPress::plain(KeyCode::Char('a'))), None);
    }
}
