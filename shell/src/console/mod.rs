//! Console abstraction used by the input loop and commands.
//!
//! The shell never touches the terminal directly. It writes text, moves the
//! caret relative to its current position and reads key presses through a
//! [`Console`], so the same engine drives a real terminal
//! ([`TerminalConsole`]) or a scripted in-memory one ([`MemoryConsole`]).

mod memory;
mod terminal;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyModifiers};

use crate::cancel::CancelToken;
use crate::error::Result;

pub use memory::{ConsoleOp, MemoryConsole};
pub use terminal::TerminalConsole;

/// A single key press: key code plus modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    /// Key that was pressed.
    pub code: KeyCode,
    /// Modifiers held while pressing it.
    pub modifiers: KeyModifiers,
}

impl KeyPress {
    /// Creates a key press.
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Key press without modifiers.
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Key press with only Ctrl held.
    pub const fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }

    /// Key press with only Alt held.
    pub const fn alt(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::ALT)
    }

    /// Printable character carried by this key, if any. Ctrl and Alt chords
    /// never produce text.
    ///
    /// ```
    /// use command_shell::KeyPress;
    /// use crossterm::event::{KeyCode, KeyModifiers};
    ///
    /// assert_eq!(KeyPress::plain(KeyCode::Char('a')).character(), Some('a'));
    /// assert_eq!(KeyPress::new(KeyCode::Char('A'), KeyModifiers::SHIFT).character(), Some('A'));
    /// assert_eq!(KeyPress::ctrl(KeyCode::Char('a')).character(), None);
    /// ```
    pub fn character(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch)
                if !self
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(ch)
            }
            _ => None,
        }
    }
}

impl From<char> for KeyPress {
    fn from(ch: char) -> Self {
        let modifiers = if ch.is_uppercase() {
            KeyModifiers::SHIFT
        } else {
            KeyModifiers::NONE
        };
        Self::new(KeyCode::Char(ch), modifiers)
    }
}

/// Output and key input for the shell.
///
/// Caret movement is relative and counted in characters; implementations
/// handle wrapping across terminal rows.
#[async_trait(?Send)]
pub trait Console {
    /// Writes text at the caret, advancing it.
    fn write(&mut self, text: &str) -> Result<()>;

    /// Writes a single character.
    fn write_char(&mut self, ch: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write(ch.encode_utf8(&mut buf))
    }

    /// Writes text followed by a line break.
    fn write_line(&mut self, text: &str) -> Result<()> {
        self.write(text)?;
        self.write("\n")
    }

    /// Writes a line to the error stream.
    fn write_error_line(&mut self, text: &str) -> Result<()>;

    /// Moves the caret by `delta` characters; negative moves left.
    fn move_caret(&mut self, delta: isize) -> Result<()>;

    /// Shows or hides the caret.
    fn set_caret_visible(&mut self, visible: bool) -> Result<()>;

    /// Clears the screen and homes the caret.
    fn clear(&mut self) -> Result<()>;

    /// Whether a key can be read without waiting.
    fn key_available(&mut self) -> Result<bool>;

    /// Waits for the next key press.
    ///
    /// Returns `Ok(None)` when `cancel` fires or when input is exhausted.
    async fn read_key(&mut self, cancel: &CancelToken) -> Result<Option<KeyPress>>;
}
