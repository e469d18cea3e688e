//! In-memory console for scripted sessions and tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use crossterm::event::KeyCode;

use super::{Console, KeyPress};
use crate::cancel::CancelToken;
use crate::error::Result;

/// A recorded console operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOp {
    /// Text written to the output stream.
    Write(String),
    /// Line written to the error stream.
    ErrorLine(String),
    /// Relative caret move.
    MoveCaret(isize),
    /// Caret visibility change.
    CaretVisible(bool),
    /// Screen clear.
    Clear,
}

#[derive(Debug)]
struct MemoryState {
    keys: VecDeque<KeyPress>,
    lines: Vec<Vec<char>>,
    column: usize,
    errors: Vec<String>,
    ops: Vec<ConsoleOp>,
    caret_visible: bool,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            keys: VecDeque::new(),
            lines: vec![Vec::new()],
            column: 0,
            errors: Vec::new(),
            ops: Vec::new(),
            caret_visible: true,
        }
    }
}

impl MemoryState {
    fn current(&mut self) -> &mut Vec<char> {
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    fn put(&mut self, ch: char) {
        match ch {
            '\n' => {
                self.lines.push(Vec::new());
                self.column = 0;
            }
            '\r' => self.column = 0,
            _ => {
                let column = self.column;
                let line = self.current();
                if column < line.len() {
                    line[column] = ch;
                } else {
                    line.resize(column, ' ');
                    line.push(ch);
                }
                self.column += 1;
            }
        }
    }
}

/// Console backed by memory: keys come from a script, output is captured on
/// a virtual screen where writes overwrite the characters under the caret.
///
/// Clones share the same state, so a test can keep a handle after moving the
/// console into a shell.
///
/// # Examples
///
/// ```
/// use command_shell::{Console, MemoryConsole};
///
/// let console = MemoryConsole::new();
/// let mut writer = console.clone();
/// writer.write("hello").unwrap();
/// writer.move_caret(-5).unwrap();
/// writer.write("J").unwrap();
/// assert_eq!(console.current_line(), "Jello");
/// assert_eq!(console.caret(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryConsole {
    /// Creates an empty console with no scripted keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a key press.
    pub fn push_key(&self, key: impl Into<KeyPress>) {
        self.state.borrow_mut().keys.push_back(key.into());
    }

    /// Queues several key presses.
    pub fn push_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyPress>,
    {
        let mut state = self.state.borrow_mut();
        state.keys.extend(keys.into_iter().map(Into::into));
    }

    /// Queues one key press per character of `text`.
    pub fn type_text(&self, text: &str) {
        self.push_keys(text.chars());
    }

    /// Queues `text` followed by Enter.
    pub fn type_line(&self, text: &str) {
        self.type_text(text);
        self.push_key(KeyPress::plain(KeyCode::Enter));
    }

    /// Number of scripted keys not yet read.
    pub fn remaining_keys(&self) -> usize {
        self.state.borrow().keys.len()
    }

    /// Screen contents, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        self.state
            .borrow()
            .lines
            .iter()
            .map(|line| line.iter().collect())
            .collect()
    }

    /// Screen contents joined with `\n`.
    pub fn output(&self) -> String {
        self.lines().join("\n")
    }

    /// The line the caret is on.
    pub fn current_line(&self) -> String {
        self.lines().pop().unwrap_or_default()
    }

    /// Caret column on the current line.
    pub fn caret(&self) -> usize {
        self.state.borrow().column
    }

    /// Whether the caret is currently visible.
    pub fn is_caret_visible(&self) -> bool {
        self.state.borrow().caret_visible
    }

    /// Lines written to the error stream.
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    /// Operations recorded so far.
    pub fn ops(&self) -> Vec<ConsoleOp> {
        self.state.borrow().ops.clone()
    }

    /// Returns and forgets the recorded operations.
    pub fn take_ops(&self) -> Vec<ConsoleOp> {
        std::mem::take(&mut self.state.borrow_mut().ops)
    }
}

#[async_trait(?Send)]
impl Console for MemoryConsole {
    fn write(&mut self, text: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(ConsoleOp::Write(text.to_string()));
        for ch in text.chars() {
            state.put(ch);
        }
        Ok(())
    }

    fn write_error_line(&mut self, text: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(ConsoleOp::ErrorLine(text.to_string()));
        state.errors.push(text.to_string());
        Ok(())
    }

    fn move_caret(&mut self, delta: isize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(ConsoleOp::MoveCaret(delta));
        state.column = state.column.saturating_add_signed(delta);
        Ok(())
    }

    fn set_caret_visible(&mut self, visible: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(ConsoleOp::CaretVisible(visible));
        state.caret_visible = visible;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(ConsoleOp::Clear);
        state.lines = vec![Vec::new()];
        state.column = 0;
        Ok(())
    }

    fn key_available(&mut self) -> Result<bool> {
        Ok(!self.state.borrow().keys.is_empty())
    }

    async fn read_key(&mut self, cancel: &CancelToken) -> Result<Option<KeyPress>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        Ok(self.state.borrow_mut().keys.pop_front())
    }
}
