//! Line buffer, caret and terminal redraw.
//!
//! [`InputManager`] owns the text being edited and the caret position within
//! it, both counted in characters. Every edit updates the buffer and redraws
//! only the part of the line that changed, using relative caret moves on the
//! [`Console`]. The console caret is assumed to sit at the buffer caret
//! before each call and is left there afterwards.

pub mod bindings;
pub(crate) mod event_loop;

use crate::console::Console;
use crate::error::Result;

/// Editable input line.
///
/// # Examples
///
/// ```
/// use command_shell::{InputManager, MemoryConsole};
///
/// let mut console = MemoryConsole::new();
/// let mut input = InputManager::new();
/// input.insert(&mut console, &['e', 'c', 'h', 'o'])?;
/// input.move_caret_left(&mut console)?;
/// input.remove_previous_character(&mut console)?;
///
/// assert_eq!(input.text(), "eco");
/// assert_eq!(input.caret(), 2);
/// assert_eq!(console.current_line().trim_end(), "eco");
/// # Ok::<(), command_shell::ShellError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct InputManager {
    buffer: Vec<char>,
    caret: usize,
    overwrite: bool,
    unicode_words: bool,
}

impl InputManager {
    /// Creates an empty line in insert mode with ASCII word boundaries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses between Unicode and ASCII alphanumerics as word characters.
    pub fn with_unicode_word_boundaries(mut self, unicode: bool) -> Self {
        self.unicode_words = unicode;
        self
    }

    /// Current line contents.
    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Current line as characters.
    pub fn chars(&self) -> &[char] {
        &self.buffer
    }

    /// Length of the line in characters.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the line is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Caret position, `0..=len`.
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Whether typed characters replace the ones under the caret.
    pub fn is_overwrite_mode(&self) -> bool {
        self.overwrite
    }

    /// Switches between insert and overwrite mode.
    pub fn toggle_overwrite_mode(&mut self) {
        self.overwrite = !self.overwrite;
    }

    /// Moves the caret to `position`, clamped to the line.
    pub fn set_caret(&mut self, console: &mut dyn Console, position: usize) -> Result<()> {
        let target = position.min(self.buffer.len());
        let delta = target as isize - self.caret as isize;
        if delta != 0 {
            console.move_caret(delta)?;
        }
        self.caret = target;
        Ok(())
    }

    /// Moves one character left.
    pub fn move_caret_left(&mut self, console: &mut dyn Console) -> Result<()> {
        self.set_caret(console, self.caret.saturating_sub(1))
    }

    /// Moves one character right.
    pub fn move_caret_right(&mut self, console: &mut dyn Console) -> Result<()> {
        self.set_caret(console, self.caret + 1)
    }

    /// Moves to the start of the line.
    pub fn move_to_start(&mut self, console: &mut dyn Console) -> Result<()> {
        self.set_caret(console, 0)
    }

    /// Moves to the end of the line.
    pub fn move_to_end(&mut self, console: &mut dyn Console) -> Result<()> {
        self.set_caret(console, self.buffer.len())
    }

    /// Moves to the start of the run of same-class characters (word or
    /// non-word) that ends at the caret.
    pub fn move_word_back(&mut self, console: &mut dyn Console) -> Result<()> {
        let Some(&before) = self.caret.checked_sub(1).and_then(|i| self.buffer.get(i)) else {
            return Ok(());
        };
        let class = self.is_word_char(before);
        let mut target = self.caret;
        while target > 0 && self.is_word_char(self.buffer[target - 1]) == class {
            target -= 1;
        }
        self.set_caret(console, target)
    }

    /// Moves past the run of same-class characters starting at the caret.
    pub fn move_word_forward(&mut self, console: &mut dyn Console) -> Result<()> {
        let Some(&under) = self.buffer.get(self.caret) else {
            return Ok(());
        };
        let class = self.is_word_char(under);
        let mut target = self.caret;
        while target < self.buffer.len() && self.is_word_char(self.buffer[target]) == class {
            target += 1;
        }
        self.set_caret(console, target)
    }

    /// Backspace: removes the character before the caret.
    pub fn remove_previous_character(&mut self, console: &mut dyn Console) -> Result<()> {
        if self.caret == 0 {
            return Ok(());
        }
        self.caret -= 1;
        self.buffer.remove(self.caret);
        console.move_caret(-1)?;
        self.redraw_tail_after_removal(console)
    }

    /// Delete: removes the character under the caret.
    pub fn remove_current_character(&mut self, console: &mut dyn Console) -> Result<()> {
        if self.caret >= self.buffer.len() {
            return Ok(());
        }
        self.buffer.remove(self.caret);
        self.redraw_tail_after_removal(console)
    }

    /// Inserts (or overwrites, in overwrite mode) a run of characters at the
    /// caret and leaves the caret after them.
    pub fn insert(&mut self, console: &mut dyn Console, chars: &[char]) -> Result<()> {
        if chars.is_empty() {
            return Ok(());
        }
        let typed: String = chars.iter().collect();

        if self.overwrite {
            let end = (self.caret + chars.len()).min(self.buffer.len());
            self.buffer.splice(self.caret..end, chars.iter().copied());
            console.write(&typed)?;
            self.caret += chars.len();
            return Ok(());
        }

        self.buffer.splice(self.caret..self.caret, chars.iter().copied());
        self.caret += chars.len();
        let tail: String = self.buffer[self.caret..].iter().collect();
        console.write(&typed)?;
        if !tail.is_empty() {
            console.write(&tail)?;
            console.move_caret(-(tail.chars().count() as isize))?;
        }
        Ok(())
    }

    /// Replaces the whole line, rewriting only what differs from the
    /// current text. The caret ends up at the end of the new line.
    ///
    /// ```
    /// use command_shell::{ConsoleOp, InputManager, MemoryConsole};
    ///
    /// let mut console = MemoryConsole::new();
    /// let mut input = InputManager::new();
    /// input.set_input(&mut console, "abcdef")?;
    /// console.take_ops();
    ///
    /// input.set_input(&mut console, "abcxyz")?;
    /// assert!(console.ops().contains(&ConsoleOp::Write("xyz".into())));
    /// assert_eq!(console.current_line(), "abcxyz");
    /// # Ok::<(), command_shell::ShellError>(())
    /// ```
    pub fn set_input(&mut self, console: &mut dyn Console, text: &str) -> Result<()> {
        let new: Vec<char> = text.chars().collect();
        let common = self
            .buffer
            .iter()
            .zip(&new)
            .take_while(|(old, new)| old == new)
            .count();
        let stale = self.buffer.len().saturating_sub(new.len());

        console.set_caret_visible(false)?;
        self.set_caret(console, common)?;

        let suffix: String = new[common..].iter().collect();
        if !suffix.is_empty() {
            console.write(&suffix)?;
        }
        if stale > 0 {
            console.write(&" ".repeat(stale))?;
            console.move_caret(-(stale as isize))?;
        }

        self.caret = new.len();
        self.buffer = new;
        console.set_caret_visible(true)
    }

    /// Forgets the line without touching the console, after it was
    /// submitted.
    pub fn reset_input(&mut self) {
        self.buffer.clear();
        self.caret = 0;
    }

    fn redraw_tail_after_removal(&mut self, console: &mut dyn Console) -> Result<()> {
        let mut tail: String = self.buffer[self.caret..].iter().collect();
        tail.push(' ');
        console.write(&tail)?;
        console.move_caret(-(tail.chars().count() as isize))
    }

    fn is_word_char(&self, ch: char) -> bool {
        if self.unicode_words {
            ch.is_alphanumeric()
        } else {
            ch.is_ascii_alphanumeric()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{ConsoleOp, MemoryConsole};

    fn typed(text: &str) -> (MemoryConsole, InputManager) {
        let mut console = MemoryConsole::new();
        let mut input = InputManager::new();
        let chars: Vec<char> = text.chars().collect();
        input.insert(&mut console, &chars).unwrap();
        console.take_ops();
        (console, input)
    }

    #[test]
    fn test_remove_previous_at_end() {
        let (mut console, mut input) = typed("echo on");
        input.remove_previous_character(&mut console).unwrap();

        assert_eq!(input.text(), "echo o");
        assert_eq!(input.caret(), 6);
        assert_eq!(console.current_line().trim_end(), "echo o");
        assert_eq!(console.caret(), 6);
    }

    #[test]
    fn test_remove_previous_mid_line() {
        let (mut console, mut input) = typed("echo on");
        input.set_caret(&mut console, 4).unwrap();
        input.remove_previous_character(&mut console).unwrap();

        assert_eq!(input.text(), "ech on");
        assert_eq!(input.caret(), 3);
        assert_eq!(console.current_line().trim_end(), "ech on");
        assert_eq!(console.caret(), 3);
    }

    #[test]
    fn test_remove_previous_at_start_is_noop() {
        let (mut console, mut input) = typed("echo");
        input.move_to_start(&mut console).unwrap();
        console.take_ops();

        input.remove_previous_character(&mut console).unwrap();
        assert_eq!(input.text(), "echo");
        assert!(console.ops().is_empty());
    }

    #[test]
    fn test_remove_current_character() {
        let (mut console, mut input) = typed("abc");
        input.set_caret(&mut console, 1).unwrap();
        input.remove_current_character(&mut console).unwrap();

        assert_eq!(input.text(), "ac");
        assert_eq!(input.caret(), 1);
        assert_eq!(console.current_line().trim_end(), "ac");
        assert_eq!(console.caret(), 1);
    }

    #[test]
    fn test_insert_mid_line_redraws_tail() {
        let (mut console, mut input) = typed("gt /");
        input.set_caret(&mut console, 1).unwrap();
        input.insert(&mut console, &['e']).unwrap();

        assert_eq!(input.text(), "get /");
        assert_eq!(input.caret(), 2);
        assert_eq!(console.current_line(), "get /");
        assert_eq!(console.caret(), 2);
    }

    #[test]
    fn test_overwrite_mode_replaces_and_extends() {
        let (mut console, mut input) = typed("abcd");
        input.toggle_overwrite_mode();
        input.set_caret(&mut console, 2).unwrap();
        input.insert(&mut console, &['x', 'y', 'z']).unwrap();

        assert_eq!(input.text(), "abxyz");
        assert_eq!(input.caret(), 5);
        assert_eq!(console.current_line(), "abxyz");
    }

    #[test]
    fn test_set_input_rewrites_only_differing_suffix() {
        let (mut console, mut input) = typed("abcdef");
        input.set_input(&mut console, "abcxyz").unwrap();

        assert_eq!(
            console.ops(),
            vec![
                ConsoleOp::CaretVisible(false),
                ConsoleOp::MoveCaret(-3),
                ConsoleOp::Write("xyz".to_string()),
                ConsoleOp::CaretVisible(true),
            ]
        );
        assert_eq!(input.caret(), 6);
        assert_eq!(console.current_line(), "abcxyz");
    }

    #[test]
    fn test_set_input_shorter_pads_with_blanks() {
        let (mut console, mut input) = typed("abcdef");
        input.set_input(&mut console, "abc").unwrap();

        assert_eq!(
            console.ops(),
            vec![
                ConsoleOp::CaretVisible(false),
                ConsoleOp::MoveCaret(-3),
                ConsoleOp::Write("   ".to_string()),
                ConsoleOp::MoveCaret(-3),
                ConsoleOp::CaretVisible(true),
            ]
        );
        assert_eq!(input.text(), "abc");
        assert_eq!(input.caret(), 3);
        assert_eq!(console.caret(), 3);
    }

    #[test]
    fn test_word_navigation_ascii() {
        let (mut console, mut input) = typed("get api/items");

        input.move_word_back(&mut console).unwrap();
        assert_eq!(input.caret(), 8);
        input.move_word_back(&mut console).unwrap();
        assert_eq!(input.caret(), 7);
        input.move_word_back(&mut console).unwrap();
        assert_eq!(input.caret(), 4);

        input.move_word_forward(&mut console).unwrap();
        assert_eq!(input.caret(), 7);
        assert_eq!(console.caret(), 7);
    }

    #[test]
    fn test_word_boundaries_unicode_toggle() {
        let mut console = MemoryConsole::new();
        let mut ascii = InputManager::new();
        ascii.insert(&mut console, &['a', 'é', 'b']).unwrap();
        ascii.move_word_back(&mut console).unwrap();
        assert_eq!(ascii.caret(), 2);

        let mut console = MemoryConsole::new();
        let mut unicode = InputManager::new().with_unicode_word_boundaries(true);
        unicode.insert(&mut console, &['a', 'é', 'b']).unwrap();
        unicode.move_word_back(&mut console).unwrap();
        assert_eq!(unicode.caret(), 0);
    }

    #[test]
    fn test_reset_input_leaves_console_alone() {
        let (console, mut input) = typed("abc");
        input.reset_input();

        assert!(input.is_empty());
        assert_eq!(input.caret(), 0);
        assert!(console.ops().is_empty());
    }
}
