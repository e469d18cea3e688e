//! Command history with a navigation cursor and optional file persistence.
//!
//! Entries are kept oldest first. Blank lines are never recorded and a line
//! equal to the newest entry is collapsed into it. The navigation cursor
//! resets past the newest entry whenever a command is added.
//!
//! A history file never keeps more than `max_entries` lines: new commands are
//! appended, and the file is rewritten from memory once it grows past the
//! bound.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::DEFAULT_HISTORY_SIZE;
use crate::error::Result;

/// Bounded command history.
///
/// # Examples
///
/// ```
/// use command_shell::History;
///
/// let mut history = History::new(10);
/// history.add("get /items");
/// history.add("get /items");
/// history.add("post /items");
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.previous(), Some("post /items"));
/// assert_eq!(history.previous(), Some("get /items"));
/// assert_eq!(history.next(), Some("post /items"));
/// assert_eq!(history.next(), None);
/// ```
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    position: usize,
    max_entries: usize,
    file: Option<PathBuf>,
    file_lines: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    /// Creates an in-memory history holding at most `max_entries` commands.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            position: 0,
            max_entries: max_entries.max(1),
            file: None,
            file_lines: 0,
        }
    }

    /// Creates a history persisted to `path`, loading the newest
    /// `max_entries` lines already in it. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ShellError::Io) if an existing file cannot be
    /// read.
    pub fn with_file(path: impl AsRef<Path>, max_entries: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut history = Self::new(max_entries);

        match fs::File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    history.push(line?);
                    history.file_lines += 1;
                }
                debug!(path = %path.display(), entries = history.entries.len(), "Loaded history");
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        history.position = history.entries.len();
        history.file = Some(path);
        if history.file_lines > history.max_entries {
            history.sync_file();
        }
        Ok(history)
    }

    /// Records a command and resets the navigation cursor.
    pub fn add(&mut self, command: &str) {
        let recorded = self.push(command.to_string());
        self.position = self.entries.len();

        if !recorded {
            return;
        }
        if let Some(path) = &self.file {
            match append_line(path, command) {
                Ok(()) => self.file_lines += 1,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to append to history file");
                }
            }
        }
        if self.file_lines > self.max_entries {
            self.sync_file();
        }
    }

    /// Steps back to the previous (older) command. Stays on the oldest one.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        self.position = self.position.saturating_sub(1);
        self.entries.get(self.position).map(String::as_str)
    }

    /// Steps forward to the next (newer) command. Returns `None` once the
    /// cursor moves past the newest entry.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&str> {
        if self.position + 1 < self.entries.len() {
            self.position += 1;
            self.entries.get(self.position).map(String::as_str)
        } else {
            self.position = self.entries.len();
            None
        }
    }

    /// Recorded commands, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets all entries and empties the history file, if any.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
        self.sync_file();
    }

    /// Rewrites the history file from the in-memory entries.
    fn sync_file(&mut self) {
        let Some(path) = &self.file else {
            return;
        };
        match write_lines(path, &self.entries) {
            Ok(()) => {
                debug!(path = %path.display(), entries = self.entries.len(), "Rewrote history file");
                self.file_lines = self.entries.len();
            }
            Err(err) => warn!(path = %path.display(), error = %err, "Failed to rewrite history file"),
        }
    }

    fn push(&mut self, command: String) -> bool {
        if command.trim().is_empty() || self.entries.last() == Some(&command) {
            return false;
        }
        self.entries.push(command);
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        true
    }
}

fn write_lines(path: &Path, entries: &[String]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for entry in entries {
        writeln!(writer, "{entry}")?;
    }
    writer.flush()
}

fn append_line(path: &Path, command: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{command}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_are_not_recorded() {
        let mut history = History::new(5);
        history.add("");
        history.add("   ");
        assert!(history.is_empty());
        assert_eq!(history.previous(), None);
    }

    #[test]
    fn test_oldest_entries_are_dropped() {
        let mut history = History::new(2);
        history.add("one");
        history.add("two");
        history.add("three");
        assert_eq!(history.entries(), ["two", "three"]);
    }

    #[test]
    fn test_previous_stops_at_oldest() {
        let mut history = History::new(5);
        history.add("one");
        history.add("two");

        assert_eq!(history.previous(), Some("two"));
        assert_eq!(history.previous(), Some("one"));
        assert_eq!(history.previous(), Some("one"));
    }

    #[test]
    fn test_add_resets_cursor() {
        let mut history = History::new(5);
        history.add("one");
        history.add("two");
        history.previous();
        history.previous();

        history.add("three");
        assert_eq!(history.previous(), Some("three"));
    }

    #[test]
    fn test_file_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");

        let mut history = History::with_file(&path, 3).unwrap();
        history.add("get /a");
        history.add("get /a");
        history.add("get /b");
        history.add("get /c");
        history.add("get /d");

        let reloaded = History::with_file(&path, 3).unwrap();
        assert_eq!(reloaded.entries(), ["get /b", "get /c", "get /d"]);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_oversized_file_is_trimmed_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, "one\ntwo\nthree\nfour\n").unwrap();

        let history = History::with_file(&path, 2).unwrap();

        assert_eq!(history.entries(), ["three", "four"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "three\nfour\n");
    }

    #[test]
    fn test_clear_empties_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");

        let mut history = History::with_file(&path, 5).unwrap();
        history.add("get /a");
        history.add("get /b");
        history.clear();
        history.add("get /c");

        assert_eq!(fs::read_to_string(&path).unwrap(), "get /c\n");
        let reloaded = History::with_file(&path, 5).unwrap();
        assert_eq!(reloaded.entries(), ["get /c"]);
    }
}
