//! Shell configuration.
//!
//! Every field has a default, so a configuration file only needs the keys it
//! changes.
//!
//! # Example YAML
//!
//! ```yaml
//! prompt: "api> "
//! raw_mode: true
//! unicode_word_boundaries: false
//! history:
//!   max_entries: 500
//!   file: /home/me/.command-shell-history
//! log_file: /tmp/command-shell.log
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default prompt written whenever the shell becomes ready.
pub const DEFAULT_PROMPT: &str = "> ";

/// Default number of history entries kept.
pub const DEFAULT_HISTORY_SIZE: usize = 500;

/// Command history settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept in memory and loaded from disk.
    pub max_entries: usize,
    /// Plain-text file, one command per line. `None` keeps history in memory.
    pub file: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_HISTORY_SIZE,
            file: None,
        }
    }
}

/// Top-level shell configuration.
///
/// # Examples
///
/// ```
/// use command_shell::ShellConfig;
///
/// let config: ShellConfig = serde_yaml::from_str("prompt: \"api> \"").unwrap();
/// assert_eq!(config.prompt, "api> ");
/// assert!(config.raw_mode);
/// assert_eq!(config.history.max_entries, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Prompt written by the default readiness callback.
    pub prompt: String,
    /// Switch the terminal to non-canonical, no-echo mode while reading keys.
    pub raw_mode: bool,
    /// Treat any Unicode alphanumeric as a word character for word-wise
    /// caret movement. ASCII alphanumerics only when `false`.
    pub unicode_word_boundaries: bool,
    /// History settings.
    pub history: HistoryConfig,
    /// Diagnostic log destination. Logging stays on stderr when `None`.
    pub log_file: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            raw_mode: true,
            unicode_word_boundaries: false,
            history: HistoryConfig::default(),
            log_file: None,
        }
    }
}

impl ShellConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ShellError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::ShellError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_document_uses_defaults() {
        let config: ShellConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn test_deserialize_partial_history() {
        let yaml = "history:\n  file: /tmp/history\n";
        let config: ShellConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.history.max_entries, DEFAULT_HISTORY_SIZE);
        assert_eq!(config.history.file, Some(PathBuf::from("/tmp/history")));
        assert_eq!(config.prompt, DEFAULT_PROMPT);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.yml");

        let original = ShellConfig {
            prompt: "api> ".to_string(),
            raw_mode: false,
            unicode_word_boundaries: true,
            history: HistoryConfig {
                max_entries: 20,
                file: Some(dir.path().join("history")),
            },
            log_file: None,
        };
        original.save(&path).unwrap();

        assert_eq!(ShellConfig::load(&path).unwrap(), original);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShellConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, crate::ShellError::Io(_)));
    }
}
