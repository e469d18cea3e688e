//! Command line tokenization with exact caret mapping.
//!
//! [`parse`] splits a raw line into whitespace-separated sections. A double
//! quote opens a span in which whitespace does not split; the span ends at
//! the matching quote or at the end of input. Inside a quoted span a
//! backslash escapes a following `"` or `\`. Outside quotes a backslash is an
//! ordinary character.
//!
//! Sections keep their raw text, quotes included, so the sections together
//! with the separators between them reconstruct the input exactly. Use
//! [`normalize_section`] to obtain the unquoted value of a section.
//!
//! # Examples
//!
//! ```
//! use command_shell_core::parse;
//!
//! let result = parse(r#"echo "hello world" x"#, 7);
//! assert_eq!(result.sections(), ["echo", "\"hello world\"", "x"]);
//! assert_eq!(result.selected_section(), 1);
//! assert_eq!(result.caret_position_within_selected_section(), 2);
//! assert_eq!(result.selected_fragment(), "\"h");
//! ```

use serde::{Deserialize, Serialize};

/// Character that opens and closes a quoted span.
pub const QUOTE: char = '"';

/// Escape character recognized inside quoted spans.
pub const ESCAPE: char = '\\';

/// A tokenized command line together with the caret location.
///
/// All offsets are character offsets (not byte offsets), matching the
/// character buffer of the line editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    command_text: String,
    sections: Vec<String>,
    section_starts: Vec<usize>,
    selected_section: usize,
    caret_in_section: usize,
    caret_position: usize,
    starts_new_section: bool,
}

impl ParseResult {
    /// The full text that was parsed.
    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    /// Raw section texts in order of appearance.
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Number of sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Start offsets of each section within [`command_text`](Self::command_text).
    pub fn section_starts(&self) -> &[usize] {
        &self.section_starts
    }

    /// Start offset of section `index`, or the text length past the last
    /// section.
    pub fn section_start(&self, index: usize) -> usize {
        self.section_starts
            .get(index)
            .copied()
            .unwrap_or_else(|| self.command_text.chars().count())
    }

    /// Length in characters of section `index` (zero past the last section).
    pub fn section_len(&self, index: usize) -> usize {
        self.sections
            .get(index)
            .map(|section| section.chars().count())
            .unwrap_or(0)
    }

    /// Index of the section holding the caret.
    ///
    /// Equals [`section_count`](Self::section_count) when the caret sits after
    /// the last section, i.e. the user is about to start a new one.
    pub fn selected_section(&self) -> usize {
        self.selected_section
    }

    /// Caret offset relative to the start of the selected section.
    pub fn caret_position_within_selected_section(&self) -> usize {
        self.caret_in_section
    }

    /// Absolute caret offset within the command text.
    pub fn caret_position(&self) -> usize {
        self.caret_position
    }

    /// `true` when the caret is not inside any section: in leading,
    /// trailing or interior whitespace. The selected index is then the index
    /// a newly typed section would take.
    pub fn starts_new_section(&self) -> bool {
        self.starts_new_section
    }

    /// `true` when the caret sits in whitespace between two existing sections.
    pub fn is_caret_between_sections(&self) -> bool {
        self.starts_new_section && self.selected_section < self.sections.len()
    }

    /// Raw text of the selected section, if the caret is inside one.
    pub fn selected_section_text(&self) -> Option<&str> {
        if self.starts_new_section {
            return None;
        }
        self.sections.get(self.selected_section).map(String::as_str)
    }

    /// Raw text of the selected section up to the caret. Empty when the
    /// caret starts a new section.
    pub fn selected_fragment(&self) -> String {
        self.selected_section_text()
            .map(|text| text.chars().take(self.caret_in_section).collect())
            .unwrap_or_default()
    }
}

/// Tokenizes `command_text` and maps `caret` (a character offset) onto it.
///
/// A caret past the end of the text is clamped to the text length. A caret
/// at the end of a section belongs to that section; a caret at the start of
/// a section belongs to that section as well.
///
/// # Examples
///
/// ```
/// use command_shell_core::parse;
///
/// let result = parse("set base ", 9);
/// assert_eq!(result.section_count(), 2);
/// assert_eq!(result.selected_section(), 2);
/// assert!(result.starts_new_section());
/// ```
pub fn parse(command_text: &str, caret: usize) -> ParseResult {
    let chars: Vec<char> = command_text.chars().collect();
    let caret = caret.min(chars.len());

    let mut sections: Vec<String> = Vec::new();
    let mut section_starts: Vec<usize> = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;
    let mut escaped = false;

    for (index, &ch) in chars.iter().enumerate() {
        match start {
            None if ch.is_whitespace() => continue,
            None => start = Some(index),
            Some(_) => {}
        }

        if in_quotes {
            if escaped {
                escaped = false;
            } else if ch == ESCAPE {
                escaped = true;
            } else if ch == QUOTE {
                in_quotes = false;
            }
            continue;
        }

        if ch == QUOTE {
            in_quotes = true;
        } else if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                sections.push(chars[begin..index].iter().collect());
                section_starts.push(begin);
            }
        }
    }

    if let Some(begin) = start {
        sections.push(chars[begin..].iter().collect());
        section_starts.push(begin);
    }

    let mut selected_section = sections.len();
    let mut caret_in_section = 0;
    let mut starts_new_section = true;
    for (index, (&begin, section)) in section_starts.iter().zip(&sections).enumerate() {
        if caret < begin {
            selected_section = index;
            break;
        }
        let len = section.chars().count();
        if caret <= begin + len {
            selected_section = index;
            caret_in_section = caret - begin;
            starts_new_section = false;
            break;
        }
    }

    ParseResult {
        command_text: command_text.to_string(),
        sections,
        section_starts,
        selected_section,
        caret_in_section,
        caret_position: caret,
        starts_new_section,
    }
}

/// Returns the value of a raw section: unescaped quotes removed and the
/// `\"` / `\\` escapes inside quoted spans resolved.
///
/// # Examples
///
/// ```
/// use command_shell_core::normalize_section;
///
/// assert_eq!(normalize_section(r#""a b""#), "a b");
/// assert_eq!(normalize_section(r#"x"y z"w"#), "xy zw");
/// assert_eq!(normalize_section(r#""say \"hi\"""#), r#"say "hi""#);
/// assert_eq!(normalize_section(r"C:\temp"), r"C:\temp");
/// ```
pub fn normalize_section(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == QUOTE {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes && ch == ESCAPE {
            if let Some(&next) = chars.peek() {
                if next == QUOTE || next == ESCAPE {
                    value.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        value.push(ch);
    }

    value
}

/// Quotes `text` when it would not survive tokenization as a single section.
///
/// Text without whitespace or quotes is returned unchanged.
///
/// # Examples
///
/// ```
/// use command_shell_core::{normalize_section, quote_if_needed};
///
/// assert_eq!(quote_if_needed("plain"), "plain");
/// assert_eq!(quote_if_needed("two words"), "\"two words\"");
/// let quoted = quote_if_needed(r#"say "hi""#);
/// assert_eq!(normalize_section(&quoted), r#"say "hi""#);
/// ```
pub fn quote_if_needed(text: &str) -> String {
    if !text.is_empty() && !text.chars().any(|c| c.is_whitespace() || c == QUOTE) {
        return text.to_string();
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(QUOTE);
    for ch in text.chars() {
        if ch == QUOTE || ch == ESCAPE {
            quoted.push(ESCAPE);
        }
        quoted.push(ch);
    }
    quoted.push(QUOTE);
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_reconstructs(text: &str) {
        let chars: Vec<char> = text.chars().collect();
        for caret in 0..=chars.len() {
            let result = parse(text, caret);

            let mut cursor = 0;
            for (section, &start) in result.sections().iter().zip(result.section_starts()) {
                assert!(
                    chars[cursor..start].iter().all(|c| c.is_whitespace()),
                    "non-separator text skipped in {text:?}"
                );
                let len = section.chars().count();
                let slice: String = chars[start..start + len].iter().collect();
                assert_eq!(&slice, section);
                cursor = start + len;
            }
            assert!(chars[cursor..].iter().all(|c| c.is_whitespace()));

            if result.starts_new_section() {
                assert_eq!(result.caret_position_within_selected_section(), 0);
                assert!(result.selected_section() <= result.section_count());
            } else {
                assert_eq!(
                    result.section_start(result.selected_section())
                        + result.caret_position_within_selected_section(),
                    caret
                );
            }
        }
    }

    #[test]
    fn test_sections_and_separators_reconstruct_input() {
        for text in [
            "",
            "   ",
            "get",
            "set base http://localhost:5000",
            "  leading and  double  spaces ",
            r#"echo "quoted span" tail"#,
            r#"echo "unterminated span"#,
            r#"say "esc \" quote" done"#,
            "tab\tseparated\u{a0}nbsp",
            "ünïcödé wörds",
        ] {
            assert_reconstructs(text);
        }
    }

    #[test]
    fn test_quoted_span_is_single_section() {
        let result = parse(r#"post "a b c" --header x"#, 0);
        assert_eq!(result.sections(), ["post", "\"a b c\"", "--header", "x"]);
        assert_eq!(result.section_starts(), [0, 5, 13, 22]);
    }

    #[test]
    fn test_escaped_quote_does_not_close_span() {
        let result = parse(r#"echo "a \" b" c"#, 0);
        assert_eq!(result.sections(), ["echo", r#""a \" b""#, "c"]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let result = parse(r#"echo "a b"#, 0);
        assert_eq!(result.sections(), ["echo", "\"a b"]);
        assert_eq!(normalize_section(&result.sections()[1]), "a b");
    }

    #[test]
    fn test_caret_in_trailing_whitespace_starts_new_section() {
        let result = parse("set ", 4);
        assert_eq!(result.section_count(), 1);
        assert_eq!(result.selected_section(), 1);
        assert!(result.starts_new_section());
        assert!(!result.is_caret_between_sections());
        assert_eq!(result.selected_fragment(), "");
    }

    #[test]
    fn test_caret_at_section_end_belongs_to_section() {
        let result = parse("set base", 3);
        assert_eq!(result.selected_section(), 0);
        assert_eq!(result.caret_position_within_selected_section(), 3);
        assert_eq!(result.selected_fragment(), "set");
    }

    #[test]
    fn test_caret_between_sections() {
        let result = parse("a   b", 2);
        assert_eq!(result.selected_section(), 1);
        assert!(result.is_caret_between_sections());
        assert_eq!(result.selected_section_text(), None);
    }

    #[test]
    fn test_caret_is_clamped() {
        let result = parse("ls", 40);
        assert_eq!(result.caret_position(), 2);
        assert_eq!(result.selected_section(), 0);
        assert_eq!(result.caret_position_within_selected_section(), 2);
    }

    #[test]
    fn test_empty_input_selects_first_new_section() {
        let result = parse("", 0);
        assert_eq!(result.section_count(), 0);
        assert_eq!(result.selected_section(), 0);
        assert!(result.starts_new_section());
    }

    #[test]
    fn test_offsets_are_characters_not_bytes() {
        let result = parse("héllo wörld", 8);
        assert_eq!(result.section_starts(), [0, 6]);
        assert_eq!(result.selected_section(), 1);
        assert_eq!(result.caret_position_within_selected_section(), 2);
        assert_eq!(result.selected_fragment(), "wö");
    }
}
