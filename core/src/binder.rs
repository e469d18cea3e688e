//! Binding parsed command lines against command grammars.
//!
//! [`bind`] matches a [`ParseResult`] against a [`CommandInputSpecification`]
//! and classifies every section as a command name token, option name, option
//! value or positional argument. Grammar violations are collected as
//! [`ProcessingIssue`]s; scanning never stops at the first one.
//!
//! A [`ProcessingIssueKind::CommandNameMismatch`] is a routing signal
//! ("this line is not for this command") rather than a syntax error. Every
//! other issue means the command was the intended target and the user made
//! a mistake that should be reported.
//!
//! # Examples
//!
//! ```
//! use command_shell_core::*;
//!
//! let spec = CommandInputSpecification::builder(["set", "header"])
//!     .with_option(OptionSpecification::new("append").with_form("--append"))
//!     .exact_arguments(2)
//!     .finish();
//!
//! let line = "set header --append Accept text/plain";
//! let binding = bind(&spec, &parse(line, line.len()));
//! let input = binding.into_result().unwrap();
//!
//! assert_eq!(input.argument_values(), ["Accept", "text/plain"]);
//! assert_eq!(input.option_count("append"), 1);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parse::{ParseResult, normalize_section};
use crate::types::{CommandInputSpecification, OptionSpecification};

/// Classification of a bound section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputElementKind {
    /// One of the literal name tokens.
    CommandName,
    /// A positional argument.
    Argument,
    /// An option form such as `--header`.
    OptionName,
    /// The value consumed by the preceding option.
    OptionValue,
}

/// A classified section of the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputElement {
    /// What the section was classified as.
    pub kind: InputElementKind,
    /// Raw section text, quotes included.
    pub text: String,
    /// Section value with quotes and escapes resolved.
    pub normalized_text: String,
    /// Id of the owning option, for option names and values. `None` for an
    /// unrecognized option.
    pub option_id: Option<String>,
    /// Index of the originating section in the parse result.
    pub section_index: usize,
}

impl InputElement {
    fn new(kind: InputElementKind, text: &str, section_index: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            normalized_text: normalize_section(text),
            option_id: None,
            section_index,
        }
    }

    fn owned_by(mut self, option: &OptionSpecification) -> Self {
        self.option_id = Some(option.id().to_string());
        self
    }

    /// `true` for the empty element synthesized at a caret that starts a
    /// new section.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Kinds of problems found while binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingIssueKind {
    /// The line does not start with any of the command's names.
    CommandNameMismatch,
    /// Fewer positional arguments than the minimum.
    TooFewArguments,
    /// More positional arguments than the maximum.
    TooManyArguments,
    /// A section starts with the preamble but matches no option form.
    UnrecognizedOption,
    /// An option occurs fewer or more times than allowed.
    OptionOccurrenceOutOfRange,
    /// An option that requires a value is not followed by one.
    OptionMissingRequiredValue,
}

/// A problem found while binding, with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProcessingIssue {
    /// Issue category.
    pub kind: ProcessingIssueKind,
    /// Human-readable description.
    pub message: String,
}

impl ProcessingIssue {
    fn new(kind: ProcessingIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A command line bound to a specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInput {
    elements: Vec<InputElement>,
    name_len: usize,
    selected: Option<InputElement>,
}

impl CommandInput {
    /// All elements in section order.
    pub fn elements(&self) -> &[InputElement] {
        &self.elements
    }

    /// The matched command name tokens.
    pub fn command_name(&self) -> &[InputElement] {
        &self.elements[..self.name_len]
    }

    /// Positional arguments in order.
    pub fn arguments(&self) -> Vec<&InputElement> {
        self.elements_of(InputElementKind::Argument).collect()
    }

    /// Normalized values of the positional arguments.
    pub fn argument_values(&self) -> Vec<&str> {
        self.elements_of(InputElementKind::Argument)
            .map(|element| element.normalized_text.as_str())
            .collect()
    }

    /// Normalized value of the positional argument at `index`.
    pub fn argument(&self, index: usize) -> Option<&str> {
        self.elements_of(InputElementKind::Argument)
            .nth(index)
            .map(|element| element.normalized_text.as_str())
    }

    /// Number of times option `id` occurs.
    pub fn option_count(&self, id: &str) -> usize {
        self.option_elements(InputElementKind::OptionName, id).count()
    }

    /// Whether option `id` occurs at least once.
    pub fn has_option(&self, id: &str) -> bool {
        self.option_count(id) > 0
    }

    /// Normalized values supplied for option `id`, in order.
    pub fn option_values(&self, id: &str) -> Vec<&str> {
        self.option_elements(InputElementKind::OptionValue, id)
            .map(|element| element.normalized_text.as_str())
            .collect()
    }

    /// First value supplied for option `id`.
    pub fn option_value(&self, id: &str) -> Option<&str> {
        self.option_values(id).into_iter().next()
    }

    /// Element under the caret. When the caret starts a new section this is
    /// an empty synthesized element: an option value slot if the preceding
    /// option takes a value, otherwise an argument slot.
    pub fn selected_element(&self) -> Option<&InputElement> {
        self.selected.as_ref()
    }

    fn elements_of(&self, kind: InputElementKind) -> impl Iterator<Item = &InputElement> {
        self.elements.iter().filter(move |element| element.kind == kind)
    }

    fn option_elements<'a, 'b>(
        &'a self,
        kind: InputElementKind,
        id: &'b str,
    ) -> impl Iterator<Item = &'a InputElement> + use<'a, 'b> {
        self.elements_of(kind)
            .filter(move |element| element.option_id.as_deref() == Some(id))
    }
}

/// Outcome of [`bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// The line is not addressed to this command.
    Mismatch(ProcessingIssue),
    /// The line is addressed to this command; `issues` lists syntax problems.
    Bound {
        /// The classified input.
        input: CommandInput,
        /// Grammar violations, empty when the line is valid.
        issues: Vec<ProcessingIssue>,
    },
}

impl Binding {
    /// `true` when the command name did not match.
    pub fn is_name_mismatch(&self) -> bool {
        matches!(self, Binding::Mismatch(_))
    }

    /// The bound input, tolerating syntax issues.
    pub fn input(&self) -> Option<&CommandInput> {
        match self {
            Binding::Mismatch(_) => None,
            Binding::Bound { input, .. } => Some(input),
        }
    }

    /// Every issue found, including a name mismatch.
    pub fn issues(&self) -> &[ProcessingIssue] {
        match self {
            Binding::Mismatch(issue) => std::slice::from_ref(issue),
            Binding::Bound { issues, .. } => issues,
        }
    }

    /// Converts into a strict result: the input only when there are no
    /// issues at all.
    pub fn into_result(self) -> Result<CommandInput, Vec<ProcessingIssue>> {
        match self {
            Binding::Mismatch(issue) => Err(vec![issue]),
            Binding::Bound { input, issues } if issues.is_empty() => Ok(input),
            Binding::Bound { issues, .. } => Err(issues),
        }
    }
}

/// Case-insensitive comparison of a section value against a name token.
pub fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive prefix test.
pub fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    let mut text = text.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| text.next() == Some(p))
}

/// Finds the first name variant whose tokens all match the leading sections.
pub fn matching_name_variant<'a>(
    spec: &'a CommandInputSpecification,
    parse: &ParseResult,
) -> Option<&'a [String]> {
    let sections = parse.sections();
    spec.command_names()
        .iter()
        .filter(|variant| !variant.is_empty() && variant.len() <= sections.len())
        .find(|variant| {
            variant
                .iter()
                .zip(sections)
                .all(|(token, section)| eq_ignore_case(token, &normalize_section(section)))
        })
        .map(Vec::as_slice)
}

/// Binds `parse` against `spec`.
///
/// # Examples
///
/// ```
/// use command_shell_core::*;
///
/// let spec = CommandInputSpecification::builder(["set", "base"])
///     .maximum_arguments(1)
///     .finish();
///
/// assert!(bind(&spec, &parse("SET Base", 0)).issues().is_empty());
/// assert!(bind(&spec, &parse("get", 0)).is_name_mismatch());
///
/// let binding = bind(&spec, &parse("set base a b", 0));
/// assert_eq!(binding.issues()[0].kind, ProcessingIssueKind::TooManyArguments);
/// ```
pub fn bind(spec: &CommandInputSpecification, parse: &ParseResult) -> Binding {
    let Some(variant) = matching_name_variant(spec, parse) else {
        return Binding::Mismatch(ProcessingIssue::new(
            ProcessingIssueKind::CommandNameMismatch,
            format!("Input does not match command '{}'", spec.display_name()),
        ));
    };

    let sections = parse.sections();
    let preamble = spec.option_preamble();
    let name_len = variant.len();

    let mut elements: Vec<InputElement> = sections[..name_len]
        .iter()
        .enumerate()
        .map(|(index, section)| InputElement::new(InputElementKind::CommandName, section, index))
        .collect();
    let mut issues = Vec::new();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();

    let mut index = name_len;
    while index < sections.len() {
        let section = &sections[index];
        if !section.starts_with(preamble) {
            elements.push(InputElement::new(InputElementKind::Argument, section, index));
            index += 1;
            continue;
        }

        let Some(option) = spec.option_for_form(section) else {
            issues.push(ProcessingIssue::new(
                ProcessingIssueKind::UnrecognizedOption,
                format!("Unrecognized option '{section}'"),
            ));
            elements.push(InputElement::new(InputElementKind::OptionName, section, index));
            index += 1;
            continue;
        };

        *occurrences.entry(option.id()).or_default() += 1;
        elements.push(InputElement::new(InputElementKind::OptionName, section, index).owned_by(option));

        if option.accepts_value() {
            match sections.get(index + 1) {
                Some(value) if !value.starts_with(preamble) => {
                    index += 1;
                    elements.push(
                        InputElement::new(InputElementKind::OptionValue, value, index)
                            .owned_by(option),
                    );
                }
                _ if option.requires_value() => issues.push(ProcessingIssue::new(
                    ProcessingIssueKind::OptionMissingRequiredValue,
                    format!("Option '{section}' requires a value"),
                )),
                _ => {}
            }
        }
        index += 1;
    }

    for option in spec.options() {
        let count = occurrences.get(option.id()).copied().unwrap_or(0);
        if count < option.minimum_occurrences() || count > option.maximum_occurrences() {
            issues.push(ProcessingIssue::new(
                ProcessingIssueKind::OptionOccurrenceOutOfRange,
                occurrence_message(option, count),
            ));
        }
    }

    let argument_count = elements
        .iter()
        .filter(|element| element.kind == InputElementKind::Argument)
        .count();
    if argument_count < spec.minimum_arguments() {
        issues.push(ProcessingIssue::new(
            ProcessingIssueKind::TooFewArguments,
            format!(
                "Too few arguments: expected at least {}, found {argument_count}",
                spec.minimum_arguments()
            ),
        ));
    } else if argument_count > spec.maximum_arguments() {
        issues.push(ProcessingIssue::new(
            ProcessingIssueKind::TooManyArguments,
            format!(
                "Too many arguments: expected at most {}, found {argument_count}",
                spec.maximum_arguments()
            ),
        ));
    }

    let selected = selected_element(spec, parse, &elements, name_len);

    Binding::Bound {
        input: CommandInput {
            elements,
            name_len,
            selected,
        },
        issues,
    }
}

fn occurrence_message(option: &OptionSpecification, count: usize) -> String {
    let name = option
        .forms()
        .first()
        .map(String::as_str)
        .unwrap_or(option.id());
    if count < option.minimum_occurrences() {
        format!(
            "Option '{name}' must be specified at least {} time(s), found {count}",
            option.minimum_occurrences()
        )
    } else {
        format!(
            "Option '{name}' may be specified at most {} time(s), found {count}",
            option.maximum_occurrences()
        )
    }
}

fn selected_element(
    spec: &CommandInputSpecification,
    parse: &ParseResult,
    elements: &[InputElement],
    name_len: usize,
) -> Option<InputElement> {
    let selected = parse.selected_section();
    if !parse.starts_new_section() {
        return elements
            .iter()
            .find(|element| element.section_index == selected)
            .cloned();
    }
    if selected < name_len {
        return None;
    }

    let previous = selected
        .checked_sub(1)
        .and_then(|index| elements.iter().find(|element| element.section_index == index));
    // An option whose value already follows the caret takes no second one.
    let value_taken = parse.is_caret_between_sections()
        && elements
            .iter()
            .find(|element| element.section_index == selected)
            .is_some_and(|element| element.kind == InputElementKind::OptionValue);
    let value_owner = previous
        .filter(|element| element.kind == InputElementKind::OptionName && !value_taken)
        .and_then(|element| element.option_id.as_deref())
        .and_then(|id| spec.option(id))
        .filter(|option| option.accepts_value());

    Some(match value_owner {
        Some(option) => InputElement::new(InputElementKind::OptionValue, "", selected).owned_by(option),
        None => InputElement::new(InputElementKind::Argument, "", selected),
    })
}
