//! Grammar validation and ambiguity detection.
//!
//! Validates structural invariants of command specifications before they
//! are registered: empty names, malformed option forms and duplicates. Also
//! detects name overlaps between specifications, where the first registered
//! command would shadow the other for some inputs.
//!
//! # Examples
//!
//! ```
//! use command_shell_core::*;
//!
//! let spec = CommandInputSpecification::builder(["clear"])
//!     .alternate_name(["cls"])
//!     .finish();
//! assert!(validate_specification(&spec).is_empty());
//!
//! // Invalid: option form without the preamble
//! let bad = CommandInputSpecification::builder(["get"])
//!     .with_option(OptionSpecification::new("verbose").with_form("v"))
//!     .finish();
//! assert!(!validate_specification(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::binder::eq_ignore_case;
use crate::types::CommandInputSpecification;

/// Specification validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A name variant has no tokens.
    #[error("command name variant cannot be empty")]
    EmptyNameVariant,
    /// A name token is empty or contains whitespace.
    #[error("invalid command name token: {0:?}")]
    InvalidNameToken(String),
    /// An option declares no forms.
    #[error("option must define at least one form: {0}")]
    MissingOptionForm(String),
    /// An option form does not start with the preamble or is just the
    /// preamble.
    #[error("option form must start with '{preamble}': {form}")]
    InvalidOptionForm {
        /// The offending form.
        form: String,
        /// Preamble of the specification.
        preamble: char,
    },
    /// Two options share an id.
    #[error("duplicate option id: {0}")]
    DuplicateOptionId(String),
    /// Two options share a form.
    #[error("duplicate option form: {0}")]
    DuplicateOptionForm(String),
    /// Two commands have overlapping names; dispatch order decides.
    #[error("command name '{name}' overlaps with registered command '{existing}'")]
    AmbiguousCommandName {
        /// Name variant of the new specification.
        name: String,
        /// Overlapping name variant of the registered specification.
        existing: String,
    },
}

/// Validates a single specification, collecting every problem.
///
/// # Examples
///
/// ```
/// use command_shell_core::*;
///
/// let spec = CommandInputSpecification::builder(["post"])
///     .with_option(OptionSpecification::new("h").with_form("-h"))
///     .with_option(OptionSpecification::new("h").with_form("-h"))
///     .finish();
///
/// let errors = validate_specification(&spec);
/// assert!(errors.contains(&ValidationError::DuplicateOptionId("h".into())));
/// assert!(errors.contains(&ValidationError::DuplicateOptionForm("-h".into())));
/// ```
pub fn validate_specification(spec: &CommandInputSpecification) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if spec.command_names().is_empty() {
        errors.push(ValidationError::EmptyNameVariant);
    }
    for variant in spec.command_names() {
        if variant.is_empty() {
            errors.push(ValidationError::EmptyNameVariant);
        }
        for token in variant {
            if token.is_empty() || token.chars().any(char::is_whitespace) {
                errors.push(ValidationError::InvalidNameToken(token.clone()));
            }
        }
    }

    let preamble = spec.option_preamble();
    let mut ids = HashSet::new();
    let mut forms = HashSet::new();
    for option in spec.options() {
        if !ids.insert(option.id()) {
            errors.push(ValidationError::DuplicateOptionId(option.id().to_string()));
        }
        if option.forms().is_empty() {
            errors.push(ValidationError::MissingOptionForm(option.id().to_string()));
        }
        for form in option.forms() {
            if !form.starts_with(preamble) || form.chars().count() < 2 {
                errors.push(ValidationError::InvalidOptionForm {
                    form: form.clone(),
                    preamble,
                });
            }
            if !forms.insert(form.as_str()) {
                errors.push(ValidationError::DuplicateOptionForm(form.clone()));
            }
        }
    }

    errors
}

/// Reports name overlaps between `candidate` and already registered
/// specifications.
///
/// Two name variants overlap when one is a token-wise prefix of the other
/// (case-insensitive), equal variants included.
///
/// # Examples
///
/// ```
/// use command_shell_core::*;
///
/// let set = CommandInputSpecification::builder(["set"]).maximum_arguments(2).finish();
/// let set_base = CommandInputSpecification::builder(["set", "base"]).finish();
/// let clear = CommandInputSpecification::builder(["clear"]).finish();
///
/// assert_eq!(find_ambiguities([&set], &set_base).len(), 1);
/// assert!(find_ambiguities([&set, &set_base], &clear).is_empty());
/// ```
pub fn find_ambiguities<'a, I>(registered: I, candidate: &CommandInputSpecification) -> Vec<ValidationError>
where
    I: IntoIterator<Item = &'a CommandInputSpecification>,
{
    let mut errors = Vec::new();

    for existing in registered {
        for existing_name in existing.command_names() {
            for name in candidate.command_names() {
                if is_token_prefix(name, existing_name) || is_token_prefix(existing_name, name) {
                    errors.push(ValidationError::AmbiguousCommandName {
                        name: name.join(" "),
                        existing: existing_name.join(" "),
                    });
                }
            }
        }
    }

    errors
}

fn is_token_prefix(prefix: &[String], name: &[String]) -> bool {
    !prefix.is_empty()
        && prefix.len() <= name.len()
        && prefix
            .iter()
            .zip(name)
            .all(|(left, right)| eq_ignore_case(left, right))
}
