//! Declarative command grammar definitions.
//!
//! A [`CommandInputSpecification`] describes how a command is invoked: the
//! literal name tokens (with synonyms), the options it accepts and how many
//! positional arguments it takes. Specifications are built once through
//! [`CommandInputSpecificationBuilder`] when a command is registered and are
//! immutable afterwards.
//!
//! Bounds are normalized on read: a maximum smaller than its minimum is
//! raised to the minimum, so `max >= min >= 0` always holds for callers.

use serde::{Deserialize, Serialize};

/// Option preamble used when a specification does not choose another one.
pub const DEFAULT_OPTION_PREAMBLE: char = '-';

/// Grammar of a single command option.
///
/// An option is identified by an `id` and recognized by any of its literal
/// `forms` (e.g. `-h` and `--header`). It may accept, or require, a value in
/// the section that follows it, and may occur a bounded number of times.
///
/// # Examples
///
/// ```
/// use command_shell_core::OptionSpecification;
///
/// let header = OptionSpecification::new("header")
///     .with_form("-h")
///     .with_form("--header")
///     .requiring_value()
///     .occurrences(0, usize::MAX);
///
/// assert!(header.matches("--header"));
/// assert!(header.accepts_value());
/// assert_eq!(header.maximum_occurrences(), usize::MAX);
///
/// // A maximum below the minimum is raised to the minimum.
/// let odd = OptionSpecification::new("odd").with_form("--odd").occurrences(2, 1);
/// assert_eq!(odd.maximum_occurrences(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpecification {
    id: String,
    forms: Vec<String>,
    accepts_value: bool,
    requires_value: bool,
    minimum_occurrences: usize,
    maximum_occurrences: usize,
}

impl OptionSpecification {
    /// Creates an option with no forms that may occur at most once and takes
    /// no value.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            forms: Vec::new(),
            accepts_value: false,
            requires_value: false,
            minimum_occurrences: 0,
            maximum_occurrences: 1,
        }
    }

    /// Adds a literal form (e.g. `"--verbose"`).
    pub fn with_form(mut self, form: &str) -> Self {
        self.forms.push(form.to_string());
        self
    }

    /// Adds several literal forms.
    pub fn with_forms<I, T>(mut self, forms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.forms.extend(forms.into_iter().map(Into::into));
        self
    }

    /// Lets the option consume the following section as its value.
    pub fn accepting_value(mut self) -> Self {
        self.accepts_value = true;
        self
    }

    /// Requires a value after every occurrence. Implies
    /// [`accepting_value`](Self::accepting_value).
    pub fn requiring_value(mut self) -> Self {
        self.accepts_value = true;
        self.requires_value = true;
        self
    }

    /// Sets the occurrence bounds.
    pub fn occurrences(mut self, minimum: usize, maximum: usize) -> Self {
        self.minimum_occurrences = minimum;
        self.maximum_occurrences = maximum;
        self
    }

    /// Identifier used to look up occurrences in a bound input.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Accepted literal forms.
    pub fn forms(&self) -> &[String] {
        &self.forms
    }

    /// Whether the option may take a value.
    pub fn accepts_value(&self) -> bool {
        self.accepts_value || self.requires_value
    }

    /// Whether every occurrence must be followed by a value.
    pub fn requires_value(&self) -> bool {
        self.requires_value
    }

    /// Minimum number of occurrences.
    pub fn minimum_occurrences(&self) -> usize {
        self.minimum_occurrences
    }

    /// Maximum number of occurrences, never below the minimum.
    pub fn maximum_occurrences(&self) -> usize {
        self.maximum_occurrences.max(self.minimum_occurrences)
    }

    /// Checks whether `section` is exactly one of this option's forms.
    pub fn matches(&self, section: &str) -> bool {
        self.forms.iter().any(|form| form == section)
    }
}

/// Complete grammar of a command.
///
/// # Examples
///
/// ```
/// use command_shell_core::{CommandInputSpecification, OptionSpecification};
///
/// let spec = CommandInputSpecification::builder(["set", "header"])
///     .alternate_name(["set", "h"])
///     .with_option(OptionSpecification::new("append").with_form("--append"))
///     .minimum_arguments(1)
///     .maximum_arguments(2)
///     .finish();
///
/// assert_eq!(spec.command_names().len(), 2);
/// assert_eq!(spec.option_preamble(), '-');
/// assert!(spec.option("append").is_some());
/// assert_eq!(spec.maximum_arguments(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInputSpecification {
    command_names: Vec<Vec<String>>,
    option_preamble: char,
    options: Vec<OptionSpecification>,
    minimum_arguments: usize,
    maximum_arguments: usize,
}

impl CommandInputSpecification {
    /// Starts a specification whose primary name is the given token sequence.
    pub fn builder<I, T>(name: I) -> CommandInputSpecificationBuilder
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        CommandInputSpecificationBuilder {
            spec: CommandInputSpecification {
                command_names: vec![name.into_iter().map(Into::into).collect()],
                option_preamble: DEFAULT_OPTION_PREAMBLE,
                options: Vec::new(),
                minimum_arguments: 0,
                maximum_arguments: 0,
            },
        }
    }

    /// Name variants; each variant is a sequence of literal tokens. The first
    /// variant is the primary name, the others are synonyms.
    pub fn command_names(&self) -> &[Vec<String>] {
        &self.command_names
    }

    /// Primary name joined with spaces.
    pub fn display_name(&self) -> String {
        self.command_names
            .first()
            .map(|tokens| tokens.join(" "))
            .unwrap_or_default()
    }

    /// Character that marks a section as an option.
    pub fn option_preamble(&self) -> char {
        self.option_preamble
    }

    /// Declared options in declaration order.
    pub fn options(&self) -> &[OptionSpecification] {
        &self.options
    }

    /// Finds an option by id.
    pub fn option(&self, id: &str) -> Option<&OptionSpecification> {
        self.options.iter().find(|option| option.id == id)
    }

    /// Finds the option that has `form` among its literal forms.
    pub fn option_for_form(&self, form: &str) -> Option<&OptionSpecification> {
        self.options.iter().find(|option| option.matches(form))
    }

    /// Minimum number of positional arguments.
    pub fn minimum_arguments(&self) -> usize {
        self.minimum_arguments
    }

    /// Maximum number of positional arguments, never below the minimum.
    pub fn maximum_arguments(&self) -> usize {
        self.maximum_arguments.max(self.minimum_arguments)
    }
}

/// Builder for [`CommandInputSpecification`].
#[derive(Debug, Clone)]
pub struct CommandInputSpecificationBuilder {
    spec: CommandInputSpecification,
}

impl CommandInputSpecificationBuilder {
    /// Adds a synonym name variant.
    pub fn alternate_name<I, T>(mut self, name: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.spec
            .command_names
            .push(name.into_iter().map(Into::into).collect());
        self
    }

    /// Changes the option preamble character.
    pub fn option_preamble(mut self, preamble: char) -> Self {
        self.spec.option_preamble = preamble;
        self
    }

    /// Declares an option.
    pub fn with_option(mut self, option: OptionSpecification) -> Self {
        self.spec.options.push(option);
        self
    }

    /// Sets the minimum number of positional arguments.
    pub fn minimum_arguments(mut self, minimum: usize) -> Self {
        self.spec.minimum_arguments = minimum;
        self
    }

    /// Sets the maximum number of positional arguments.
    pub fn maximum_arguments(mut self, maximum: usize) -> Self {
        self.spec.maximum_arguments = maximum;
        self
    }

    /// Requires exactly `count` positional arguments.
    pub fn exact_arguments(self, count: usize) -> Self {
        self.minimum_arguments(count).maximum_arguments(count)
    }

    /// Removes the upper bound on positional arguments.
    pub fn unbounded_arguments(self) -> Self {
        self.maximum_arguments(usize::MAX)
    }

    /// Finishes the specification, normalizing all bounds.
    pub fn finish(mut self) -> CommandInputSpecification {
        self.spec.maximum_arguments = self.spec.maximum_arguments();
        for option in &mut self.spec.options {
            option.maximum_occurrences = option.maximum_occurrences();
            option.accepts_value = option.accepts_value();
        }
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_normalizes_argument_bounds() {
        let spec = CommandInputSpecification::builder(["get"])
            .minimum_arguments(3)
            .maximum_arguments(1)
            .finish();

        assert_eq!(spec.minimum_arguments(), 3);
        assert_eq!(spec.maximum_arguments(), 3);
    }

    #[test]
    fn test_defaults_take_no_arguments() {
        let spec = CommandInputSpecification::builder(["clear"]).finish();

        assert_eq!(spec.minimum_arguments(), 0);
        assert_eq!(spec.maximum_arguments(), 0);
        assert_eq!(spec.option_preamble(), DEFAULT_OPTION_PREAMBLE);
        assert_eq!(spec.display_name(), "clear");
    }

    #[test]
    fn test_requiring_value_implies_accepting() {
        let option = OptionSpecification::new("body").with_form("--body").requiring_value();

        assert!(option.accepts_value());
        assert!(option.requires_value());
    }

    #[test]
    fn test_option_lookup_by_form() {
        let spec = CommandInputSpecification::builder(["post"])
            .with_option(OptionSpecification::new("header").with_forms(["-h", "--header"]))
            .finish();

        assert_eq!(spec.option_for_form("-h").map(|o| o.id()), Some("header"));
        assert!(spec.option_for_form("-x").is_none());
    }

    #[test]
    fn test_specification_round_trips_through_yaml() {
        let spec = CommandInputSpecification::builder(["set", "base"])
            .alternate_name(["base"])
            .maximum_arguments(1)
            .finish();

        let yaml = serde_yaml::to_string(&spec).expect("serialize");
        let back: CommandInputSpecification = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, spec);
    }
}
