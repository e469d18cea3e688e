//! One-line usage rendering for command specifications.

use crate::types::{CommandInputSpecification, OptionSpecification};

/// Argument bounds at or above this many optional slots render as `[arg...]`.
const MAX_LISTED_OPTIONAL_ARGUMENTS: usize = 3;

/// Renders a usage line such as `set header [--append] <arg> [arg]`.
///
/// # Examples
///
/// ```
/// use command_shell_core::*;
///
/// let spec = CommandInputSpecification::builder(["get"])
///     .with_option(
///         OptionSpecification::new("header")
///             .with_forms(["-h", "--header"])
///             .requiring_value()
///             .occurrences(0, usize::MAX),
///     )
///     .maximum_arguments(1)
///     .finish();
///
/// assert_eq!(render_usage(&spec), "get [-h|--header <value>]... [arg]");
/// ```
pub fn render_usage(spec: &CommandInputSpecification) -> String {
    let mut parts = vec![spec.display_name()];

    for option in spec.options() {
        parts.push(render_option(option));
    }

    for _ in 0..spec.minimum_arguments() {
        parts.push("<arg>".to_string());
    }
    let optional = spec.maximum_arguments() - spec.minimum_arguments();
    if optional > MAX_LISTED_OPTIONAL_ARGUMENTS {
        parts.push("[arg...]".to_string());
    } else {
        for _ in 0..optional {
            parts.push("[arg]".to_string());
        }
    }

    parts.join(" ")
}

/// Lists the synonym name variants, if any.
pub fn render_aliases(spec: &CommandInputSpecification) -> Option<String> {
    let aliases: Vec<String> = spec
        .command_names()
        .iter()
        .skip(1)
        .map(|tokens| tokens.join(" "))
        .collect();
    (!aliases.is_empty()).then(|| aliases.join(", "))
}

fn render_option(option: &OptionSpecification) -> String {
    let mut body = option.forms().join("|");
    if option.requires_value() {
        body.push_str(" <value>");
    } else if option.accepts_value() {
        body.push_str(" [value]");
    }

    let mut rendered = if option.minimum_occurrences() > 0 {
        body
    } else {
        format!("[{body}]")
    };
    if option.maximum_occurrences() > 1 {
        rendered.push_str("...");
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_arguments_and_options() {
        let spec = CommandInputSpecification::builder(["connect"])
            .with_option(
                OptionSpecification::new("host")
                    .with_form("--host")
                    .requiring_value()
                    .occurrences(1, 1),
            )
            .with_option(OptionSpecification::new("level").with_form("--level").accepting_value())
            .exact_arguments(2)
            .finish();

        assert_eq!(
            render_usage(&spec),
            "connect --host <value> [--level [value]] <arg> <arg>"
        );
    }

    #[test]
    fn test_unbounded_arguments_collapse() {
        let spec = CommandInputSpecification::builder(["echo"]).unbounded_arguments().finish();
        assert_eq!(render_usage(&spec), "echo [arg...]");
    }

    #[test]
    fn test_aliases() {
        let spec = CommandInputSpecification::builder(["clear"])
            .alternate_name(["cls"])
            .finish();
        assert_eq!(render_aliases(&spec).as_deref(), Some("cls"));

        let plain = CommandInputSpecification::builder(["exit"]).finish();
        assert_eq!(render_aliases(&plain), None);
    }
}
