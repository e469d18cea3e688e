//! Command line parsing and declarative command grammars.
//!
//! This crate is the synchronous, I/O-free half of the shell engine:
//!
//! - [`parse`]: tokenizes a raw line and maps a caret offset onto the
//!   resulting sections ([`ParseResult`]).
//! - [`CommandInputSpecification`]: declarative grammar of a command: name
//!   variants, options ([`OptionSpecification`]) and argument bounds.
//! - [`bind`]: matches a parse result against a grammar, classifying every
//!   section into an [`InputElement`] and collecting [`ProcessingIssue`]s.
//!
//! Validation ([`validate_specification`], [`find_ambiguities`]) catches
//! malformed grammars and overlapping command names before registration.
//! [`render_usage`] produces the one-line help shown for syntax errors.
//!
//! # Example
//!
//! ```
//! use command_shell_core::*;
//!
//! let spec = CommandInputSpecification::builder(["set", "base"])
//!     .maximum_arguments(1)
//!     .finish();
//! assert!(validate_specification(&spec).is_empty());
//!
//! let line = "set base http://localhost:5000";
//! let parsed = parse(line, line.len());
//! let input = bind(&spec, &parsed).into_result().unwrap();
//! assert_eq!(input.argument(0), Some("http://localhost:5000"));
//! assert_eq!(render_usage(&spec), "set base [arg]");
//! ```

mod binder;
mod parse;
mod types;
mod usage;
mod validate;

pub use binder::{
    Binding, CommandInput, InputElement, InputElementKind, ProcessingIssue, ProcessingIssueKind,
    bind, eq_ignore_case, matching_name_variant, starts_with_ignore_case,
};
pub use parse::{ESCAPE, ParseResult, QUOTE, normalize_section, parse, quote_if_needed};
pub use types::{
    CommandInputSpecification, CommandInputSpecificationBuilder, DEFAULT_OPTION_PREAMBLE,
    OptionSpecification,
};
pub use usage::{render_aliases, render_usage};
pub use validate::{ValidationError, find_ambiguities, validate_specification};
