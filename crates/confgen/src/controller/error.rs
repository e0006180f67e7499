//! Run-level error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::Stage;
use crate::expr::{EvalError, ExprError};
use crate::properties::SubstitutionError;
use crate::template::ParseError;

/// An error that aborts a template run. The destination is never modified
/// when a run fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The template file could not be read.
    #[error("failed to read template '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The template (or a file it includes) is malformed.
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The expression of a define or rule does not parse.
    #[error("line {line}: invalid expression for '{name}': {source}")]
    Expression {
        name: String,
        line: usize,
        #[source]
        source: ExprError,
    },

    /// A condition could not be evaluated.
    #[error("cannot evaluate condition '{name}': {source}")]
    Evaluation {
        name: String,
        #[source]
        source: EvalError,
    },

    /// Property markers in output text did not settle.
    #[error("line {line}: {source}")]
    Substitution {
        line: usize,
        #[source]
        source: SubstitutionError,
    },

    /// A selected or deselected configuration is not declared.
    #[error("unknown configuration '{name}'{}", did_you_mean(suggestions))]
    UnknownConfiguration {
        name: String,
        suggestions: Vec<String>,
    },

    /// Two configurations share a name, ignoring case.
    #[error("line {line}: configuration '{name}' already declared at line {first_line}")]
    DuplicateConfiguration {
        name: String,
        line: usize,
        first_line: usize,
    },

    /// A define or rule reuses the name of another condition.
    #[error("line {line}: condition '{name}' is already defined")]
    DuplicateCondition { name: String, line: usize },

    /// A conditional block names no known condition.
    #[error("line {line}: conditional block for undefined condition '{name}'{}", did_you_mean(suggestions))]
    UndefinedCondition {
        name: String,
        line: usize,
        suggestions: Vec<String>,
    },

    /// A requirement rule evaluated to false.
    #[error("requirement rule '{name}' failed: {description}")]
    RequirementFailed { name: String, description: String },

    /// Writing the destination failed.
    #[error("failed to write '{path}': {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A pipeline step was called in the wrong stage.
    #[error("pipeline step requires stage {expected:?}, but the run is at {found:?}")]
    OutOfOrder { expected: Stage, found: Stage },
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean: {}?", suggestions.join(", "))
    }
}
