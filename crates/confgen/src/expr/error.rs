//! Error types for the expression language.

use thiserror::Error;

/// An error raised while tokenizing or parsing an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// A syntax error at a 1-based character column of the expression source.
    #[error("expression syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },

    /// The expression source holds no tokens.
    #[error("empty expression")]
    Empty,
}

/// An error raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A variable names no known condition.
    #[error("unknown condition '{name}'")]
    UnknownVariable { name: String },

    /// Named conditions refer to each other in a loop.
    #[error("cyclic condition detected: {}", chain.join(" -> "))]
    CyclicCondition { chain: Vec<String> },

    /// Evaluation nested deeper than the configured limit.
    #[error("maximum evaluation depth of {limit} exceeded")]
    MaxDepthExceeded { limit: usize },
}
