//! Parse error types for templates.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// An error raised while lexing or parsing a template.
///
/// Line numbers are 1-based and keep counting across included files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A lexical or structural error.
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Input ended inside a markup element, comment, string or open block.
    #[error("unexpected end of file at line {line}: {context}")]
    UnexpectedEof { line: usize, context: String },

    /// An included file could not be read.
    #[error("cannot include '{path}' at line {line}: {source}")]
    Include {
        path: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },
}

impl ParseError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn eof(line: usize, context: impl Into<String>) -> Self {
        ParseError::UnexpectedEof {
            line,
            context: context.into(),
        }
    }

    /// Line on which the error was detected.
    pub fn line(&self) -> usize {
        match self {
            ParseError::Syntax { line, .. }
            | ParseError::UnexpectedEof { line, .. }
            | ParseError::Include { line, .. } => *line,
        }
    }
}
