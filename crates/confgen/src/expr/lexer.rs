//! Expression tokenizer using winnow.

use winnow::combinator::alt;
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use super::error::ExprError;

/// A lexical token of the expression language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprToken {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `^^`
    Xor,
    /// `!`
    Not,
    OpenParen,
    CloseParen,
    /// `true` or `false`.
    Constant(bool),
    Identifier(String),
}

/// Splits `input` into tokens, each paired with its 1-based character column.
pub fn tokenize(input: &str) -> Result<Vec<(ExprToken, usize)>, ExprError> {
    let mut remaining = input;
    let mut tokens = Vec::new();
    loop {
        ws(&mut remaining).map_err(|_| syntax(input, remaining, "invalid whitespace"))?;
        if remaining.is_empty() {
            return Ok(tokens);
        }
        let column = calculate_column(input, remaining);
        match token(&mut remaining) {
            Ok(token) => tokens.push((token, column)),
            Err(_) => {
                let c = remaining.chars().next().unwrap_or('?');
                return Err(syntax(input, remaining, format!("unexpected character '{c}'")));
            }
        }
    }
}

fn syntax(original: &str, remaining: &str, message: impl Into<String>) -> ExprError {
    ExprError::Syntax {
        column: calculate_column(original, remaining),
        message: message.into(),
    }
}

/// 1-based character column of `remaining` within `original`.
fn calculate_column(original: &str, remaining: &str) -> usize {
    let consumed = original.len() - remaining.len();
    original[..consumed].chars().count() + 1
}

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

fn token(input: &mut &str) -> ModalResult<ExprToken> {
    alt((
        "&&".value(ExprToken::And),
        "||".value(ExprToken::Or),
        "^^".value(ExprToken::Xor),
        '!'.value(ExprToken::Not),
        '('.value(ExprToken::OpenParen),
        ')'.value(ExprToken::CloseParen),
        word,
    ))
    .parse_next(input)
}

/// An identifier or one of the constants `true` and `false`.
fn word(input: &mut &str) -> ModalResult<ExprToken> {
    (one_of(is_ident_start), take_while(0.., is_ident_cont))
        .take()
        .map(|word: &str| match word {
            "true" => ExprToken::Constant(true),
            "false" => ExprToken::Constant(false),
            other => ExprToken::Identifier(other.to_string()),
        })
        .parse_next(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
