//! Push-style markup parser.
//!
//! The parser pulls tokens from a [`Lexer`] and reports structure to a
//! [`MarkupHandler`]: text runs, opened elements with their attributes and
//! closed elements. Self-closing elements produce an open event followed by a
//! close event. A handler may answer a close event with an include path, in
//! which case the named file is spliced into the token stream at that point.

use super::declaration::Attributes;
use super::error::ParseError;
use super::lexer::{Lexer, Token};

/// Receives structural events from a [`MarkupParser`].
pub trait MarkupHandler {
    fn on_text(&mut self, text: &str, line: usize) -> Result<(), ParseError>;

    fn on_open_element(
        &mut self,
        name: &str,
        attributes: Attributes,
        line: usize,
    ) -> Result<(), ParseError>;

    /// Returns `Some(path)` to splice the file at `path` into the input.
    fn on_close_element(&mut self, name: &str, line: usize) -> Result<Option<String>, ParseError>;
}

/// Drives a [`MarkupHandler`] from a token stream.
pub struct MarkupParser {
    lexer: Lexer,
}

impl MarkupParser {
    pub fn new(lexer: Lexer) -> Self {
        Self { lexer }
    }

    /// Current line of the underlying lexer.
    pub fn line(&self) -> usize {
        self.lexer.line()
    }

    /// Parses the whole input, reporting events to `handler`.
    pub fn parse(&mut self, handler: &mut impl MarkupHandler) -> Result<(), ParseError> {
        loop {
            let line = self.lexer.line();
            let Some(token) = self.lexer.next_token()? else {
                return Ok(());
            };
            match token {
                Token::Text(text) => handler.on_text(&text, line)?,
                Token::OpenMarkup => self.parse_element(handler)?,
                other => {
                    return Err(ParseError::syntax(
                        self.lexer.line(),
                        format!("unexpected token {other:?} outside markup"),
                    ));
                }
            }
        }
    }

    /// Parses the rest of an element after its `<`.
    fn parse_element(&mut self, handler: &mut impl MarkupHandler) -> Result<(), ParseError> {
        let name = match self.lexer.next_token()? {
            Some(Token::Slash) => return self.parse_close_element(handler),
            Some(Token::Identifier(name)) => name,
            _ => return Err(ParseError::syntax(self.lexer.line(), "invalid element")),
        };
        let line = self.lexer.line();
        let attributes = self.parse_attributes()?;

        let self_closing = match self.lexer.next_token()? {
            Some(Token::CloseMarkup) => false,
            Some(Token::Slash) => {
                self.expect_close_markup("invalid element")?;
                true
            }
            _ => {
                return Err(ParseError::syntax(
                    self.lexer.line(),
                    format!("invalid element <{name}>"),
                ));
            }
        };

        handler.on_open_element(&name, attributes, line)?;
        if self_closing {
            self.close_element(handler, &name, line)?;
        }
        Ok(())
    }

    /// Reads `name="value"` pairs until a token other than an identifier.
    fn parse_attributes(&mut self) -> Result<Attributes, ParseError> {
        let mut attributes = Attributes::new();
        loop {
            let name = match self.lexer.next_token()? {
                Some(Token::Identifier(name)) => name,
                Some(other) => {
                    self.lexer.push_token(other);
                    return Ok(attributes);
                }
                None => return Ok(attributes),
            };
            if self.lexer.next_token()? != Some(Token::Equals) {
                return Err(ParseError::syntax(
                    self.lexer.line(),
                    format!("expected '=' after attribute '{name}'"),
                ));
            }
            let Some(Token::QuotedString(value)) = self.lexer.next_token()? else {
                return Err(ParseError::syntax(
                    self.lexer.line(),
                    format!("attribute '{name}' is missing a quoted value"),
                ));
            };
            attributes.insert(name, value);
        }
    }

    /// Parses `name>` after `</`.
    fn parse_close_element(&mut self, handler: &mut impl MarkupHandler) -> Result<(), ParseError> {
        let Some(Token::Identifier(name)) = self.lexer.next_token()? else {
            return Err(ParseError::syntax(
                self.lexer.line(),
                "invalid close element",
            ));
        };
        self.expect_close_markup("invalid close element")?;
        let line = self.lexer.line();
        self.close_element(handler, &name, line)
    }

    fn close_element(
        &mut self,
        handler: &mut impl MarkupHandler,
        name: &str,
        line: usize,
    ) -> Result<(), ParseError> {
        if let Some(path) = handler.on_close_element(name, line)? {
            self.lexer.include_file(&path)?;
        }
        Ok(())
    }

    fn expect_close_markup(&mut self, message: &str) -> Result<(), ParseError> {
        match self.lexer.next_token()? {
            Some(Token::CloseMarkup) => Ok(()),
            _ => Err(ParseError::syntax(self.lexer.line(), message)),
        }
    }
}
