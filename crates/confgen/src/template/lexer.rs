//! Template lexer.
//!
//! A small state machine over the template characters. Outside markup it
//! collects literal text; inside `<...>` it produces identifiers, quoted
//! strings, `=` and `/`. Comments (`<!-- ... -->`) are dropped together with
//! a whitespace-only remainder of the line they close on.
//!
//! Included files are pushed on a source stack. Each source remembers its own
//! directory so relative include paths resolve against the including file,
//! and the line counter keeps running across source boundaries.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::ParseError;

/// A lexical token of the template markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text outside of markup.
    Text(String),
    /// `<`
    OpenMarkup,
    /// `>`
    CloseMarkup,
    Identifier(String),
    /// A `"..."` attribute value with escapes removed.
    QuotedString(String),
    Equals,
    Slash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    EnteringMarkup,
    InsideMarkup,
    Comment,
    Quoted,
    Finished,
}

#[derive(Debug)]
struct Source {
    chars: Vec<char>,
    pos: usize,
    dir: PathBuf,
    /// Canonical path of an included file; `None` for the root text.
    path: Option<PathBuf>,
}

impl Source {
    fn new(text: &str, dir: PathBuf, path: Option<PathBuf>) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            dir,
            path,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }
}

/// Converts template characters into [`Token`]s.
#[derive(Debug)]
pub struct Lexer {
    sources: Vec<Source>,
    line: usize,
    state: State,
    pushed: Vec<Token>,
}

impl Lexer {
    /// Creates a lexer over `text`. Relative include paths resolve against `dir`.
    pub fn new(text: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            sources: vec![Source::new(text, dir.into(), None)],
            line: 1,
            state: State::Outside,
            pushed: Vec::new(),
        }
    }

    /// Current 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Directory of the source currently being read.
    pub fn current_dir(&self) -> &Path {
        self.sources
            .last()
            .map(|s| s.dir.as_path())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Reads `path` (relative to the current source's directory) and continues
    /// lexing from its content. The current source resumes once it is exhausted.
    ///
    /// Including a file that is already being read is an error.
    pub fn include_file(&mut self, path: &str) -> Result<(), ParseError> {
        let resolved = self.current_dir().join(path);
        let read = |resolved: &Path| -> io::Result<(PathBuf, String)> {
            let canonical = fs::canonicalize(resolved)?;
            let text = fs::read_to_string(&canonical)?;
            Ok((canonical, text))
        };
        let (canonical, text) = read(&resolved).map_err(|source| ParseError::Include {
            path: resolved.clone(),
            line: self.line,
            source,
        })?;
        if self
            .sources
            .iter()
            .any(|source| source.path.as_ref() == Some(&canonical))
        {
            return Err(ParseError::syntax(
                self.line,
                format!("recursive include of '{}'", resolved.display()),
            ));
        }
        let dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.current_dir().to_path_buf());
        debug!(path = %canonical.display(), line = self.line, "including template file");
        self.sources.push(Source::new(&text, dir, Some(canonical)));
        Ok(())
    }

    /// Returns a token so that the next call to [`Lexer::next_token`] yields it.
    pub fn push_token(&mut self, token: Token) {
        self.pushed.push(token);
    }

    /// Returns the next token, or `None` at the end of all input.
    pub fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        if let Some(token) = self.pushed.pop() {
            return Ok(Some(token));
        }
        self.read_token()
    }

    fn read_token(&mut self) -> Result<Option<Token>, ParseError> {
        if self.state == State::Finished {
            return Ok(None);
        }
        let mut buffer = String::new();
        while let Some(c) = self.get() {
            match self.state {
                State::Outside => {
                    if c == '<' {
                        if self.peek_is("!--") {
                            self.skip(3);
                            self.state = State::Comment;
                        } else {
                            self.unget();
                            self.state = State::EnteringMarkup;
                        }
                        if !buffer.is_empty() {
                            return Ok(Some(Token::Text(buffer)));
                        }
                    } else if is_eol(c) {
                        buffer.push_str(self.scan_eol(c));
                    } else {
                        buffer.push(c);
                    }
                }
                State::EnteringMarkup => {
                    if c != '<' {
                        return Err(ParseError::syntax(
                            self.line,
                            format!("unexpected character '{c}' at start of markup"),
                        ));
                    }
                    self.state = State::InsideMarkup;
                    return Ok(Some(Token::OpenMarkup));
                }
                State::InsideMarkup => match c {
                    c if is_ident_start(c) => {
                        let mut ident = String::from(c);
                        while let Some(next) = self.get() {
                            if is_ident_cont(next) {
                                ident.push(next);
                            } else {
                                self.unget();
                                break;
                            }
                        }
                        return Ok(Some(Token::Identifier(ident)));
                    }
                    '=' => return Ok(Some(Token::Equals)),
                    '/' => return Ok(Some(Token::Slash)),
                    '"' => self.state = State::Quoted,
                    '>' => {
                        self.state = State::Outside;
                        return Ok(Some(Token::CloseMarkup));
                    }
                    c if is_eol(c) => {
                        self.scan_eol(c);
                    }
                    ' ' | '\t' => {}
                    other => {
                        return Err(ParseError::syntax(
                            self.line,
                            format!("unexpected character '{other}' inside markup"),
                        ));
                    }
                },
                State::Comment => {
                    if c == '-' && self.peek_is("->") {
                        self.skip(2);
                        self.state = State::Outside;
                        self.skip_whitespace_to_eol();
                    } else if is_eol(c) {
                        self.scan_eol(c);
                    }
                }
                State::Quoted => match c {
                    '\\' => match self.get() {
                        Some(escaped) => {
                            if is_eol(escaped) {
                                buffer.push_str(self.scan_eol(escaped));
                            } else {
                                buffer.push(escaped);
                            }
                        }
                        None => {
                            self.state = State::Finished;
                            return Err(ParseError::eof(self.line, "inside quoted string"));
                        }
                    },
                    '"' => {
                        self.state = State::InsideMarkup;
                        return Ok(Some(Token::QuotedString(buffer)));
                    }
                    c if is_eol(c) => buffer.push_str(self.scan_eol(c)),
                    c => buffer.push(c),
                },
                State::Finished => return Ok(None),
            }
        }

        let last = self.state;
        self.state = State::Finished;
        match last {
            State::Outside if !buffer.is_empty() => Ok(Some(Token::Text(buffer))),
            State::InsideMarkup | State::EnteringMarkup => {
                Err(ParseError::eof(self.line, "inside markup element"))
            }
            State::Comment => Err(ParseError::eof(self.line, "inside comment")),
            State::Quoted => Err(ParseError::eof(self.line, "inside quoted string")),
            State::Outside | State::Finished => Ok(None),
        }
    }

    /// Next character of the innermost non-exhausted source. Exhausted include
    /// sources are popped; the root source is never popped.
    fn get(&mut self) -> Option<char> {
        loop {
            let source = self.sources.last_mut()?;
            if let Some(c) = source.peek_at(0) {
                source.pos += 1;
                return Some(c);
            }
            if self.sources.len() == 1 {
                return None;
            }
            if let Some(finished) = self.sources.pop() {
                debug!(dir = %finished.dir.display(), line = self.line, "include finished");
            }
        }
    }

    /// Steps back over the character returned by the last [`Lexer::get`].
    fn unget(&mut self) {
        if let Some(source) = self.sources.last_mut() {
            source.pos = source.pos.saturating_sub(1);
        }
    }

    fn peek_is(&self, expected: &str) -> bool {
        let Some(source) = self.sources.last() else {
            return false;
        };
        expected
            .chars()
            .enumerate()
            .all(|(i, c)| source.peek_at(i) == Some(c))
    }

    fn skip(&mut self, count: usize) {
        if let Some(source) = self.sources.last_mut() {
            source.pos = (source.pos + count).min(source.chars.len());
        }
    }

    /// Counts a line break, folding CR LF into one. Returns the break as read.
    fn scan_eol(&mut self, c: char) -> &'static str {
        self.line += 1;
        if c == '\r' {
            let crlf = self
                .sources
                .last()
                .is_some_and(|source| source.peek_at(0) == Some('\n'));
            if crlf {
                self.skip(1);
                return "\r\n";
            }
            return "\r";
        }
        "\n"
    }

    /// After a comment: drops spaces and tabs up to and including the next line
    /// break, unless something else appears on the line first.
    fn skip_whitespace_to_eol(&mut self) {
        let Some(source) = self.sources.last() else {
            return;
        };
        let mut offset = 0;
        while matches!(source.peek_at(offset), Some(' ' | '\t')) {
            offset += 1;
        }
        match source.peek_at(offset) {
            Some(c) if is_eol(c) => {
                self.skip(offset + 1);
                self.scan_eol(c);
            }
            None => self.skip(offset),
            Some(_) => {}
        }
    }
}

fn is_eol(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
