//! Template lexer, markup parser and tree builder.
//!
//! A template mixes literal text with element markup. Elements named after a
//! declaration keyword (`project`, `config`, `define`, `require`, `property`)
//! become [`Declaration`] nodes, `<include path="..."/>` splices another file,
//! and every other element opens a conditional block named after it.

mod builder;
mod declaration;
mod error;
mod lexer;
mod markup;

use std::path::PathBuf;

pub use builder::TreeBuilder;
pub use declaration::{
    Attributes, ConfigDecl, Declaration, ExpressionDecl, ProjectDecl, PropertyDecl,
};
pub use error::ParseError;
pub use lexer::{Lexer, Token};
pub use markup::{MarkupHandler, MarkupParser};

use crate::tree::Tree;

/// Parses template text into a tree. Relative include paths resolve against
/// `base_dir`.
pub fn parse_template(text: &str, base_dir: impl Into<PathBuf>) -> Result<Tree, ParseError> {
    let mut parser = MarkupParser::new(Lexer::new(text, base_dir));
    let mut builder = TreeBuilder::new();
    parser.parse(&mut builder)?;
    builder.finish(parser.line())
}
