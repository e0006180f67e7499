//! Builds a [`Tree`] from markup events.
//!
//! The builder keeps two explicit stacks: the conditional blocks currently
//! open (the innermost one is the insertion point for new nodes) and the
//! declarations currently open (a `<property>` may be open inside a
//! `<config>`). Declarations are attached to the tree when their element
//! closes.

use tracing::trace;

use super::declaration::{Attributes, DeclarationBuilder, DeclarationKind};
use super::error::ParseError;
use super::markup::MarkupHandler;
use crate::tree::{NodeId, NodeKind, Tree};

/// Name of the element that splices another template file.
const INCLUDE_ELEMENT: &str = "include";

/// [`MarkupHandler`] that assembles the template tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
    blocks: Vec<(NodeId, String)>,
    declarations: Vec<DeclarationBuilder>,
    pending_include: Option<String>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the finished tree, failing if any element is still open.
    pub fn finish(self, line: usize) -> Result<Tree, ParseError> {
        if let Some(declaration) = self.declarations.last() {
            return Err(ParseError::eof(
                line,
                format!("unclosed <{}> element", declaration.open_element()),
            ));
        }
        if self.pending_include.is_some() {
            return Err(ParseError::eof(line, "unclosed <include> element"));
        }
        if let Some((_, name)) = self.blocks.last() {
            return Err(ParseError::eof(
                line,
                format!("unclosed conditional block <{name}>"),
            ));
        }
        Ok(self.tree)
    }

    fn insertion_point(&self) -> Option<NodeId> {
        self.blocks.last().map(|(id, _)| *id)
    }

    fn attach_declaration(&mut self, finished: DeclarationBuilder) {
        let scope = self
            .declarations
            .last()
            .filter(|parent| parent.kind() == DeclarationKind::Config)
            .and_then(DeclarationBuilder::name)
            .map(ToString::to_string);
        let line = finished.line();
        let declaration = finished.finish(scope.as_deref());
        trace!(%declaration, line, "declaration");
        let parent = self.insertion_point();
        self.tree
            .append(parent, NodeKind::Declaration(declaration), line);
    }
}

impl MarkupHandler for TreeBuilder {
    fn on_text(&mut self, text: &str, line: usize) -> Result<(), ParseError> {
        if let Some(current) = self.declarations.last_mut() {
            return current.on_text(text, line);
        }
        let parent = self.insertion_point();
        self.tree
            .append(parent, NodeKind::Text(text.to_string()), line);
        Ok(())
    }

    fn on_open_element(
        &mut self,
        name: &str,
        attributes: Attributes,
        line: usize,
    ) -> Result<(), ParseError> {
        if let Some(current) = self.declarations.last_mut() {
            if let Some(nested) = current.on_open(name, &attributes, line)? {
                self.declarations.push(nested);
            }
            return Ok(());
        }
        if let Some(kind) = DeclarationKind::from_element(name) {
            self.declarations
                .push(DeclarationBuilder::open(kind, &attributes, line)?);
            return Ok(());
        }
        if name == INCLUDE_ELEMENT {
            if self.pending_include.is_some() {
                return Err(ParseError::syntax(line, "nested <include> element"));
            }
            let Some(path) = attributes.get("path") else {
                return Err(ParseError::syntax(
                    line,
                    "<include> is missing the 'path' attribute",
                ));
            };
            self.pending_include = Some(path.clone());
            return Ok(());
        }
        let parent = self.insertion_point();
        let id = self.tree.append(
            parent,
            NodeKind::Conditional {
                name: name.to_string(),
            },
            line,
        );
        self.blocks.push((id, name.to_string()));
        Ok(())
    }

    fn on_close_element(&mut self, name: &str, line: usize) -> Result<Option<String>, ParseError> {
        if let Some(current) = self.declarations.last_mut() {
            if current.on_close(name, line)? {
                if let Some(finished) = self.declarations.pop() {
                    self.attach_declaration(finished);
                }
            }
            return Ok(None);
        }
        if name == INCLUDE_ELEMENT {
            if let Some(path) = self.pending_include.take() {
                return Ok(Some(path));
            }
        }
        match self.blocks.last() {
            Some((_, open)) if open == name => {
                self.blocks.pop();
                Ok(None)
            }
            Some((_, open)) => Err(ParseError::syntax(
                line,
                format!("mismatched close element </{name}>, expected </{open}>"),
            )),
            None => Err(ParseError::syntax(
                line,
                format!("unexpected close element </{name}>"),
            )),
        }
    }
}
