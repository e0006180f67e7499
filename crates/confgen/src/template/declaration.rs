//! Declaration records and the builders that collect them from markup events.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::error::ParseError;

/// Attributes of a markup element, keyed by attribute name.
pub type Attributes = BTreeMap<String, String>;

/// A definition element found in the template.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Project(ProjectDecl),
    Config(ConfigDecl),
    Define(ExpressionDecl),
    Require(ExpressionDecl),
    Property(PropertyDecl),
}

/// `<project name="...">`
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDecl {
    pub name: Option<String>,
    pub description: String,
}

/// `<config name="..." default="yes|no">`
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDecl {
    pub name: String,
    pub description: String,
    pub default_selected: bool,
}

/// `<define name="...">expr</define>` or `<require>expr</require>`
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionDecl {
    pub name: Option<String>,
    pub description: String,
    pub source: String,
}

/// `<property name="..." overrideable="yes|no">value</property>`
///
/// `scope` holds the enclosing configuration's name for properties declared
/// inside a `<config>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub description: String,
    pub value: String,
    pub scope: Option<String>,
    pub overridable: bool,
}

impl Display for Declaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Declaration::Project(p) => {
                write!(f, "project {}", p.name.as_deref().unwrap_or("<anon>"))
            }
            Declaration::Config(c) => {
                write!(f, "config {}", c.name)?;
                if c.default_selected {
                    write!(f, " (default)")?;
                }
                Ok(())
            }
            Declaration::Define(d) => write!(
                f,
                "define {} '{}'",
                d.name.as_deref().unwrap_or("<anon>"),
                d.source.trim()
            ),
            Declaration::Require(r) => write!(
                f,
                "require {} '{}'",
                r.name.as_deref().unwrap_or("<anon>"),
                r.source.trim()
            ),
            Declaration::Property(p) => {
                write!(f, "property {}", p.name)?;
                if let Some(scope) = &p.scope {
                    write!(f, " in {scope}")?;
                }
                Ok(())
            }
        }
    }
}

/// Element names that introduce a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclarationKind {
    Project,
    Config,
    Define,
    Require,
    Property,
}

impl DeclarationKind {
    pub(crate) fn from_element(name: &str) -> Option<Self> {
        match name {
            "project" => Some(Self::Project),
            "config" => Some(Self::Config),
            "define" => Some(Self::Define),
            "require" => Some(Self::Require),
            "property" => Some(Self::Property),
            _ => None,
        }
    }

    pub(crate) fn element(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Config => "config",
            Self::Define => "define",
            Self::Require => "require",
            Self::Property => "property",
        }
    }

    fn requires_name(self) -> bool {
        matches!(self, Self::Config | Self::Define | Self::Property)
    }
}

/// Collects one declaration's attributes, description and body text while
/// its element is open.
#[derive(Debug)]
pub(crate) struct DeclarationBuilder {
    kind: DeclarationKind,
    name: Option<String>,
    /// `default` for configs, `overrideable` for properties.
    flag: bool,
    description: String,
    body: String,
    in_description: bool,
    line: usize,
}

impl DeclarationBuilder {
    pub(crate) fn open(
        kind: DeclarationKind,
        attributes: &Attributes,
        line: usize,
    ) -> Result<Self, ParseError> {
        let name = attributes.get("name").cloned();
        if kind.requires_name() && name.is_none() {
            return Err(ParseError::syntax(
                line,
                format!("<{}> is missing the 'name' attribute", kind.element()),
            ));
        }
        let flag = match kind {
            DeclarationKind::Config => yes_no(attributes, &["default"], false, line)?,
            DeclarationKind::Property => {
                yes_no(attributes, &["overrideable", "overridable"], true, line)?
            }
            DeclarationKind::Project | DeclarationKind::Define | DeclarationKind::Require => false,
        };
        Ok(Self {
            kind,
            name,
            flag,
            description: String::new(),
            body: String::new(),
            in_description: false,
            line,
        })
    }

    pub(crate) fn kind(&self) -> DeclarationKind {
        self.kind
    }

    /// Line of the opening element.
    pub(crate) fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn on_text(&mut self, text: &str, line: usize) -> Result<(), ParseError> {
        if self.in_description {
            self.description.push_str(text);
            return Ok(());
        }
        match self.kind {
            DeclarationKind::Define | DeclarationKind::Require | DeclarationKind::Property => {
                self.body.push_str(text);
                Ok(())
            }
            DeclarationKind::Project | DeclarationKind::Config => {
                if text.trim().is_empty() {
                    Ok(())
                } else {
                    Err(ParseError::syntax(
                        line,
                        format!("unexpected content inside <{}>", self.kind.element()),
                    ))
                }
            }
        }
    }

    /// Handles an element opened inside this declaration. Returns a nested
    /// declaration builder when the element starts a scoped property.
    pub(crate) fn on_open(
        &mut self,
        name: &str,
        attributes: &Attributes,
        line: usize,
    ) -> Result<Option<DeclarationBuilder>, ParseError> {
        if self.in_description {
            return Err(ParseError::syntax(
                line,
                format!("unexpected element <{name}> inside <description>"),
            ));
        }
        if name == "description" {
            self.in_description = true;
            return Ok(None);
        }
        if self.kind == DeclarationKind::Config && name == "property" {
            let nested = DeclarationBuilder::open(DeclarationKind::Property, attributes, line)?;
            return Ok(Some(nested));
        }
        Err(ParseError::syntax(
            line,
            format!("unexpected element <{name}> inside <{}>", self.kind.element()),
        ))
    }

    /// Handles a close tag. Returns true once this declaration's own element
    /// has been closed.
    pub(crate) fn on_close(&mut self, name: &str, line: usize) -> Result<bool, ParseError> {
        if self.in_description && name == "description" {
            self.in_description = false;
            return Ok(false);
        }
        if !self.in_description && name == self.kind.element() {
            return Ok(true);
        }
        let open = if self.in_description {
            "description"
        } else {
            self.kind.element()
        };
        Err(ParseError::syntax(
            line,
            format!("mismatched close element </{name}> inside <{open}>"),
        ))
    }

    /// Name of the element currently open inside this builder.
    pub(crate) fn open_element(&self) -> &'static str {
        if self.in_description {
            "description"
        } else {
            self.kind.element()
        }
    }

    pub(crate) fn finish(self, scope: Option<&str>) -> Declaration {
        let description = self.description.trim().to_string();
        match self.kind {
            DeclarationKind::Project => Declaration::Project(ProjectDecl {
                name: self.name,
                description,
            }),
            DeclarationKind::Config => Declaration::Config(ConfigDecl {
                name: self.name.unwrap_or_default(),
                description,
                default_selected: self.flag,
            }),
            DeclarationKind::Define => Declaration::Define(ExpressionDecl {
                name: self.name,
                description,
                source: self.body,
            }),
            DeclarationKind::Require => Declaration::Require(ExpressionDecl {
                name: self.name,
                description,
                source: self.body,
            }),
            DeclarationKind::Property => Declaration::Property(PropertyDecl {
                name: self.name.unwrap_or_default(),
                description,
                value: self.body,
                scope: scope.map(ToString::to_string),
                overridable: self.flag,
            }),
        }
    }
}

/// Reads a yes/no attribute, trying each accepted spelling in turn.
fn yes_no(
    attributes: &Attributes,
    keys: &[&str],
    default: bool,
    line: usize,
) -> Result<bool, ParseError> {
    let Some((key, value)) = keys
        .iter()
        .find_map(|key| attributes.get(*key).map(|value| (*key, value)))
    else {
        return Ok(default);
    };
    match value.as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(ParseError::syntax(
            line,
            format!("invalid value '{other}' for '{key}' attribute, expected 'yes' or 'no'"),
        )),
    }
}
