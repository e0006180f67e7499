//! Model objects extracted from the declarations of a template tree.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use tracing::debug;

use crate::controller::ConfigError;
use crate::expr::{Expr, ExprError, parse_expression};
use crate::template::{ConfigDecl, Declaration, ExpressionDecl, ProjectDecl, PropertyDecl};
use crate::tree::{NodeKind, Tree};

/// Prefix of the names given to rules declared without one.
pub const ANONYMOUS_RULE_PREFIX: &str = "$rule";

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: Option<String>,
    pub description: String,
}

/// A named boolean toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub name: String,
    pub description: String,
    pub default_selected: bool,
    pub line: usize,
}

/// A named boolean expression: a derived condition or a requirement rule.
///
/// The expression source is parsed on first use.
#[derive(Debug, Clone)]
pub struct NamedExpression {
    pub name: String,
    pub description: String,
    pub source: String,
    pub line: usize,
    parsed: OnceCell<Expr>,
}

impl NamedExpression {
    pub fn new(name: impl Into<String>, source: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            source: source.into(),
            line,
            parsed: OnceCell::new(),
        }
    }

    /// Returns the parsed expression, parsing the source on first call.
    pub fn expression(&self) -> Result<&Expr, ExprError> {
        if let Some(expr) = self.parsed.get() {
            return Ok(expr);
        }
        let expr = parse_expression(&self.source)?;
        Ok(self.parsed.get_or_init(|| expr))
    }
}

/// A named string value, global or scoped to one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub description: String,
    pub value: String,
    pub scope: Option<String>,
    pub overridable: bool,
    pub line: usize,
}

impl Property {
    pub fn is_global(&self) -> bool {
        self.scope.is_none()
    }
}

/// Everything declared by one template.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    /// The last `<project>` declaration, if any.
    pub project: Option<Project>,
    /// Keyed by lower-cased name.
    configs: BTreeMap<String, Configuration>,
    pub defines: Vec<NamedExpression>,
    pub rules: Vec<NamedExpression>,
    pub properties: Vec<Property>,
}

impl Definitions {
    /// Collects the declarations found anywhere in `tree`, including inside
    /// conditional blocks.
    pub fn extract(tree: &Tree) -> Result<Self, ConfigError> {
        let mut definitions = Definitions::default();
        let mut anonymous_rules = 0;
        tree.visit(&mut |_, node| {
            let NodeKind::Declaration(declaration) = node.kind() else {
                return Ok(true);
            };
            let line = node.line();
            match declaration {
                Declaration::Project(ProjectDecl { name, description }) => {
                    definitions.project = Some(Project {
                        name: name.clone(),
                        description: description.clone(),
                    });
                }
                Declaration::Config(config) => definitions.add_config(config, line)?,
                Declaration::Define(define) => {
                    let name = define.name.clone().unwrap_or_default();
                    definitions.defines.push(named_expression(name, define, line));
                }
                Declaration::Require(rule) => {
                    let name = match &rule.name {
                        Some(name) => name.clone(),
                        None => {
                            anonymous_rules += 1;
                            format!("{ANONYMOUS_RULE_PREFIX}{anonymous_rules}")
                        }
                    };
                    definitions.rules.push(named_expression(name, rule, line));
                }
                Declaration::Property(property) => {
                    definitions.properties.push(property_from(property, line));
                }
            }
            Ok(true)
        })?;
        debug!(
            configs = definitions.configs.len(),
            defines = definitions.defines.len(),
            rules = definitions.rules.len(),
            properties = definitions.properties.len(),
            "extracted definitions"
        );
        Ok(definitions)
    }

    fn add_config(&mut self, config: &ConfigDecl, line: usize) -> Result<(), ConfigError> {
        let key = config.name.to_lowercase();
        if let Some(existing) = self.configs.get(&key) {
            return Err(ConfigError::DuplicateConfiguration {
                name: config.name.clone(),
                line,
                first_line: existing.line,
            });
        }
        self.configs.insert(
            key,
            Configuration {
                name: config.name.clone(),
                description: config.description.clone(),
                default_selected: config.default_selected,
                line,
            },
        );
        Ok(())
    }

    /// Looks up a configuration by name, ignoring case.
    pub fn config(&self, name: &str) -> Option<&Configuration> {
        self.configs.get(&name.to_lowercase())
    }

    /// All configurations, ordered by lower-cased name.
    pub fn configs(&self) -> impl Iterator<Item = &Configuration> {
        self.configs.values()
    }

    /// Looks up a declared property by name, ignoring case. When several
    /// declarations share the name the last one wins.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .rev()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }
}

fn named_expression(name: String, declaration: &ExpressionDecl, line: usize) -> NamedExpression {
    let mut expression = NamedExpression::new(name, declaration.source.clone(), line);
    expression.description.clone_from(&declaration.description);
    expression
}

fn property_from(declaration: &PropertyDecl, line: usize) -> Property {
    Property {
        name: declaration.name.clone(),
        description: declaration.description.clone(),
        value: declaration.value.clone(),
        scope: declaration.scope.clone(),
        overridable: declaration.overridable,
        line,
    }
}
