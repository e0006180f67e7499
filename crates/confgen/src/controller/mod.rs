//! The run controller.
//!
//! A [`Controller`] drives one template through a fixed sequence of steps.
//! Each step is a public method that may only be called in the matching
//! [`Stage`]; [`Controller::run`] calls them all in order and commits the
//! result.

mod error;
mod output;
mod request;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};

use strsim::levenshtein;
use tracing::{debug, info, warn};

pub use error::ConfigError;
pub use output::Outcome;
pub use request::{BuildContext, ConfigRequest, InvalidOverwrite, Overwrite};

use crate::conditions::ConditionTable;
use crate::model::{Definitions, Project};
use crate::properties::PropertyScope;
use crate::template::parse_template;
use crate::tree::{NodeId, NodeKind, Tree};

/// Pipeline position of a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unparsed,
    Parsed,
    ObjectsExtracted,
    ConditionsSeeded,
    TreeFiltered,
    TreeValidated,
    ConditionsEvaluated,
    PropertiesBuilt,
    RulesChecked,
    OutputGenerated,
    Committed,
}

/// A non-fatal condition reported by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    /// A caller override targeted a property declared non-overridable.
    PropertyNotOverridable { name: String },
    /// The destination exists and the overwrite policy is `no`.
    OutputExists { path: PathBuf },
}

impl Display for RunWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RunWarning::PropertyNotOverridable { name } => {
                write!(f, "cannot override property '{name}'")
            }
            RunWarning::OutputExists { path } => write!(
                f,
                "skipped configuring '{}' because the overwrite option is off",
                path.display()
            ),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Destination path, resolved against the build context.
    pub output: PathBuf,
    pub outcome: Outcome,
    pub warnings: Vec<RunWarning>,
}

/// Compiles the template named by `request` and commits the output.
///
/// # Example
///
/// ```no_run
/// use confgen::{BuildContext, ConfigRequest, configure};
///
/// let request = ConfigRequest::builder()
///     .template("board.tpl")
///     .output("board.mk")
///     .selected(vec!["usb".to_string()])
///     .build();
/// let context = BuildContext::builder().base_dir("firmware").build();
/// let report = configure(&request, &context)?;
/// println!("{:?}", report.outcome);
/// # Ok::<(), confgen::ConfigError>(())
/// ```
pub fn configure(
    request: &ConfigRequest,
    context: &BuildContext,
) -> Result<RunReport, ConfigError> {
    Controller::new(request.clone(), context.clone()).run()
}

/// Drives one template run.
#[derive(Debug)]
pub struct Controller {
    request: ConfigRequest,
    context: BuildContext,
    template_path: PathBuf,
    output_path: PathBuf,
    stage: Stage,
    tree: Tree,
    definitions: Definitions,
    conditions: ConditionTable,
    scope: PropertyScope,
    output: String,
    warnings: Vec<RunWarning>,
}

impl Controller {
    pub fn new(request: ConfigRequest, context: BuildContext) -> Self {
        let template_path = context.resolve(&request.template);
        let output_path = context.resolve(&request.output);
        Self {
            request,
            context,
            template_path,
            output_path,
            stage: Stage::Unparsed,
            tree: Tree::new(),
            definitions: Definitions::default(),
            conditions: ConditionTable::new(),
            scope: PropertyScope::new(),
            output: String::new(),
            warnings: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// The project declared by the template, if any.
    pub fn project(&self) -> Option<&Project> {
        self.definitions.project.as_ref()
    }

    pub fn conditions(&self) -> &ConditionTable {
        &self.conditions
    }

    pub fn properties(&self) -> &PropertyScope {
        &self.scope
    }

    /// Text produced by [`Controller::generate_output`].
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn warnings(&self) -> &[RunWarning] {
        &self.warnings
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    // =========================================================================
    // Run
    // =========================================================================

    /// Runs every remaining step and commits the output.
    pub fn run(&mut self) -> Result<RunReport, ConfigError> {
        if self.context.log_config {
            info!(
                output = %self.output_path.display(),
                selected = ?self.request.selected,
                deselected = ?self.request.deselected,
                properties = ?self.request.properties,
                "configuring"
            );
        }

        if self.request.overwrite == Overwrite::No && self.output_path.exists() {
            info!(
                path = %self.output_path.display(),
                "skipped configuring, overwrite is off"
            );
            self.warnings.push(RunWarning::OutputExists {
                path: self.output_path.clone(),
            });
            return Ok(self.report(Outcome::Skipped));
        }

        self.parse()?;
        self.extract_definitions()?;
        self.seed_conditions()?;
        self.filter_tree()?;
        self.validate_tree()?;
        self.evaluate_conditions()?;
        self.build_properties()?;
        self.check_rules()?;
        self.generate_output()?;
        let outcome = self.commit()?;
        Ok(self.report(outcome))
    }

    fn report(&self, outcome: Outcome) -> RunReport {
        RunReport {
            output: self.output_path.clone(),
            outcome,
            warnings: self.warnings.clone(),
        }
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), ConfigError> {
        if self.stage != expected {
            return Err(ConfigError::OutOfOrder {
                expected,
                found: self.stage,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Reads and parses the template. Does nothing once parsing succeeded.
    pub fn parse(&mut self) -> Result<(), ConfigError> {
        if self.stage != Stage::Unparsed {
            return Ok(());
        }
        let path = self.template_path.clone();
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.tree = parse_template(&text, dir).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "parsed template");
        self.stage = Stage::Parsed;
        Ok(())
    }

    /// Builds the model objects from every declaration in the tree.
    pub fn extract_definitions(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::Parsed)?;
        self.definitions = Definitions::extract(&self.tree)?;
        self.stage = Stage::ObjectsExtracted;
        Ok(())
    }

    /// Fills the condition table: configurations get constant values from the
    /// request or their defaults, defines and rules get their expressions.
    pub fn seed_conditions(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::ObjectsExtracted)?;

        let mut explicit = BTreeMap::new();
        let requested = [
            (&self.request.selected, true),
            (&self.request.deselected, false),
        ];
        for (names, value) in requested {
            for name in names {
                let Some(config) = self.definitions.config(name) else {
                    let available: Vec<String> =
                        self.definitions.configs().map(|c| c.name.clone()).collect();
                    return Err(ConfigError::UnknownConfiguration {
                        name: name.clone(),
                        suggestions: compute_suggestions(name, &available),
                    });
                };
                explicit.insert(config.name.clone(), value);
            }
        }

        for config in self.definitions.configs() {
            let value = explicit
                .get(&config.name)
                .copied()
                .unwrap_or(config.default_selected);
            self.conditions.insert_constant(config.name.clone(), value);
        }

        for named in self.definitions.defines.iter().chain(&self.definitions.rules) {
            if self.conditions.contains(&named.name) {
                return Err(ConfigError::DuplicateCondition {
                    name: named.name.clone(),
                    line: named.line,
                });
            }
            let expr = named
                .expression()
                .map_err(|source| ConfigError::Expression {
                    name: named.name.clone(),
                    line: named.line,
                    source,
                })?;
            self.conditions
                .insert_expression(named.name.clone(), expr.clone());
        }
        debug!(conditions = self.conditions.len(), "seeded condition table");
        self.stage = Stage::ConditionsSeeded;
        Ok(())
    }

    /// Removes declarations from the top-level node list, together with
    /// whitespace-only text directly between two declarations.
    pub fn filter_tree(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::ConditionsSeeded)?;

        let top_level: Vec<NodeId> = self.tree.children(None).collect();
        for &id in &top_level {
            if !self.tree.kind(id).is_whitespace_text() {
                continue;
            }
            let tree = &self.tree;
            let is_declaration =
                |sibling: Option<NodeId>| sibling.is_some_and(|s| tree.kind(s).is_declaration());
            if is_declaration(tree.prev_sibling(id)) && is_declaration(tree.next_sibling(id)) {
                self.tree.remove(id);
            }
        }
        for id in top_level {
            if self.tree.kind(id).is_declaration() {
                self.tree.remove(id);
            }
        }
        self.stage = Stage::TreeFiltered;
        Ok(())
    }

    /// Checks that every conditional block names a known condition.
    pub fn validate_tree(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::TreeFiltered)?;
        let conditions = &self.conditions;
        self.tree.visit(&mut |_, node| {
            if let NodeKind::Conditional { name } = node.kind() {
                if !conditions.contains(name) {
                    let available: Vec<String> =
                        conditions.names().map(ToString::to_string).collect();
                    return Err(ConfigError::UndefinedCondition {
                        name: name.clone(),
                        line: node.line(),
                        suggestions: compute_suggestions(name, &available),
                    });
                }
            }
            Ok(true)
        })?;
        self.stage = Stage::TreeValidated;
        Ok(())
    }

    /// Replaces every condition-table expression with its value.
    pub fn evaluate_conditions(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::TreeValidated)?;
        self.conditions
            .evaluate_all()
            .map_err(|failure| ConfigError::Evaluation {
                name: failure.name,
                source: failure.error,
            })?;
        self.stage = Stage::ConditionsEvaluated;
        Ok(())
    }

    /// Builds the property scope: global properties, then properties of
    /// selected configurations, then caller overrides.
    pub fn build_properties(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::ConditionsEvaluated)?;

        let mut locked = BTreeSet::new();
        for property in self.definitions.properties.iter().filter(|p| p.is_global()) {
            self.scope.set(property.name.clone(), property.value.clone());
            if !property.overridable {
                locked.insert(property.name.clone());
            }
        }

        for property in &self.definitions.properties {
            let Some(scope) = &property.scope else {
                continue;
            };
            if self.definitions.config(scope).is_some() && self.conditions.is_true(scope) {
                self.scope.set(property.name.clone(), property.value.clone());
                if !property.overridable {
                    locked.insert(property.name.clone());
                }
            }
        }

        for (name, value) in &self.request.properties {
            let name = self
                .definitions
                .property(name)
                .map_or_else(|| name.clone(), |declared| declared.name.clone());
            if self.scope.contains(&name) && locked.contains(&name) {
                warn!(property = %name, "cannot override property");
                self.warnings
                    .push(RunWarning::PropertyNotOverridable { name });
                continue;
            }
            self.scope.set(name, value.clone());
        }
        self.stage = Stage::PropertiesBuilt;
        Ok(())
    }

    /// Fails on the first requirement rule that did not evaluate to true.
    pub fn check_rules(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::PropertiesBuilt)?;
        for rule in &self.definitions.rules {
            if !self.conditions.is_true(&rule.name) {
                return Err(ConfigError::RequirementFailed {
                    name: rule.name.clone(),
                    description: rule.description.clone(),
                });
            }
        }
        self.stage = Stage::RulesChecked;
        Ok(())
    }

    /// Walks the filtered tree and renders the output text. Blocks whose
    /// condition is false are skipped with all their content.
    pub fn generate_output(&mut self) -> Result<(), ConfigError> {
        self.expect_stage(Stage::RulesChecked)?;
        let Self {
            tree,
            conditions,
            scope,
            output,
            ..
        } = self;
        output.clear();
        tree.visit(&mut |_, node| match node.kind() {
            NodeKind::Text(text) => {
                let text = scope
                    .substitute(text)
                    .map_err(|source| ConfigError::Substitution {
                        line: node.line(),
                        source,
                    })?;
                output.push_str(&text);
                Ok(true)
            }
            NodeKind::Conditional { name } => Ok(conditions.is_true(name)),
            NodeKind::Declaration(_) => Ok(false),
        })?;
        self.stage = Stage::OutputGenerated;
        Ok(())
    }

    /// Writes the generated text to the destination according to the
    /// request's overwrite policy.
    pub fn commit(&mut self) -> Result<Outcome, ConfigError> {
        self.expect_stage(Stage::OutputGenerated)?;
        let outcome = output::commit(&self.output_path, &self.output, self.request.overwrite)?;
        self.stage = Stage::Committed;
        Ok(outcome)
    }
}

/// Compute typo suggestions using Levenshtein distance.
///
/// - distance <= 1 for names <= 3 chars
/// - distance <= 2 for longer names
/// - at most 3 suggestions, closest first
pub fn compute_suggestions(name: &str, available: &[String]) -> Vec<String> {
    let max_distance = if name.len() <= 3 { 1 } else { 2 };
    let mut suggestions: Vec<(usize, String)> = available
        .iter()
        .filter_map(|candidate| {
            let distance = levenshtein(name, candidate);
            (distance > 0 && distance <= max_distance).then(|| (distance, candidate.clone()))
        })
        .collect();
    suggestions.sort_by_key(|(distance, _)| *distance);
    suggestions.into_iter().take(3).map(|(_, s)| s).collect()
}
