//! The condition table: every named condition of a run and its value.
//!
//! Entries start out as expressions (configurations are seeded with constant
//! values) and are replaced by booleans in one evaluation pass. During that
//! pass variables are resolved live against the still-unevaluated table, so
//! conditions may refer to names defined later in the template.

use std::collections::BTreeMap;

use tracing::trace;

use crate::expr::{EvalContext, EvalError, Expr, Resolver};

/// Value of one condition-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Pending(Expr),
    Resolved(bool),
}

/// A condition evaluation failure, tagged with the table entry being
/// evaluated when it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFailure {
    pub name: String,
    pub error: EvalError,
}

/// Mapping from condition name to its value.
#[derive(Debug, Clone, Default)]
pub struct ConditionTable {
    entries: BTreeMap<String, ConditionValue>,
}

impl ConditionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_constant(&mut self, name: impl Into<String>, value: bool) {
        self.insert(name, ConditionValue::Pending(Expr::Constant(value)));
    }

    pub fn insert_expression(&mut self, name: impl Into<String>, expr: Expr) {
        self.insert(name, ConditionValue::Pending(expr));
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ConditionValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Condition names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the evaluated value of `name`, or `None` if the name is unknown
    /// or not evaluated yet.
    pub fn value(&self, name: &str) -> Option<bool> {
        match self.entries.get(name)? {
            ConditionValue::Resolved(value) => Some(*value),
            ConditionValue::Pending(_) => None,
        }
    }

    /// Returns true when `name` has been evaluated to true.
    pub fn is_true(&self, name: &str) -> bool {
        self.value(name) == Some(true)
    }

    /// Evaluates every pending entry and replaces it with its boolean value.
    ///
    /// One [`EvalContext`] is shared by the whole pass, so each entry is
    /// evaluated at most once no matter how often it is referenced. On failure
    /// the table is left unchanged.
    pub fn evaluate_all(&mut self) -> Result<(), ConditionFailure> {
        let mut context = EvalContext::new();
        for name in self.entries.keys() {
            let value = self
                .evaluate_entry(name, &mut context)
                .map_err(|error| ConditionFailure {
                    name: name.clone(),
                    error,
                })?;
            trace!(%name, value, "condition evaluated");
        }
        for (name, value) in &mut self.entries {
            if let Some(resolved) = context.resolved(name) {
                *value = ConditionValue::Resolved(resolved);
            }
        }
        Ok(())
    }

    fn evaluate_entry(&self, name: &str, context: &mut EvalContext) -> Result<bool, EvalError> {
        match self.entries.get(name) {
            None => Err(EvalError::UnknownVariable {
                name: name.to_string(),
            }),
            Some(ConditionValue::Resolved(value)) => Ok(*value),
            Some(ConditionValue::Pending(expr)) => {
                if let Some(value) = context.resolved(name) {
                    return Ok(value);
                }
                context.push_call(name)?;
                let result = expr.evaluate(self, context);
                context.pop_call();
                let value = result?;
                context.record(name, value);
                Ok(value)
            }
        }
    }
}

impl Resolver for ConditionTable {
    fn resolve(&self, name: &str, context: &mut EvalContext) -> Result<bool, EvalError> {
        self.evaluate_entry(name, context)
    }
}
