//! Expression evaluation with cycle detection.
//!
//! Variables are resolved live through a [`Resolver`], which may in turn
//! evaluate the expression behind another named condition. The shared
//! [`EvalContext`] tracks the names currently being evaluated so that a
//! reference loop is reported instead of recursing without end.

use std::collections::BTreeMap;

use super::ast::Expr;
use super::error::EvalError;

/// Default limit on nested named-condition evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Supplies the value of a variable during evaluation.
pub trait Resolver {
    fn resolve(&self, name: &str, context: &mut EvalContext) -> Result<bool, EvalError>;
}

/// Any `Fn(&str) -> Option<bool>` resolves variables directly; `None` means
/// the name is unknown.
impl<F> Resolver for F
where
    F: Fn(&str) -> Option<bool>,
{
    fn resolve(&self, name: &str, _context: &mut EvalContext) -> Result<bool, EvalError> {
        self(name).ok_or_else(|| EvalError::UnknownVariable {
            name: name.to_string(),
        })
    }
}

/// State carried through nested evaluation.
#[derive(Debug)]
pub struct EvalContext {
    /// Named conditions currently being evaluated, outermost first.
    call_stack: Vec<String>,
    /// Named conditions that finished evaluating in this context.
    resolved: BTreeMap<String, bool>,
    max_depth: usize,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            call_stack: Vec::new(),
            resolved: BTreeMap::new(),
            max_depth,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Marks `name` as being evaluated.
    ///
    /// Fails if `name` is already on the stack or the depth limit is reached.
    pub fn push_call(&mut self, name: &str) -> Result<(), EvalError> {
        if self.call_stack.iter().any(|n| n == name) {
            let mut chain = self.call_stack.clone();
            chain.push(name.to_string());
            return Err(EvalError::CyclicCondition { chain });
        }
        if self.call_stack.len() >= self.max_depth {
            return Err(EvalError::MaxDepthExceeded {
                limit: self.max_depth,
            });
        }
        self.call_stack.push(name.to_string());
        Ok(())
    }

    pub fn pop_call(&mut self) {
        self.call_stack.pop();
    }

    /// Value recorded for `name` by [`EvalContext::record`], if any.
    pub fn resolved(&self, name: &str) -> Option<bool> {
        self.resolved.get(name).copied()
    }

    /// Remembers the value of a named condition so later references to it
    /// in this context do not evaluate it again.
    pub fn record(&mut self, name: impl Into<String>, value: bool) {
        self.resolved.insert(name.into(), value);
    }
}

impl Expr {
    /// Evaluates the expression, resolving variables through `resolver`.
    pub fn evaluate(
        &self,
        resolver: &impl Resolver,
        context: &mut EvalContext,
    ) -> Result<bool, EvalError> {
        match self {
            Expr::Constant(value) => Ok(*value),
            Expr::Variable(name) => resolver.resolve(name, context),
            Expr::Not(inner) => Ok(!inner.evaluate(resolver, context)?),
            Expr::Binary { left, op, right } => {
                let left = left.evaluate(resolver, context)?;
                let right = right.evaluate(resolver, context)?;
                Ok(op.apply(left, right))
            }
        }
    }
}
