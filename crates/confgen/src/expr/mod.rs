//! Boolean expression language used by `<define>`, `<require>` and
//! conditional blocks.
//!
//! Operators from loosest to tightest binding: `||`, `&&`, `^^`, then prefix
//! `!`. Exclusive-or binds tighter than and. Operands are `true`, `false`,
//! condition names and parenthesized expressions.

pub mod ast;
pub mod error;
mod eval;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr};
pub use error::{EvalError, ExprError};
pub use eval::{DEFAULT_MAX_DEPTH, EvalContext, Resolver};
pub use lexer::{ExprToken, tokenize};
pub use parser::{MAX_NESTING, parse_expression};
