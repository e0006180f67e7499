//! Configuration-template compiler.
//!
//! A template mixes literal text, declarations and named conditional blocks:
//!
//! ```text
//! <config name="usb" default="no"/>
//! <property name="SPEED">full</property>
//! <usb>USB_SPEED = ##SPEED##
//! </usb>
//! ```
//!
//! A run selects configurations, evaluates derived conditions and requirement
//! rules, resolves `##NAME##` property markers and writes the surviving text
//! to the destination in a single all-or-nothing commit.

pub mod conditions;
pub mod controller;
pub mod expr;
pub mod model;
pub mod properties;
pub mod template;
pub mod tree;

pub use conditions::{ConditionTable, ConditionValue};
pub use controller::{
    BuildContext, ConfigError, ConfigRequest, Controller, Outcome, Overwrite, RunReport,
    RunWarning, Stage, compute_suggestions, configure,
};
pub use expr::{BinaryOp, EvalContext, EvalError, Expr, ExprError, parse_expression};
pub use model::Definitions;
pub use properties::{PropertyScope, SubstitutionError};
pub use template::{Declaration, ParseError, parse_template};
pub use tree::{NodeId, NodeKind, Tree};
