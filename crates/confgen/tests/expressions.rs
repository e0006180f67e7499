//! Integration tests for the boolean expression language.

use std::collections::BTreeMap;

use confgen::conditions::{ConditionTable, ConditionValue};
use confgen::expr::{
    BinaryOp, EvalContext, EvalError, Expr, ExprError, ExprToken, MAX_NESTING, parse_expression,
    tokenize,
};

fn eval_with(source: &str, vars: &[(&str, bool)]) -> bool {
    let vars: BTreeMap<String, bool> = vars.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
    let expr = parse_expression(source).unwrap();
    expr.evaluate(&|name: &str| vars.get(name).copied(), &mut EvalContext::new())
        .unwrap()
}

fn grouping(source: &str) -> String {
    parse_expression(source).unwrap().to_string()
}

// =============================================================================
// Tokens
// =============================================================================

#[test]
fn tokens_carry_columns() {
    assert_eq!(
        tokenize("x_1 && true").unwrap(),
        vec![
            (ExprToken::Identifier("x_1".into()), 1),
            (ExprToken::And, 5),
            (ExprToken::Constant(true), 8),
        ]
    );
}

#[test]
fn all_operators() {
    let tokens: Vec<ExprToken> = tokenize("!(a||b)^^c")
        .unwrap()
        .into_iter()
        .map(|(token, _)| token)
        .collect();
    assert_eq!(
        tokens,
        vec![
            ExprToken::Not,
            ExprToken::OpenParen,
            ExprToken::Identifier("a".into()),
            ExprToken::Or,
            ExprToken::Identifier("b".into()),
            ExprToken::CloseParen,
            ExprToken::Xor,
            ExprToken::Identifier("c".into()),
        ]
    );
}

#[test]
fn single_ampersand_is_rejected() {
    let err = tokenize("a & b").unwrap_err();
    assert_eq!(
        err,
        ExprError::Syntax {
            column: 3,
            message: "unexpected character '&'".into()
        }
    );
}

// =============================================================================
// Grouping
// =============================================================================

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(grouping("a || b && c"), "(a || (b && c))");
    assert_eq!(grouping("a && b || c"), "((a && b) || c)");
}

#[test]
fn xor_binds_tighter_than_and() {
    assert_eq!(grouping("a ^^ b && c"), "((a ^^ b) && c)");
    assert_eq!(grouping("a && b ^^ c"), "(a && (b ^^ c))");
}

#[test]
fn equal_precedence_nests_right() {
    assert_eq!(grouping("a && b && c"), "(a && (b && c))");
    assert_eq!(grouping("a || b || c"), "(a || (b || c))");
}

#[test]
fn not_binds_tightest() {
    assert_eq!(grouping("!a ^^ b"), "(!a ^^ b)");
    assert_eq!(grouping("!!a"), "!!a");
    assert_eq!(grouping("!(a || b)"), "!(a || b)");
}

#[test]
fn parentheses_override_precedence() {
    assert_eq!(grouping("(a || b) && c"), "((a || b) && c)");
}

#[test]
fn ast_shape() {
    assert_eq!(
        parse_expression("a || !false").unwrap(),
        Expr::binary(
            Expr::Variable("a".into()),
            BinaryOp::Or,
            Expr::Not(Box::new(Expr::Constant(false)))
        )
    );
}

#[test]
fn variables_in_source_order() {
    let expr = parse_expression("(b && a) || !c").unwrap();
    assert_eq!(expr.variables(), vec!["b", "a", "c"]);
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn or_of_and_evaluates_as_grouped() {
    assert!(eval_with("a || b && c", &[("a", false), ("b", true), ("c", true)]));
    assert!(!eval_with("a || b && c", &[("a", false), ("b", true), ("c", false)]));
}

#[test]
fn xor_before_and_evaluates_as_grouped() {
    // (true ^^ true) && false is false; true ^^ (true && false) would be true.
    assert!(!eval_with("a ^^ b && c", &[("a", true), ("b", true), ("c", false)]));
}

#[test]
fn constants_and_not() {
    assert!(eval_with("true", &[]));
    assert!(!eval_with("!true", &[]));
    assert!(eval_with("false || !false", &[]));
    assert!(eval_with("true ^^ false", &[]));
    assert!(!eval_with("true ^^ true", &[]));
}

#[test]
fn requirement_style_expression() {
    assert!(eval_with("a && !b", &[("a", true), ("b", false)]));
    assert!(!eval_with("a && !b", &[("a", false), ("b", false)]));
}

#[test]
fn unknown_variable() {
    let expr = parse_expression("a && missing").unwrap();
    let err = expr
        .evaluate(&|name: &str| (name == "a").then_some(true), &mut EvalContext::new())
        .unwrap_err();
    assert_eq!(
        err,
        EvalError::UnknownVariable {
            name: "missing".into()
        }
    );
}

// =============================================================================
// Parse errors
// =============================================================================

#[test]
fn empty_expression() {
    assert_eq!(parse_expression("").unwrap_err(), ExprError::Empty);
    assert_eq!(parse_expression("  \n ").unwrap_err(), ExprError::Empty);
}

#[test]
fn missing_operand() {
    assert_eq!(
        parse_expression("a &&").unwrap_err(),
        ExprError::Syntax {
            column: 5,
            message: "unexpected end of expression".into()
        }
    );
}

#[test]
fn trailing_tokens() {
    let err = parse_expression("a b").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"expression syntax error at column 3: unexpected identifier 'b' after expression");
}

#[test]
fn unclosed_parenthesis() {
    assert_eq!(
        parse_expression("(a").unwrap_err(),
        ExprError::Syntax {
            column: 3,
            message: "expected ')'".into()
        }
    );
}

#[test]
fn deep_parentheses_are_rejected() {
    let source = format!("{}a{}", "(".repeat(100_000), ")".repeat(100_000));
    assert_eq!(
        parse_expression(&source).unwrap_err(),
        ExprError::Syntax {
            column: MAX_NESTING + 2,
            message: "expression nested too deeply".into()
        }
    );
}

#[test]
fn long_not_chain_is_rejected() {
    let source = format!("{}a", "!".repeat(100_000));
    let err = parse_expression(&source).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"expression syntax error at column 258: expression nested too deeply");
}

#[test]
fn long_operator_chain_is_rejected() {
    let source = vec!["a"; 100_000].join(" && ");
    let err = parse_expression(&source).unwrap_err();
    assert!(matches!(err, ExprError::Syntax { message, .. } if message == "expression nested too deeply"));
}

#[test]
fn nesting_within_the_limit_parses() {
    let source = format!("{}a{}", "(".repeat(200), ")".repeat(200));
    assert_eq!(parse_expression(&source).unwrap(), Expr::Variable("a".into()));
    let source = vec!["a"; 200].join(" ^^ ");
    assert!(!eval_with(&source, &[("a", true)]));
}

#[test]
fn operator_in_operand_position() {
    let err = parse_expression("&& a").unwrap_err();
    assert!(matches!(err, ExprError::Syntax { column: 1, .. }));
}

// =============================================================================
// Condition table
// =============================================================================

#[test]
fn forward_references_resolve() {
    let mut table = ConditionTable::new();
    table.insert_expression("alpha", parse_expression("zeta && !beta").unwrap());
    table.insert_expression("beta", parse_expression("false").unwrap());
    table.insert_constant("zeta", true);
    table.evaluate_all().unwrap();
    assert_eq!(table.value("alpha"), Some(true));
    assert_eq!(table.value("beta"), Some(false));
    assert!(table.is_true("zeta"));
}

#[test]
fn values_are_unset_before_evaluation() {
    let mut table = ConditionTable::new();
    table.insert_constant("c", true);
    assert_eq!(table.value("c"), None);
    table.insert("d", ConditionValue::Resolved(false));
    assert_eq!(table.value("d"), Some(false));
}

#[test]
fn cyclic_conditions_are_reported() {
    let mut table = ConditionTable::new();
    table.insert_expression("a", parse_expression("b").unwrap());
    table.insert_expression("b", parse_expression("a").unwrap());
    let failure = table.evaluate_all().unwrap_err();
    assert_eq!(failure.name, "a");
    assert_eq!(
        failure.error,
        EvalError::CyclicCondition {
            chain: vec!["a".into(), "b".into(), "a".into()]
        }
    );
    insta::assert_snapshot!(failure.error.to_string(), @"cyclic condition detected: a -> b -> a");
    assert_eq!(table.value("a"), None);
}

#[test]
fn shared_subconditions_are_evaluated_once() {
    let mut table = ConditionTable::new();
    table.insert_constant("a", true);
    table.insert_expression("d0", parse_expression("a").unwrap());
    for level in 1..=60 {
        let previous = format!("d{}", level - 1);
        let source = format!("{previous} && {previous} && !!{previous}");
        table.insert_expression(format!("d{level}"), parse_expression(&source).unwrap());
    }
    table.evaluate_all().unwrap();
    assert!(table.is_true("d60"));
    assert!(table.is_true("d7"));
}

#[test]
fn self_reference_is_a_cycle() {
    let mut table = ConditionTable::new();
    table.insert_expression("loop", parse_expression("!loop").unwrap());
    let failure = table.evaluate_all().unwrap_err();
    assert!(matches!(failure.error, EvalError::CyclicCondition { .. }));
}

#[test]
fn depth_limit() {
    let mut context = EvalContext::with_max_depth(2);
    context.push_call("a").unwrap();
    context.push_call("b").unwrap();
    assert_eq!(
        context.push_call("c").unwrap_err(),
        EvalError::MaxDepthExceeded { limit: 2 }
    );
    context.pop_call();
    assert_eq!(context.depth(), 1);
    context.push_call("c").unwrap();
}
