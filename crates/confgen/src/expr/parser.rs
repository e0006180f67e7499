//! Recursive-descent expression parser.
//!
//! ```text
//! or-expr    := and-expr ('||' or-expr)?
//! and-expr   := xor-expr ('&&' and-expr)?
//! xor-expr   := unary-expr ('^^' xor-expr)?
//! unary-expr := '!' unary-expr | primary
//! primary    := 'true' | 'false' | identifier | '(' or-expr ')'
//! ```
//!
//! Operators of equal precedence nest to the right. Nesting through
//! parentheses, `!` and operator chains is limited to [`MAX_NESTING`] levels.

use super::ast::{BinaryOp, Expr};
use super::error::ExprError;
use super::lexer::{ExprToken, tokenize};

/// Deepest nesting accepted by [`parse_expression`].
pub const MAX_NESTING: usize = 256;

/// Parses a complete expression. Trailing tokens are an error.
pub fn parse_expression(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end_column: source.chars().count() + 1,
    };
    let expr = parser.or_expr()?;
    if let Some((token, column)) = parser.tokens.get(parser.pos) {
        return Err(ExprError::Syntax {
            column: *column,
            message: format!("unexpected {} after expression", describe(token)),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<(ExprToken, usize)>,
    pos: usize,
    depth: usize,
    end_column: usize,
}

impl Parser {
    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let left = self.and_expr()?;
        if self.eat(&ExprToken::Or) {
            let right = self.nested(Self::or_expr)?;
            return Ok(Expr::binary(left, BinaryOp::Or, right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let left = self.xor_expr()?;
        if self.eat(&ExprToken::And) {
            let right = self.nested(Self::and_expr)?;
            return Ok(Expr::binary(left, BinaryOp::And, right));
        }
        Ok(left)
    }

    fn xor_expr(&mut self) -> Result<Expr, ExprError> {
        let left = self.unary_expr()?;
        if self.eat(&ExprToken::Xor) {
            let right = self.nested(Self::xor_expr)?;
            return Ok(Expr::binary(left, BinaryOp::Xor, right));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&ExprToken::Not) {
            let inner = self.nested(Self::unary_expr)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some((token, column)) = self.tokens.get(self.pos).cloned() else {
            return Err(ExprError::Syntax {
                column: self.end_column,
                message: "unexpected end of expression".to_string(),
            });
        };
        self.pos += 1;
        match token {
            ExprToken::Constant(value) => Ok(Expr::Constant(value)),
            ExprToken::Identifier(name) => Ok(Expr::Variable(name)),
            ExprToken::OpenParen => {
                let inner = self.nested(Self::or_expr)?;
                if !self.eat(&ExprToken::CloseParen) {
                    return Err(ExprError::Syntax {
                        column: self.current_column(),
                        message: "expected ')'".to_string(),
                    });
                }
                Ok(inner)
            }
            other => Err(ExprError::Syntax {
                column,
                message: format!("unexpected {}", describe(&other)),
            }),
        }
    }

    /// Runs `parse` one nesting level deeper, failing at the current token
    /// once [`MAX_NESTING`] is reached.
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::Syntax {
                column: self.current_column(),
                message: "expression nested too deeply".to_string(),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn eat(&mut self, expected: &ExprToken) -> bool {
        match self.tokens.get(self.pos) {
            Some((token, _)) if token == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn current_column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end_column, |(_, column)| *column)
    }
}

fn describe(token: &ExprToken) -> String {
    match token {
        ExprToken::And => "'&&'".to_string(),
        ExprToken::Or => "'||'".to_string(),
        ExprToken::Xor => "'^^'".to_string(),
        ExprToken::Not => "'!'".to_string(),
        ExprToken::OpenParen => "'('".to_string(),
        ExprToken::CloseParen => "')'".to_string(),
        ExprToken::Constant(value) => format!("constant '{value}'"),
        ExprToken::Identifier(name) => format!("identifier '{name}'"),
    }
}
