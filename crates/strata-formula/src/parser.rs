//! Recursive-descent parser for the formula grammar.
//!
//! Precedence, loosest to tightest: `OR`, `AND`, comparison, `+ -`,
//! `* /`, `^` (right-associative), unary minus. Unary minus binds
//! tighter than `^`, so `-2^2 == 4`.

use crate::ast::{BinaryOp, CompareOp, Expr, LogicalOp, RefExpr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::check_call;
use crate::token::{tokenize, Token, TokenKind};

/// Parse a formula string into an expression tree.
///
/// Call arity and string-literal placement are validated here, so a parsed
/// expression is structurally sound; only reference resolution is deferred
/// to evaluation.
pub fn parse_formula(source: &str) -> FormulaResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source_len: source.len(),
    };
    let expr = parser.or_expr()?;
    if let Some(token) = parser.peek() {
        return Err(FormulaError::parse(
            token.position,
            format!("unexpected trailing input: {:?}", token.kind),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.source_len, |t| t.position)
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> FormulaResult<()> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(FormulaError::parse(self.position(), format!("expected {}", what))),
        }
    }

    fn or_expr(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.and_expr()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Or)) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.comparison()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::And)) {
            self.pos += 1;
            let rhs = self.comparison()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> FormulaResult<Expr> {
        let lhs = self.expr()?;
        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Lt) => CompareOp::Lt,
            Some(TokenKind::Le) => CompareOp::Le,
            Some(TokenKind::EqEq) => CompareOp::Eq,
            Some(TokenKind::Ne) => CompareOp::Ne,
            Some(TokenKind::Ge) => CompareOp::Ge,
            Some(TokenKind::Gt) => CompareOp::Gt,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.expr()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn expr(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.power()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.power()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    // Right-associative: 2^3^2 == 2^(3^2).
    fn power(&mut self) -> FormulaResult<Expr> {
        let base = self.unary()?;
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Caret)) {
            self.pos += 1;
            let exponent = self.power()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn unary(&mut self) -> FormulaResult<Expr> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Minus)) {
            self.pos += 1;
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.factor()
    }

    fn factor(&mut self) -> FormulaResult<Expr> {
        let position = self.position();
        match self.advance().map(|t| t.kind) {
            Some(TokenKind::Number(value)) => Ok(Expr::Number(value)),
            Some(TokenKind::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            Some(TokenKind::Ident(name)) => {
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    self.call(name, position)
                } else {
                    self.reference(name)
                }
            }
            Some(TokenKind::Str(_)) => Err(FormulaError::parse(
                position,
                "string literal is only allowed as a dispatcher argument",
            )),
            Some(kind) => Err(FormulaError::parse(
                position,
                format!("unexpected token {:?}", kind),
            )),
            None => Err(FormulaError::parse(position, "unexpected end of formula")),
        }
    }

    fn call(&mut self, function: String, position: usize) -> FormulaResult<Expr> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        loop {
            if let Some(TokenKind::Str(s)) = self.peek().map(|t| t.kind.clone()) {
                self.pos += 1;
                args.push(Expr::Str(s));
            } else {
                args.push(self.or_expr()?);
            }
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(TokenKind::RParen) => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(FormulaError::parse(self.position(), "expected ',' or ')'"));
                }
            }
        }
        check_call(&function, &args, position)?;
        Ok(Expr::Call { function, args })
    }

    fn reference(&mut self, qualified: String) -> FormulaResult<Expr> {
        let (namespace, name) = match qualified.split_once(':') {
            Some((ns, name)) => (Some(ns.to_string()), name.to_string()),
            None => (None, qualified),
        };
        let shift = if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LBracket)) {
            self.pos += 1;
            self.time_shift()?
        } else {
            0
        };
        Ok(Expr::Ref(RefExpr {
            namespace,
            name,
            shift,
        }))
    }

    // After the '[': expects `t` ('+' | '-') integer ']'.
    fn time_shift(&mut self) -> FormulaResult<i32> {
        let position = self.position();
        match self.advance().map(|t| t.kind) {
            Some(TokenKind::Ident(t)) if t == "t" => {}
            _ => return Err(FormulaError::parse(position, "expected 't' in time shift")),
        }
        let sign = match self.advance().map(|t| t.kind) {
            Some(TokenKind::Plus) => 1,
            Some(TokenKind::Minus) => -1,
            _ => {
                return Err(FormulaError::parse(
                    self.position(),
                    "expected '+' or '-' in time shift",
                ))
            }
        };
        let position = self.position();
        let magnitude = match self.advance().map(|t| t.kind) {
            Some(TokenKind::Number(n)) if n.fract() == 0.0 && n >= 0.0 => n as i32,
            _ => {
                return Err(FormulaError::parse(
                    position,
                    "expected integer offset in time shift",
                ))
            }
        };
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(sign * magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 = 7, not 9
        let expr = parse_formula("1 + 2 * 3").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_power_right_associative() {
        let expr = parse_formula("2 ^ 3 ^ 2").unwrap();
        let Expr::Binary { op: BinaryOp::Pow, rhs, .. } = expr else {
            panic!("expected power at top");
        };
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn test_time_shift_parsing() {
        let expr = parse_formula("CASH[t-1] + CF_NET").unwrap();
        let refs = expr.references();
        assert_eq!(refs[0].shift, -1);
        assert_eq!(refs[1].shift, 0);
    }

    #[test]
    fn test_namespace_parsing() {
        let expr = parse_formula("bs:CASH - pl:NET_INCOME").unwrap();
        let refs = expr.references();
        assert_eq!(refs[0].namespace.as_deref(), Some("bs"));
        assert_eq!(refs[0].name, "CASH");
    }

    #[test]
    fn test_if_with_condition() {
        let expr = parse_formula("IF(REVENUE > 100000, 1, 0)").unwrap();
        let Expr::Call { function, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(function, "IF");
        assert_eq!(args.len(), 3);
        assert!(matches!(args[0], Expr::Compare { .. }));
    }

    #[test]
    fn test_and_or_precedence() {
        // AND binds tighter than OR
        let expr = parse_formula("A > 1 OR B > 2 AND C > 3").unwrap();
        assert!(matches!(
            expr,
            Expr::Logical {
                op: LogicalOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_tax_compute_accepts_string() {
        let expr = parse_formula("TAX_COMPUTE(PRETAX_INCOME, 'flat_rate', 0.25)").unwrap();
        let Expr::Call { args, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(args[1], Expr::Str("flat_rate".to_string()));
    }

    #[test]
    fn test_string_rejected_in_arithmetic() {
        assert!(parse_formula("1 + 'nope'").is_err());
        assert!(parse_formula("SUM(A, 'nope')").is_err());
    }

    #[test]
    fn test_unknown_function_rejected() {
        let err = parse_formula("FOO(1)").unwrap_err();
        assert!(matches!(err, FormulaError::ParseError { .. }));
    }

    #[test]
    fn test_arity_errors() {
        assert!(parse_formula("ABS(1, 2)").is_err());
        assert!(parse_formula("IF(A > 1, 2)").is_err());
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(parse_formula("1 + 2 3").is_err());
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_power() {
        // -2^2 parses as (-2)^2
        let expr = parse_formula("-2 ^ 2").unwrap();
        let Expr::Binary { op: BinaryOp::Pow, lhs, .. } = expr else {
            panic!("expected power at top");
        };
        assert!(matches!(*lhs, Expr::Unary { .. }));
    }

    proptest::proptest! {
        // Any value the engine might print back into a wrapped formula
        // must survive a parse round trip.
        #[test]
        fn prop_numeric_literals_round_trip(value in -1.0e12_f64..1.0e12) {
            let expr = parse_formula(&format!("{}", value)).unwrap();
            let parsed = match expr {
                Expr::Number(n) => n,
                Expr::Unary { op: crate::ast::UnaryOp::Neg, expr } => match *expr {
                    Expr::Number(n) => -n,
                    other => panic!("unexpected literal shape: {:?}", other),
                },
                other => panic!("unexpected literal shape: {:?}", other),
            };
            proptest::prop_assert_eq!(parsed, value);
        }
    }
}
