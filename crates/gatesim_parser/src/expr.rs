//! Pratt (operator-precedence) expression parser.
//!
//! Binding powers, tightest first: unary prefix operators, `*`,
//! `+ -`, `<< >>`, relational (`< <= > >=`), equality (`== !=`), `&`,
//! `^`/`^~`, `|`, `&&`, `||`, and finally the right-associative `?:`.
//!
//! `/` and `%` are not part of the accepted grammar; [`Parser::parse_binary`]
//! rejects them explicitly rather than treating them as ordinary infix
//! operators.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::parser::Parser;
use crate::token::{LiteralBase, SvToken};

impl Parser<'_> {
    /// Parses a full expression, including the ternary operator.
    pub(crate) fn parse_expr(&mut self) -> Expr {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Expr {
        let cond = self.parse_binary(0);
        if self.eat(&SvToken::Question) {
            let then_expr = self.parse_ternary();
            self.expect(&SvToken::Colon);
            // Right-associative: the else branch may itself contain `?:`.
            let else_expr = self.parse_ternary();
            let span = cond.span().merge(else_expr.span());
            Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                span,
            }
        } else {
            cond
        }
    }

    fn parse_binary(&mut self, min_bp: u8) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            if matches!(self.peek(), SvToken::Slash | SvToken::Percent) {
                let op_span = self.peek_span();
                self.error_here("division and modulo ('/', '%') are not supported");
                self.bump();
                let rhs = self.parse_binary(11);
                lhs = Expr::Error(lhs.span().merge(rhs.span()).merge(op_span));
                continue;
            }
            let Some((op, left_bp, right_bp)) = infix_binding_power(self.peek()) else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(right_bp);
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        let start = self.peek_span();
        let op = match self.peek() {
            SvToken::Plus => Some(UnaryOp::Plus),
            SvToken::Minus => Some(UnaryOp::Neg),
            SvToken::Tilde => Some(UnaryOp::BitNot),
            SvToken::Bang => Some(UnaryOp::LogicalNot),
            SvToken::Amp => Some(UnaryOp::ReduceAnd),
            SvToken::Pipe => Some(UnaryOp::ReduceOr),
            SvToken::Caret => Some(UnaryOp::ReduceXor),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_postfix();
        };
        self.bump();
        let operand = self.parse_unary();
        let span = start.merge(operand.span());
        Expr::Unary {
            op,
            expr: Box::new(operand),
            span,
        }
    }

    /// Parses a primary expression followed by an optional index or
    /// part-select suffix (`ident[i]`, `ident[hi:lo]`).
    fn parse_postfix(&mut self) -> Expr {
        let primary = self.parse_primary();
        if !self.check(&SvToken::LBracket) {
            return primary;
        }
        let base = match &primary {
            Expr::Ident(name, _) => name.clone(),
            _ => {
                self.error_here("index/part-select may only follow a plain identifier");
                return primary;
            }
        };
        let start = primary.span();
        self.bump(); // '['
        let first = self.parse_expr();
        if self.eat(&SvToken::Colon) {
            let lo = self.parse_expr();
            let end = self.expect(&SvToken::RBracket);
            Expr::PartSelect {
                base,
                hi: Box::new(first),
                lo: Box::new(lo),
                span: start.merge(end),
            }
        } else {
            let end = self.expect(&SvToken::RBracket);
            Expr::Index {
                base,
                index: Box::new(first),
                span: start.merge(end),
            }
        }
    }

    fn parse_primary(&mut self) -> Expr {
        let start = self.peek_span();
        match self.peek().clone() {
            SvToken::Ident(name) => {
                self.bump();
                Expr::Ident(name, start)
            }
            SvToken::UnsizedDecimal(value) => {
                self.bump();
                Expr::Literal {
                    width: None,
                    value,
                    span: start,
                }
            }
            SvToken::SizedLiteral { width, base, digits } => {
                self.bump();
                let value = parse_literal_digits(&digits, base).unwrap_or_else(|| {
                    self.error_here(format!("invalid {base:?} digits '{digits}'"));
                    0
                });
                Expr::Literal {
                    width: Some(width),
                    value,
                    span: start,
                }
            }
            SvToken::LParen => {
                self.bump();
                let inner = self.parse_expr();
                self.expect(&SvToken::RParen);
                inner
            }
            SvToken::LBrace => self.parse_concat(),
            _ => {
                self.error_here(format!("expected expression, found {}", self.peek()));
                let span = self.peek_span();
                if self.peek().starts_expr() || matches!(self.peek(), SvToken::Eof) {
                    // Don't consume tokens that might start a recoverable
                    // construct the caller still wants to see.
                } else {
                    self.bump();
                }
                Expr::Error(span)
            }
        }
    }

    /// Parses either a concatenation `{a, b, c}` or a replication
    /// `{count {a, b, ...}}`: the two share an opening brace, and are only
    /// disambiguated once a second `{` follows the first element with no
    /// intervening comma.
    fn parse_concat(&mut self) -> Expr {
        let start = self.expect(&SvToken::LBrace);
        let first = self.parse_expr();

        if self.check(&SvToken::LBrace) {
            let inner_start = self.peek_span();
            self.bump();
            let mut inner_parts = vec![self.parse_expr()];
            while self.eat(&SvToken::Comma) {
                inner_parts.push(self.parse_expr());
            }
            let inner_end = self.expect(&SvToken::RBrace);
            let value = if inner_parts.len() == 1 {
                inner_parts.into_iter().next().unwrap()
            } else {
                Expr::Concat(inner_parts, inner_start.merge(inner_end))
            };
            let end = self.expect(&SvToken::RBrace);
            return Expr::Replicate {
                count: Box::new(first),
                value: Box::new(value),
                span: start.merge(end),
            };
        }

        let mut parts = vec![first];
        while self.eat(&SvToken::Comma) {
            parts.push(self.parse_expr());
        }
        let end = self.expect(&SvToken::RBrace);
        Expr::Concat(parts, start.merge(end))
    }
}

/// Returns `(operator, left_binding_power, right_binding_power)` for a
/// token that can appear as an infix binary operator, or `None` otherwise.
/// Left-associative operators use `(bp, bp + 1)`; all binary operators here
/// are left-associative (only `?:` is right-associative, handled separately).
fn infix_binding_power(tok: &SvToken) -> Option<(BinaryOp, u8, u8)> {
    let (op, bp) = match tok {
        SvToken::PipePipe => (BinaryOp::LogicalOr, 1),
        SvToken::AmpAmp => (BinaryOp::LogicalAnd, 2),
        SvToken::Pipe => (BinaryOp::Or, 3),
        SvToken::Caret => (BinaryOp::Xor, 4),
        SvToken::Xnor => (BinaryOp::Xnor, 4),
        SvToken::Amp => (BinaryOp::And, 5),
        SvToken::EqEq => (BinaryOp::Eq, 6),
        SvToken::BangEq => (BinaryOp::Neq, 6),
        SvToken::Lt => (BinaryOp::Lt, 7),
        SvToken::LtEq => (BinaryOp::Le, 7),
        SvToken::Gt => (BinaryOp::Gt, 7),
        SvToken::GtEq => (BinaryOp::Ge, 7),
        SvToken::Shl => (BinaryOp::Shl, 8),
        SvToken::Shr => (BinaryOp::Shr, 8),
        SvToken::Plus => (BinaryOp::Add, 9),
        SvToken::Minus => (BinaryOp::Sub, 9),
        SvToken::Star => (BinaryOp::Mul, 10),
        _ => return None,
    };
    Some((op, bp, bp + 1))
}

/// Interprets a sized literal's digit text in the given base, masked to
/// fit within 64 bits. Returns `None` if the digits contain characters
/// invalid for `base` (the lexer already restricts the character set per
/// base, so this mainly guards against an all-underscore empty string).
fn parse_literal_digits(digits: &str, base: LiteralBase) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    let radix = match base {
        LiteralBase::Binary => 2,
        LiteralBase::Hex => 16,
        LiteralBase::Decimal => 10,
    };
    u64::from_str_radix(digits, radix).ok()
}
