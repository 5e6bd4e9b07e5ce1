use crate::expression::ast::{BinaryOp, Expr, Lit, LogicalOp, UnaryOp};
use crate::expression::error::ExprError;
use crate::expression::lexer::{Span, Token, TokenKind, lex};

pub(crate) fn parse_expr(src: &str) -> Result<Expr, ExprError> {
    let trimmed = src.trim_start();
    let offset = src.len() - trimmed.len();
    let tokens = lex(trimmed.trim_end())
        .map_err(|e| ExprError::new(e.offset + offset, e.message))?
        .into_iter()
        .map(|mut t| {
            t.span.start += offset;
            t.span.end += offset;
            t
        })
        .collect::<Vec<_>>();
    if matches!(tokens.first().map(|t| &t.kind), Some(TokenKind::Eof)) {
        return Err(ExprError::new(offset, "empty expression"));
    }
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.parse_conditional()?;
    p.expect(TokenKind::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> &Token {
        let t = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.peek().kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(ExprError::new(
                self.span().start,
                format!("expected {kind:?}, found {:?}", self.peek().kind),
            ))
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExprError> {
        let cond = self.parse_nullish()?;
        if !self.consume(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_conditional()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.parse_conditional()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_nullish(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_or()?;
        while self.consume(TokenKind::QuestionQuestion) {
            let r = self.parse_or()?;
            e = logical(LogicalOp::Nullish, e, r);
        }
        Ok(e)
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_and()?;
        while self.consume(TokenKind::OrOr) {
            let r = self.parse_and()?;
            e = logical(LogicalOp::Or, e, r);
        }
        Ok(e)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_equality()?;
        while self.consume(TokenKind::AndAnd) {
            let r = self.parse_equality()?;
            e = logical(LogicalOp::And, e, r);
        }
        Ok(e)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                TokenKind::EqEqEq => BinaryOp::StrictEq,
                TokenKind::NeEq => BinaryOp::StrictNe,
                _ => break,
            };
            self.bump();
            let r = self.parse_comparison()?;
            e = binary(op, e, r);
        }
        Ok(e)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let r = self.parse_term()?;
            e = binary(op, e, r);
        }
        Ok(e)
    }

    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let r = self.parse_factor()?;
            e = binary(op, e, r);
        }
        Ok(e)
    }

    fn parse_factor(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.bump();
            let r = self.parse_unary()?;
            e = binary(op, e, r);
        }
        Ok(e)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.bump();
        let e = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(e),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_primary()?;

        loop {
            if self.consume(TokenKind::Dot) {
                let t = self.bump().clone();
                let name = match t.kind {
                    TokenKind::Ident(s) => s,
                    // Keywords are valid property names after a dot.
                    TokenKind::True => "true".to_owned(),
                    TokenKind::False => "false".to_owned(),
                    TokenKind::Null => "null".to_owned(),
                    TokenKind::Undefined => "undefined".to_owned(),
                    other => {
                        return Err(ExprError::new(
                            t.span.start,
                            format!("expected property name after '.', found {other:?}"),
                        ));
                    }
                };
                e = Expr::Member {
                    object: Box::new(e),
                    name,
                };
                continue;
            }

            if self.consume(TokenKind::LBracket) {
                let index = self.parse_conditional()?;
                self.expect(TokenKind::RBracket)?;
                e = Expr::Index {
                    object: Box::new(e),
                    index: Box::new(index),
                };
                continue;
            }

            if self.peek().kind == TokenKind::LParen {
                let at = self.span().start;
                let func = match e {
                    Expr::Var(name) => name,
                    _ => {
                        return Err(ExprError::new(at, "call target must be a single identifier"));
                    }
                };
                self.bump();
                let args = self.parse_list(TokenKind::RParen)?;
                e = Expr::Call { func, args };
                continue;
            }

            break;
        }

        Ok(e)
    }

    /// Comma separated expressions up to `close`. A trailing comma is accepted.
    fn parse_list(&mut self, close: TokenKind) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        loop {
            if self.consume(close.clone()) {
                return Ok(items);
            }
            items.push(self.parse_conditional()?);
            if self.consume(TokenKind::Comma) {
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }

    fn parse_object(&mut self) -> Result<Expr, ExprError> {
        let mut entries = Vec::new();
        loop {
            if self.consume(TokenKind::RBrace) {
                return Ok(Expr::Object(entries));
            }
            let t = self.bump().clone();
            let (key, shorthand) = match t.kind {
                TokenKind::Ident(s) => (s, true),
                TokenKind::Str(s) => (s, false),
                TokenKind::Number(n) => (crate::value::format_number(n), false),
                other => {
                    return Err(ExprError::new(
                        t.span.start,
                        format!("expected object key, found {other:?}"),
                    ));
                }
            };
            let value = if self.consume(TokenKind::Colon) {
                self.parse_conditional()?
            } else if shorthand {
                Expr::Var(key.clone())
            } else {
                return Err(ExprError::new(self.span().start, "expected ':' after object key"));
            };
            entries.push((key, value));
            if self.consume(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RBrace)?;
            return Ok(Expr::Object(entries));
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let t = self.bump().clone();
        match t.kind {
            TokenKind::Number(v) => Ok(Expr::Lit(Lit::Number(v))),
            TokenKind::Str(s) => Ok(Expr::Lit(Lit::Str(s))),
            TokenKind::True => Ok(Expr::Lit(Lit::Bool(true))),
            TokenKind::False => Ok(Expr::Lit(Lit::Bool(false))),
            TokenKind::Null => Ok(Expr::Lit(Lit::Null)),
            TokenKind::Undefined => Ok(Expr::Lit(Lit::Undefined)),
            TokenKind::Ident(s) => Ok(Expr::Var(s)),
            TokenKind::LParen => {
                let e = self.parse_conditional()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::LBracket => Ok(Expr::Array(self.parse_list(TokenKind::RBracket)?)),
            TokenKind::LBrace => self.parse_object(),
            other => Err(ExprError::new(
                t.span.start,
                format!("unexpected token {other:?}"),
            )),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/parser.rs"]
mod tests;
