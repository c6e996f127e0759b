//! Expression parsing with precedence climbing.

use super::Parser;
use crate::ast::{BinOp, Expression};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser {
    /// Parse an expression.
    pub(super) fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_expr(0)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op_precedence(op);
            if prec < min_prec {
                break;
            }
            self.pos += 1;

            // `^` is right-associative
            let next = if op == BinOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next)?;
            left = Expression::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expression> {
        if self.consume(&Token::Minus) {
            let expr = self.parse_unary_expr()?;
            return Ok(Expression::Neg(Box::new(expr)));
        }
        if self.consume(&Token::Plus) {
            return self.parse_unary_expr();
        }
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> ParseResult<Expression> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("expression".into()))?;

        match token {
            Token::IntLiteral(v) => {
                self.pos += 1;
                Ok(Expression::Int(v))
            }
            Token::FloatLiteral(v) => {
                self.pos += 1;
                Ok(Expression::Float(v))
            }
            Token::Pi => {
                self.pos += 1;
                Ok(Expression::Pi)
            }
            Token::Identifier(name) => {
                self.pos += 1;
                if self.consume(&Token::LParen) {
                    let args = self.parse_expression_list()?;
                    self.expect(Token::RParen)?;
                    Ok(Expression::FnCall { name, args })
                } else {
                    Ok(Expression::Identifier(name))
                }
            }
            Token::LParen => {
                self.pos += 1;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(Expression::Paren(Box::new(expr)))
            }
            other => Err(self.unexpected("expression", &other)),
        }
    }

    fn peek_binary_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Caret => Some(BinOp::Pow),
            _ => None,
        }
    }

    /// Parse a comma-separated expression list, possibly empty.
    pub(super) fn parse_expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        if self.check(&Token::RParen) {
            return Ok(vec![]);
        }
        let mut exprs = vec![self.parse_expression()?];
        while self.consume(&Token::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }
}

fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => 1,
        BinOp::Mul | BinOp::Div => 2,
        BinOp::Pow => 3,
    }
}
