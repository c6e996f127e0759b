//! Statement parsing.

use super::Parser;
use crate::ast::{Argument, GateCall, Located, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Located<Statement>> {
        let line = self.line();
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        let node = match token {
            Token::Include => self.parse_include()?,
            Token::Qreg => {
                let (name, size) = self.parse_register_decl(Token::Qreg)?;
                Statement::QregDecl { name, size }
            }
            Token::Creg => {
                let (name, size) = self.parse_register_decl(Token::Creg)?;
                Statement::CregDecl { name, size }
            }
            Token::Measure => self.parse_measure()?,
            Token::Reset | Token::Barrier | Token::If | Token::Gate | Token::Opaque => {
                return Err(ParseError::UnsupportedStatement {
                    kind: token.to_string(),
                    line,
                });
            }
            Token::Identifier(_) => Statement::Gate(self.parse_gate_call()?),
            other => return Err(self.unexpected("statement", &other)),
        };

        Ok(Located { line, node })
    }

    /// Parse include statement.
    fn parse_include(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Include)?;
        let path = match self.advance() {
            Some(Token::StringLiteral(s)) => s,
            Some(other) => {
                self.pos -= 1;
                return Err(self.unexpected("string literal", &other));
            }
            None => return Err(ParseError::UnexpectedEof("include path".into())),
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Include(path))
    }

    /// Parse `qreg name[size];` or `creg name[size];`.
    fn parse_register_decl(&mut self, keyword: Token) -> ParseResult<(String, u32)> {
        self.expect(keyword)?;
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let line = self.line();
        let size = self.parse_int_literal()?;
        let size = u32::try_from(size).map_err(|_| ParseError::UnexpectedToken {
            line,
            expected: "register size".into(),
            found: size.to_string(),
        })?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;
        Ok((name, size))
    }

    /// Parse `measure a -> b;`.
    fn parse_measure(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Measure)?;
        let qubit = self.parse_argument()?;
        self.expect(Token::Arrow)?;
        let bit = self.parse_argument()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Measure { qubit, bit })
    }

    /// Parse `name(params) a, b;`.
    fn parse_gate_call(&mut self) -> ParseResult<GateCall> {
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let params = self.parse_expression_list()?;
            self.expect(Token::RParen)?;
            params
        } else {
            vec![]
        };

        let mut args = vec![self.parse_argument()?];
        while self.consume(&Token::Comma) {
            args.push(self.parse_argument()?);
        }
        self.expect(Token::Semicolon)?;

        Ok(GateCall { name, params, args })
    }

    /// Parse `reg` or `reg[expr]`.
    fn parse_argument(&mut self) -> ParseResult<Argument> {
        let register = self.parse_identifier()?;
        if self.consume(&Token::LBracket) {
            let index = self.parse_expression()?;
            self.expect(Token::RBracket)?;
            Ok(Argument::Indexed { register, index })
        } else {
            Ok(Argument::Register(register))
        }
    }
}
