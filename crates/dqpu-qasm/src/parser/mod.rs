//! Parser for the OpenQASM 2 dialect.

mod expression;
mod lowering;
mod statement;

pub(crate) use lowering::lower_to_circuit;

use dqpu_ir::Circuit;

use crate::ast::Program;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse circuit text into a [`Circuit`].
pub fn parse(source: &str) -> ParseResult<Circuit> {
    let program = parse_ast(source)?;
    lower_to_circuit(&program)
}

/// Parse circuit text into an AST without lowering it.
pub fn parse_ast(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

/// Parser state.
pub(super) struct Parser {
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
}

impl Parser {
    fn new(source: &str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((line, message)) => return Err(ParseError::LexerError { line, message }),
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Line of the current token, or of the last token at end of input.
    pub(super) fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let line = self.line();
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(ParseError::UnexpectedToken {
                line,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Check if current token matches.
    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn unexpected(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Parse the entire program.
    fn parse_program(&mut self) -> ParseResult<Program> {
        let version = if self.consume(&Token::OpenQasm) {
            let version = self.parse_version()?;
            self.expect(Token::Semicolon)?;
            Some(version)
        } else {
            None
        };

        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program {
            version,
            statements,
        })
    }

    /// Parse version number; only `2.0` is accepted.
    fn parse_version(&mut self) -> ParseResult<String> {
        let version = match self.advance() {
            Some(Token::FloatLiteral(v)) => format!("{v:.1}"),
            Some(Token::IntLiteral(v)) => format!("{v}.0"),
            Some(other) => return Err(ParseError::InvalidVersion(other.to_string())),
            None => return Err(ParseError::UnexpectedEof("version number".into())),
        };
        if version != "2.0" {
            return Err(ParseError::InvalidVersion(version));
        }
        Ok(version)
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => {
                self.pos -= 1;
                Err(self.unexpected("identifier", &other))
            }
            None => Err(ParseError::UnexpectedEof("identifier".into())),
        }
    }

    /// Parse an integer literal.
    pub(super) fn parse_int_literal(&mut self) -> ParseResult<u64> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(other) => {
                self.pos -= 1;
                Err(self.unexpected("integer", &other))
            }
            None => Err(ParseError::UnexpectedEof("integer".into())),
        }
    }
}
