//! Parser for the reference expression language.
//!
//! Precedence, loosest first:
//!
//! ```text
//! or  ||
//! and &&
//! not !            (prefix)
//! == != < <= > >=
//! + -
//! * / %
//! -                (prefix)
//! a.b  a[i]  f(x)  (postfix)
//! ```

use crate::evaluator::EvaluationError;
use crate::expr_lexer::{ExprLexer, ExprToken, Lexeme};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Name(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Expression parser.
pub struct ExprParser<'a> {
    source: &'a str,
    tokens: Vec<Lexeme>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    /// Parse a complete expression from a source string.
    pub fn parse(source: &'a str) -> Result<Expr, EvaluationError> {
        let tokens = ExprLexer::tokenize(source)?;
        let mut parser = ExprParser {
            source,
            tokens,
            pos: 0,
        };

        let expr = parser.parse_or()?;
        if *parser.peek() != ExprToken::Eof {
            return Err(parser.unexpected());
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_and()?;
        while self.eat_operator(&ExprToken::OrOr, "or") {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_not()?;
        while self.eat_operator(&ExprToken::AndAnd, "and") {
            let right = self.parse_not()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, EvaluationError> {
        if self.eat_operator(&ExprToken::Bang, "not") {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                ExprToken::EqEq => BinaryOp::Eq,
                ExprToken::NotEq => BinaryOp::NotEq,
                ExprToken::Lt => BinaryOp::Lt,
                ExprToken::Lte => BinaryOp::Lte,
                ExprToken::Gt => BinaryOp::Gt,
                ExprToken::Gte => BinaryOp::Gte,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                ExprToken::Plus => BinaryOp::Add,
                ExprToken::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                ExprToken::Star => BinaryOp::Mul,
                ExprToken::Slash => BinaryOp::Div,
                ExprToken::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, EvaluationError> {
        if *self.peek() == ExprToken::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvaluationError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                ExprToken::Dot => {
                    self.advance();
                    let key = match self.advance() {
                        ExprToken::Ident(name) => name,
                        ExprToken::Int(n) => n.to_string(),
                        _ => return Err(self.unexpected_previous()),
                    };
                    expr = Expr::Member(Box::new(expr), key);
                }
                ExprToken::LBracket => {
                    self.advance();
                    let index = self.parse_or()?;
                    self.expect(&ExprToken::RBracket, "`]`")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvaluationError> {
        match self.advance() {
            ExprToken::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            ExprToken::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            ExprToken::Str(s) => Ok(Expr::Literal(Value::String(s))),
            ExprToken::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "and" | "or" | "not" => Err(self.unexpected_previous()),
                _ if *self.peek() == ExprToken::LParen => {
                    self.advance();
                    let args = self.parse_list(&ExprToken::RParen, "`)`")?;
                    Ok(Expr::Call(name, args))
                }
                _ => Ok(Expr::Name(name)),
            },
            ExprToken::LParen => {
                let inner = self.parse_or()?;
                self.expect(&ExprToken::RParen, "`)`")?;
                Ok(inner)
            }
            ExprToken::LBracket => Ok(Expr::List(self.parse_list(&ExprToken::RBracket, "`]`")?)),
            _ => Err(self.unexpected_previous()),
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    /// The opening delimiter has already been consumed.
    fn parse_list(&mut self, close: &ExprToken, what: &str) -> Result<Vec<Expr>, EvaluationError> {
        let mut items = Vec::new();
        while self.peek() != close {
            items.push(self.parse_or()?);
            if *self.peek() == ExprToken::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(close, what)?;
        Ok(items)
    }

    // --- Helpers ---

    fn peek(&self) -> &ExprToken {
        self.tokens
            .get(self.pos)
            .map_or(&ExprToken::Eof, |lexeme| &lexeme.token)
    }

    fn advance(&mut self) -> ExprToken {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consume either the symbolic or the word form of an operator.
    fn eat_operator(&mut self, symbol: &ExprToken, word: &str) -> bool {
        let matches = match self.peek() {
            ExprToken::Ident(name) => name == word,
            token => token == symbol,
        };
        if matches {
            self.advance();
        }
        matches
    }

    fn expect(&mut self, token: &ExprToken, what: &str) -> Result<(), EvaluationError> {
        if self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {what} at offset {}", self.offset(self.pos))))
        }
    }

    fn unexpected(&self) -> EvaluationError {
        self.error(format!("unexpected token at offset {}", self.offset(self.pos)))
    }

    fn unexpected_previous(&self) -> EvaluationError {
        self.error(format!(
            "unexpected token at offset {}",
            self.offset(self.pos.saturating_sub(1))
        ))
    }

    fn offset(&self, index: usize) -> usize {
        self.tokens
            .get(index)
            .map_or(self.source.len(), |lexeme| lexeme.offset)
    }

    fn error(&self, message: String) -> EvaluationError {
        EvaluationError::Syntax {
            code: self.source.to_string(),
            message,
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary(Box::new(left), op, Box::new(right))
}
