//! Lexer for the reference expression language.
//!
//! Operates on the code of a single directive, e.g. `user.name` or
//! `len(items) > 0 and not hidden`.

use crate::evaluator::EvaluationError;

/// A token of expression code.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprToken {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),

    /// Names, including the word operators `and`, `or`, `not` and the
    /// literals `true`, `false`, `null`.
    Ident(String),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,

    // Logical
    AndAnd,
    OrOr,
    Bang,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,

    Eof,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: ExprToken,
    pub offset: usize,
}

/// Expression lexer.
pub struct ExprLexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> ExprLexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    /// Tokenize the whole expression, ending with `Eof`.
    pub fn tokenize(source: &str) -> Result<Vec<Lexeme>, EvaluationError> {
        let mut lexer = ExprLexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let lexeme = lexer.next_lexeme()?;
            let done = lexeme.token == ExprToken::Eof;
            tokens.push(lexeme);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_lexeme(&mut self) -> Result<Lexeme, EvaluationError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }

        let offset = self.offset();
        let Some(ch) = self.peek() else {
            return Ok(Lexeme {
                token: ExprToken::Eof,
                offset,
            });
        };
        self.pos += 1;

        let token = match ch {
            '+' => ExprToken::Plus,
            '-' => ExprToken::Minus,
            '*' => ExprToken::Star,
            '/' => ExprToken::Slash,
            '%' => ExprToken::Percent,
            '(' => ExprToken::LParen,
            ')' => ExprToken::RParen,
            '[' => ExprToken::LBracket,
            ']' => ExprToken::RBracket,
            ',' => ExprToken::Comma,
            '.' => ExprToken::Dot,
            '=' if self.eat('=') => ExprToken::EqEq,
            '!' if self.eat('=') => ExprToken::NotEq,
            '!' => ExprToken::Bang,
            '<' if self.eat('=') => ExprToken::Lte,
            '<' => ExprToken::Lt,
            '>' if self.eat('=') => ExprToken::Gte,
            '>' => ExprToken::Gt,
            '&' if self.eat('&') => ExprToken::AndAnd,
            '|' if self.eat('|') => ExprToken::OrOr,
            '"' | '\'' => self.scan_string(ch, offset)?,
            c if c.is_ascii_digit() => self.scan_number(offset)?,
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(offset),
            c => return Err(self.error(format!("unexpected character `{c}` at offset {offset}"))),
        };

        Ok(Lexeme { token, offset })
    }

    fn scan_string(&mut self, quote: char, offset: usize) -> Result<ExprToken, EvaluationError> {
        let mut value = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(self.error(format!("unterminated string starting at offset {offset}")));
            };
            self.pos += 1;
            match ch {
                c if c == quote => return Ok(ExprToken::Str(value)),
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err(self.error("unterminated escape sequence".into()));
                    };
                    self.pos += 1;
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        '\'' => value.push('\''),
                        c => {
                            value.push('\\');
                            value.push(c);
                        }
                    }
                }
                c => value.push(c),
            }
        }
    }

    fn scan_number(&mut self, offset: usize) -> Result<ExprToken, EvaluationError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }

        // A dot followed by a digit continues the number; `1.x` is member access.
        let is_float = self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text = &self.source[offset..self.offset()];
        if is_float {
            text.parse()
                .map(ExprToken::Float)
                .map_err(|_| self.error(format!("invalid number `{text}`")))
        } else {
            text.parse()
                .map(ExprToken::Int)
                .map_err(|_| self.error(format!("integer `{text}` out of range")))
        }
    }

    fn scan_identifier(&mut self, offset: usize) -> ExprToken {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        ExprToken::Ident(self.source[offset..self.offset()].to_string())
    }

    // --- Helpers ---

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Byte offset of the cursor.
    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn error(&self, message: String) -> EvaluationError {
        EvaluationError::Syntax {
            code: self.source.to_string(),
            message,
        }
    }
}
