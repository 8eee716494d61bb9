use crate::token::{Keyword, Span, Token, TokenKind};
use crate::LexError;

const INDENT: &str = "    ";

/// Scanner mode determines how characters are grouped into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerMode {
    /// Literal output. Keywords are plain text here.
    Text,
    /// Between an unescaped `{` and its matching `}`.
    Directive,
}

/// Template lexer.
///
/// Pulls tokens from the source on demand. Starts in [`LexerMode::Text`];
/// an unescaped `{` switches to [`LexerMode::Directive`] and an unescaped `}`
/// switches back. Neither brace is emitted. `{{` and `}}` stand for literal
/// braces in both modes.
///
/// The stream always ends with a single `EndOfInput` token, unless a
/// directive is still open when the source runs out, in which case the last
/// item is a [`LexError`]. Either way the lexer is exhausted afterwards.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    mode: LexerMode,
    /// Span of the `{` that opened the current directive.
    directive_open: Option<Span>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            mode: LexerMode::Text,
            directive_open: None,
            finished: false,
        }
    }

    pub fn mode(&self) -> LexerMode {
        self.mode
    }

    /// Produce the next token, `Ok(None)` once `EndOfInput` has been returned.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        while !self.finished {
            let token = match self.mode {
                LexerMode::Text => self.scan_text_mode(),
                LexerMode::Directive => self.scan_directive_mode()?,
            };

            if let Some(token) = token {
                tracing::trace!(
                    kind = ?token.kind,
                    text = %token.text,
                    start = token.span.start,
                    end = token.span.end,
                    "token"
                );
                return Ok(Some(token));
            }
        }
        Ok(None)
    }

    // --- Modes ---

    fn scan_text_mode(&mut self) -> Option<Token> {
        let start = self.mark();

        if self.is_at_end() {
            self.finished = true;
            return Some(Token::new(TokenKind::EndOfInput, "", self.span_from(start)));
        }

        match self.peek() {
            '\n' => {
                self.advance();
                Some(Token::new(TokenKind::Newline, "\n", self.span_from(start)))
            }
            '\t' => {
                self.advance();
                Some(Token::new(TokenKind::Indent, "\t", self.span_from(start)))
            }
            ' ' if self.rest().starts_with(INDENT) => {
                self.advance_by(INDENT.len());
                Some(Token::new(TokenKind::Indent, INDENT, self.span_from(start)))
            }
            '{' if !self.rest().starts_with("{{") => {
                self.advance();
                self.mode = LexerMode::Directive;
                self.directive_open = Some(self.span_from(start));
                None
            }
            _ => Some(self.scan_text()),
        }
    }

    fn scan_directive_mode(&mut self) -> Result<Option<Token>, LexError> {
        if self.is_at_end() {
            self.finished = true;
            return Err(self.unterminated());
        }

        let start = self.mark();

        if let Some(keyword) = self.keyword_at_cursor() {
            self.advance_by(keyword.as_str().len());
            return Ok(Some(Token::new(
                TokenKind::Keyword(keyword),
                keyword.as_str(),
                self.span_from(start),
            )));
        }

        if self.peek() == '}' && !self.rest().starts_with("}}") {
            self.advance();
            self.mode = LexerMode::Text;
            self.directive_open = None;
            return Ok(None);
        }

        let code = self.scan_code();
        // A blank directive body (`{ }`) produces no token at all.
        if code.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Token::new(TokenKind::Code, code, self.span_from(start))))
    }

    // --- Runs ---

    /// Literal text up to the next newline, indent unit, or unescaped `{`.
    fn scan_text(&mut self) -> Token {
        let start = self.mark();
        let mut value = String::new();

        while !self.is_at_end() {
            if let Some(brace) = self.escaped_brace() {
                value.push(brace);
                self.advance_by(2);
                continue;
            }

            let ch = self.peek();
            if ch == '{' || ch == '\n' || ch == '\t' || self.rest().starts_with(INDENT) {
                break;
            }
            value.push(ch);
            self.advance();
        }

        Token::new(TokenKind::Text, value, self.span_from(start))
    }

    /// Code up to the next keyword or unescaped `}`. Newlines and
    /// indentation are part of the code.
    fn scan_code(&mut self) -> String {
        let mut code = String::new();

        while !self.is_at_end() {
            if let Some(brace) = self.escaped_brace() {
                code.push(brace);
                self.advance_by(2);
                continue;
            }

            if self.peek() == '}' || self.keyword_at_cursor().is_some() {
                break;
            }
            code.push(self.advance());
        }

        code
    }

    /// A keyword starting at the cursor, bounded on both sides by
    /// non-identifier characters.
    fn keyword_at_cursor(&self) -> Option<Keyword> {
        if self.source[..self.pos]
            .chars()
            .next_back()
            .is_some_and(is_identifier_char)
        {
            return None;
        }

        let rest = self.rest();
        Keyword::ALL.into_iter().find(|keyword| {
            let spelling = keyword.as_str();
            rest.starts_with(spelling)
                && !rest[spelling.len()..]
                    .chars()
                    .next()
                    .is_some_and(is_identifier_char)
        })
    }

    fn escaped_brace(&self) -> Option<char> {
        let rest = self.rest();
        if rest.starts_with("{{") {
            Some('{')
        } else if rest.starts_with("}}") {
            Some('}')
        } else {
            None
        }
    }

    fn unterminated(&self) -> LexError {
        let open = self
            .directive_open
            .unwrap_or_else(|| Span::new(self.pos, self.pos, self.line, self.column));
        LexError {
            span: Span::new(open.start, self.source.len(), open.line, open.column),
        }
    }

    // --- Helpers ---

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    /// Advance over `len` bytes of ASCII.
    fn advance_by(&mut self, len: usize) {
        let target = self.pos + len;
        while self.pos < target && !self.is_at_end() {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn mark(&self) -> (usize, usize, usize) {
        (self.pos, self.line, self.column)
    }

    fn span_from(&self, (start, line, column): (usize, usize, usize)) -> Span {
        Span::new(start, self.pos, line, column)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
