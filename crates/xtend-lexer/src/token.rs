use std::fmt;

/// A half-open byte range `[start, end)` into the template source, with the
/// line and column of `start` for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Control keywords, recognized only inside a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Elif,
    Else,
    For,
    In,
    Separator,
    End,
}

impl Keyword {
    /// All keywords, in the order the scanner tries them.
    pub const ALL: [Keyword; 7] = [
        Keyword::If,
        Keyword::Else,
        Keyword::Elif,
        Keyword::For,
        Keyword::In,
        Keyword::End,
        Keyword::Separator,
    ];

    /// The exact (case-sensitive) source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "IF",
            Keyword::Elif => "ELIF",
            Keyword::Else => "ELSE",
            Keyword::For => "FOR",
            Keyword::In => "IN",
            Keyword::Separator => "SEPARATOR",
            Keyword::End => "END",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token classification for template source.
///
/// The `{` and `}` that open and close a directive switch the scanner's mode
/// and are never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal output, de-escaped.
    Text,
    Newline,
    /// Four spaces or one tab outside a directive.
    Indent,
    Keyword(Keyword),
    /// Embedded expression code inside a directive.
    Code,
    EndOfInput,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text => f.write_str("text"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Indent => f.write_str("indent"),
            TokenKind::Keyword(kw) => write!(f, "`{kw}`"),
            TokenKind::Code => f.write_str("code"),
            TokenKind::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// A token produced by the template lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// De-escaped value for `Text` and `Code`, the lexeme otherwise.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword) && self.text == keyword.as_str()
    }
}
