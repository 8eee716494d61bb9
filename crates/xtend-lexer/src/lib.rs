//! xtend Lexer
//!
//! Tokenizes template source into a lazy stream of tokens. The scanner
//! alternates between literal text and brace-delimited directives, which hold
//! either control keywords (`IF`, `ELIF`, `ELSE`, `FOR`, `IN`, `SEPARATOR`,
//! `END`) or embedded expression code.
//!
//! # Example
//!
//! ```
//! use xtend_lexer::{tokenize, Keyword, TokenKind};
//!
//! let kinds: Vec<TokenKind> = tokenize("Hi {IF name}{name}{END}")
//!     .map(|t| t.unwrap().kind)
//!     .collect();
//! assert_eq!(kinds[1], TokenKind::Keyword(Keyword::If));
//! assert_eq!(kinds.last(), Some(&TokenKind::EndOfInput));
//! ```

pub mod scanner;
pub mod token;

pub use scanner::{Lexer, LexerMode};
pub use token::{Keyword, Span, Token, TokenKind};

/// A directive was opened with `{` but the source ended before its `}`.
///
/// The span runs from the opening brace to the end of the source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unterminated directive opened at {span}")]
pub struct LexError {
    pub span: Span,
}

/// Start lexing `source`. Tokens are produced on demand; re-invoke to restart.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer::new(source)
}
