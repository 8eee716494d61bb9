//! Structured parse failures and the caret-annotated source excerpt.

use std::fmt;

use xtend_lexer::{Keyword, LexError, Span, Token, TokenKind};

/// Alternatives accepted where a statement may start.
pub const STATEMENT: &[&str] = &["text", "code"];

/// Keywords accepted after an `IF` or `ELIF` body.
pub const AFTER_BRANCH: &[&str] = &["`ELIF`", "`ELSE`", "`END`"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The lexer ran out of source inside a directive.
    Lex,
    /// The token stream does not match the grammar.
    Syntax,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Lex => f.write_str("Lex error"),
            ErrorKind::Syntax => f.write_str("Syntax error"),
        }
    }
}

/// What the parser was looking for when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Keyword(Keyword),
    /// A single construct, e.g. `code`.
    Construct(&'static str),
    AnyOf(&'static [&'static str]),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Keyword(kw) => write!(f, "`{kw}`"),
            Expected::Construct(what) => f.write_str(what),
            Expected::AnyOf(options) => write!(f, "one of {}", options.join(", ")),
        }
    }
}

/// The first structural violation found in a template. Parsing stops here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at {span}: expected {expected}, found {found}", found = describe_found(.got))]
pub struct ParseError {
    pub kind: ErrorKind,
    pub span: Span,
    pub expected: Expected,
    /// Kind of the offending token, `None` when the source simply ran out.
    pub got: Option<TokenKind>,
}

impl ParseError {
    /// A grammar violation at `got`.
    pub fn syntax(expected: Expected, got: &Token) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            span: got.span,
            expected,
            got: Some(got.kind),
        }
    }

    /// Render this error against `source`, see [`format_error`].
    pub fn excerpt(&self, source: &str) -> String {
        format_error(self, source)
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            kind: ErrorKind::Lex,
            span: err.span,
            expected: Expected::Construct("`}`"),
            got: None,
        }
    }
}

fn describe_found(got: &Option<TokenKind>) -> String {
    match got {
        Some(kind) => kind.to_string(),
        None => "end of input".to_string(),
    }
}

/// Reprint `source` line by line, with a marker line of `^` under the columns
/// the error span covers on every line it touches.
///
/// Markers are clipped to each line's text. A span that starts on a line's
/// newline terminator, or at the end of the source, is marked with a single
/// caret one column past the line's last character. A trailing newline does
/// not produce an extra empty line.
pub fn format_error(error: &ParseError, source: &str) -> String {
    let start = error.span.start;
    let end = error.span.end.max(start + 1);

    let mut lines: Vec<&str> = source.split('\n').collect();
    if lines.len() > 1 && lines.last() == Some(&"") {
        lines.pop();
    }
    let last = lines.len() - 1;

    let mut out = String::new();
    let mut line_start = 0;

    for (index, line) in lines.into_iter().enumerate() {
        let text_end = line_start + line.len();
        let line_end = text_end + 1;

        out.push_str(line);
        out.push('\n');

        let starts_here = start >= line_start && (start < line_end || index == last);
        let continues_here = start < line_start && end > line_start;
        if starts_here || continues_here {
            let (from, width) = if start >= text_end {
                (line.chars().count(), 1)
            } else {
                let from = column_of(line, start.max(line_start) - line_start);
                let to = column_of(line, end.min(text_end) - line_start);
                (from, to.saturating_sub(from).max(1))
            };
            out.push_str(&" ".repeat(from));
            out.push_str(&"^".repeat(width));
            out.push('\n');
        }

        line_start = line_end;
    }

    out
}

/// Character column of a byte offset within `line`.
fn column_of(line: &str, offset: usize) -> usize {
    line.get(..offset)
        .map_or_else(|| line.chars().count(), |prefix| prefix.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn error_at(start: usize, end: usize) -> ParseError {
        ParseError {
            kind: ErrorKind::Syntax,
            span: Span::new(start, end, 1, 1),
            expected: Expected::Construct("code"),
            got: Some(TokenKind::Newline),
        }
    }

    // =========================================================================
    // Excerpts
    // =========================================================================

    #[test]
    fn test_marks_newline_after_line() {
        let source = "\n{IF c}\ns{ELIF}\n{END}";
        assert_eq!(
            format_error(&error_at(15, 16), source),
            "\n{IF c}\ns{ELIF}\n       ^\n{END}\n"
        );
    }

    #[test]
    fn test_marks_multi_column_span() {
        assert_eq!(
            format_error(&error_at(7, 13), "prefix { rest"),
            "prefix { rest\n       ^^^^^^\n"
        );
    }

    #[test]
    fn test_span_across_lines_marks_each_line() {
        assert_eq!(
            format_error(&error_at(2, 6), "ab{c\nde"),
            "ab{c\n  ^^\nde\n^\n"
        );
    }

    #[test]
    fn test_unterminated_span_is_clipped_to_each_line() {
        assert_eq!(
            format_error(&error_at(1, 6), "a{IF\nc"),
            "a{IF\n ^^^\nc\n^\n"
        );
    }

    #[test]
    fn test_trailing_newline_adds_no_line() {
        assert_eq!(format_error(&error_at(1, 2), "ab\n"), "ab\n ^\n");
    }

    #[test]
    fn test_end_of_input_after_trailing_newline() {
        assert_eq!(format_error(&error_at(4, 4), "abc\n"), "abc\n   ^\n");
    }

    #[test]
    fn test_zero_width_span_at_end() {
        assert_eq!(format_error(&error_at(3, 3), "abc"), "abc\n   ^\n");
    }

    #[test]
    fn test_columns_count_characters() {
        // `é` is two bytes wide.
        assert_eq!(format_error(&error_at(3, 4), "éab"), "éab\n  ^\n");
    }

    #[test]
    fn test_lines_outside_span_have_no_marker() {
        let out = format_error(&error_at(4, 5), "one\ntwo\nthree");
        assert_eq!(out, "one\ntwo\n^\nthree\n");
    }

    // =========================================================================
    // Messages
    // =========================================================================

    #[test]
    fn test_syntax_message() {
        let err = ParseError {
            kind: ErrorKind::Syntax,
            span: Span::new(13, 14, 1, 14),
            expected: Expected::Construct("code"),
            got: Some(TokenKind::Newline),
        };
        assert_eq!(
            err.to_string(),
            "Syntax error at line 1, column 14: expected code, found newline"
        );
    }

    #[test]
    fn test_lex_error_conversion() {
        let err = ParseError::from(LexError {
            span: Span::new(7, 13, 1, 8),
        });
        assert_eq!(err.kind, ErrorKind::Lex);
        assert_eq!(err.got, None);
        assert_eq!(
            err.to_string(),
            "Lex error at line 1, column 8: expected `}`, found end of input"
        );
    }

    #[test]
    fn test_any_of_message() {
        assert_eq!(
            Expected::AnyOf(AFTER_BRANCH).to_string(),
            "one of `ELIF`, `ELSE`, `END`"
        );
    }
}
