//! Template parser for xtend.
//!
//! Pulls tokens from the lexer one at a time and builds a [`Sequence`] by
//! recursive descent:
//!
//! ```text
//! root     := sequence EndOfInput
//! sequence := stmt+
//! stmt     := text-run | code | if | for
//! text-run := (Text | Indent | Newline)+
//! if       := IF code sequence (ELIF code sequence)* (ELSE sequence)? END
//! for      := FOR code IN code (SEPARATOR code)? sequence END
//! ```
//!
//! Every alternative starts with a distinct token, so one token of lookahead
//! is enough and nothing is ever backtracked. The first mismatch aborts the
//! parse.

use crate::ast::{Branch, Conditional, Loop, Node, Sequence};
use crate::error::{Expected, ParseError, AFTER_BRANCH, STATEMENT};
use xtend_lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// xtend template parser.
pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    /// Create a new parser over the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            lookahead: None,
        }
    }

    /// Parse a complete template into its root sequence.
    pub fn parse(source: &str) -> Result<Sequence, ParseError> {
        tracing::debug!(bytes = source.len(), "parsing template");
        let root = Parser::new(source).parse_root()?;
        tracing::debug!(nodes = root.node_count(), "parsed template");
        Ok(root)
    }

    /// Parse the root sequence and require the whole source to be consumed.
    pub fn parse_root(&mut self) -> Result<Sequence, ParseError> {
        let root = self.parse_sequence()?;

        let token = self.advance()?;
        if token.kind != TokenKind::EndOfInput {
            return Err(ParseError::syntax(Expected::Construct("end of input"), &token));
        }
        Ok(root)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// One or more statements, stopping at the first token that cannot start
    /// one (a closing keyword, a stray keyword, or the end of input).
    fn parse_sequence(&mut self) -> Result<Sequence, ParseError> {
        let mut children = Vec::new();

        loop {
            let kind = self.peek()?.kind;
            let node = match kind {
                TokenKind::Text | TokenKind::Indent | TokenKind::Newline => self.parse_text()?,
                TokenKind::Code => Node::Expression(self.parse_code()?),
                TokenKind::Keyword(Keyword::If) => self.parse_if()?,
                TokenKind::Keyword(Keyword::For) => self.parse_for()?,
                _ => break,
            };
            children.push(node);
        }

        if children.is_empty() {
            return Err(self.unexpected(Expected::AnyOf(STATEMENT)));
        }
        Ok(Sequence::new(children))
    }

    /// Adjacent text, indent and newline tokens merged into one node.
    fn parse_text(&mut self) -> Result<Node, ParseError> {
        let mut value = self.advance()?.text;
        while matches!(
            self.peek()?.kind,
            TokenKind::Text | TokenKind::Indent | TokenKind::Newline
        ) {
            value.push_str(&self.advance()?.text);
        }
        Ok(Node::Text(value))
    }

    /// `IF code sequence (ELIF code sequence)* (ELSE sequence)? END`
    fn parse_if(&mut self) -> Result<Node, ParseError> {
        self.parse_keyword(Keyword::If)?;

        let mut branches = vec![self.parse_branch()?];
        let mut else_body = None;

        loop {
            let kind = self.peek()?.kind;
            match kind {
                TokenKind::Keyword(Keyword::End) => break,
                // After ELSE only END may follow; a second ELSE or a late
                // ELIF lands here.
                _ if else_body.is_some() => {
                    return Err(self.unexpected(Expected::Keyword(Keyword::End)));
                }
                TokenKind::Keyword(Keyword::Elif) => {
                    self.advance()?;
                    branches.push(self.parse_branch()?);
                }
                TokenKind::Keyword(Keyword::Else) => {
                    self.advance()?;
                    else_body = Some(self.parse_sequence()?);
                }
                _ => return Err(self.unexpected(Expected::AnyOf(AFTER_BRANCH))),
            }
        }

        self.parse_keyword(Keyword::End)?;
        Ok(Node::Conditional(Conditional {
            branches,
            else_body,
        }))
    }

    fn parse_branch(&mut self) -> Result<Branch, ParseError> {
        let condition = self.parse_code()?;
        let body = self.parse_sequence()?;
        Ok(Branch { condition, body })
    }

    /// `FOR code IN code (SEPARATOR code)? sequence END`
    fn parse_for(&mut self) -> Result<Node, ParseError> {
        self.parse_keyword(Keyword::For)?;
        let var = self.parse_code()?;
        self.parse_keyword(Keyword::In)?;
        let iterable = self.parse_code()?;

        let separator = if self.peek()?.is_keyword(Keyword::Separator) {
            self.advance()?;
            Some(self.parse_code()?)
        } else {
            None
        };

        let body = self.parse_sequence()?;
        self.parse_keyword(Keyword::End)?;

        Ok(Node::Loop(Loop {
            var,
            iterable,
            separator,
            body,
        }))
    }

    // =========================================================================
    // Terminals
    // =========================================================================

    /// Exactly one `Code` token, trimmed.
    fn parse_code(&mut self) -> Result<String, ParseError> {
        let token = self.advance()?;
        let code = token.text.trim();
        if token.kind != TokenKind::Code || code.is_empty() {
            return Err(ParseError::syntax(Expected::Construct("code"), &token));
        }
        Ok(code.to_string())
    }

    /// A keyword token whose kind and spelling both match `expected`.
    fn parse_keyword(&mut self, expected: Keyword) -> Result<Token, ParseError> {
        let token = self.advance()?;
        if !token.is_keyword(expected) {
            return Err(ParseError::syntax(Expected::Keyword(expected), &token));
        }
        Ok(token)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// An error against the lookahead token, which is left in place.
    fn unexpected(&mut self, expected: Expected) -> ParseError {
        match self.peek() {
            Ok(token) => ParseError::syntax(expected, token),
            Err(err) => err,
        }
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        let token = match self.lookahead.take() {
            Some(token) => token,
            None => self.pull()?,
        };
        Ok(self.lookahead.insert(token))
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.pull(),
        }
    }

    fn pull(&mut self) -> Result<Token, ParseError> {
        match self.lexer.next_token()? {
            Some(token) => Ok(token),
            None => Ok(Token::new(TokenKind::EndOfInput, "", self.end_span())),
        }
    }

    /// Zero-width span at the end of the source.
    fn end_span(&self) -> Span {
        let last_line = self.source.rsplit('\n').next().unwrap_or_default();
        let line = self.source.matches('\n').count() + 1;
        let column = last_line.chars().count() + 1;
        Span::new(self.source.len(), self.source.len(), line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Sequence {
        Parser::parse(source).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::parse(source).unwrap_err()
    }

    /// Helper: the variant name of each top-level node.
    fn shape(source: &str) -> Vec<&'static str> {
        parse(source)
            .iter()
            .map(|node| match node {
                Node::Sequence(_) => "sequence",
                Node::Text(_) => "text",
                Node::Expression(_) => "expr",
                Node::Conditional(_) => "if",
                Node::Loop(_) => "for",
            })
            .collect()
    }

    fn text(value: &str) -> Node {
        Node::Text(value.to_string())
    }

    fn expr(code: &str) -> Node {
        Node::Expression(code.to_string())
    }

    fn first_conditional(seq: &Sequence) -> &Conditional {
        match &seq.children[0] {
            Node::Conditional(cond) => cond,
            other => panic!("Expected Conditional, got {other:?}"),
        }
    }

    fn first_loop(seq: &Sequence) -> &Loop {
        match &seq.children[0] {
            Node::Loop(lp) => lp,
            other => panic!("Expected Loop, got {other:?}"),
        }
    }

    // =========================================================================
    // Text and expressions
    // =========================================================================

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("class"), Sequence::new(vec![text("class")]));
    }

    #[test]
    fn test_expression() {
        assert_eq!(
            parse("class {name}:"),
            Sequence::new(vec![text("class "), expr("name"), text(":")])
        );
    }

    #[test]
    fn test_expression_code_is_trimmed() {
        assert_eq!(parse("{  user.name  }"), Sequence::new(vec![expr("user.name")]));
    }

    #[test]
    fn test_text_run_merges_whitespace_tokens() {
        assert_eq!(
            parse("a\n    b\tc"),
            Sequence::new(vec![text("a\n    b\tc")])
        );
    }

    #[test]
    fn test_escapes_in_text() {
        assert_eq!(parse("{{x}}"), Sequence::new(vec![text("{x}")]));
    }

    #[test]
    fn test_blank_directive_disappears() {
        assert_eq!(parse("a{ }b"), Sequence::new(vec![text("ab")]));
    }

    // =========================================================================
    // Conditionals
    // =========================================================================

    #[test]
    fn test_if() {
        assert_eq!(shape("class name{IF base}(base){END}:"), vec!["text", "if", "text"]);

        let seq = parse("{IF base}(base){END}");
        let cond = first_conditional(&seq);
        assert_eq!(cond.branches.len(), 1);
        assert_eq!(cond.branches[0].condition, "base");
        assert_eq!(cond.branches[0].body, Sequence::new(vec![text("(base)")]));
        assert_eq!(cond.else_body, None);
    }

    #[test]
    fn test_if_elif_else() {
        let seq = parse("{IF a}1{ELIF b}2{ELIF c}3{ELSE}4{END}");
        let cond = first_conditional(&seq);
        let conditions: Vec<&str> = cond.branches.iter().map(|b| b.condition.as_str()).collect();
        assert_eq!(conditions, vec!["a", "b", "c"]);
        assert_eq!(cond.else_body, Some(Sequence::new(vec![text("4")])));
    }

    #[test]
    fn test_if_else() {
        assert_eq!(shape("{IF c}s{ELSE}s{END}"), vec!["if"]);
    }

    #[test]
    fn test_multiline_if() {
        let source = "\n        {IF c}\n            s\n        {END}\n    ";
        assert_eq!(shape(source), vec!["text", "if", "text"]);
    }

    #[test]
    fn test_nested_if_in_for() {
        let seq = parse("{FOR x IN xs}{IF x}{x}{END}{END}");
        let lp = first_loop(&seq);
        assert!(matches!(lp.body.children[0], Node::Conditional(_)));
        assert_eq!(seq.node_count(), 3);
    }

    // =========================================================================
    // Loops
    // =========================================================================

    #[test]
    fn test_for() {
        let seq = parse("{FOR item IN list}{item}{END}");
        let lp = first_loop(&seq);
        assert_eq!(lp.var, "item");
        assert_eq!(lp.iterable, "list");
        assert_eq!(lp.separator, None);
        assert_eq!(lp.body, Sequence::new(vec![expr("item")]));
    }

    #[test]
    fn test_for_with_separator() {
        let seq = parse("{FOR x IN [1,2,3] SEPARATOR \",\"}{x}{END}");
        let lp = first_loop(&seq);
        assert_eq!(lp.iterable, "[1,2,3]");
        assert_eq!(lp.separator.as_deref(), Some("\",\""));
    }

    // =========================================================================
    // Rejections
    // =========================================================================

    #[test]
    fn test_elif_without_code() {
        let err = parse_err("{IF c}s{ELIF}s{END}");
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.expected, Expected::Construct("code"));
        assert_eq!(err.got, Some(TokenKind::Text));
    }

    #[test]
    fn test_error_position_is_exact() {
        let err = parse_err("{IF c}s{ELIF}\n{END}");
        assert_eq!(err.span, Span::new(13, 14, 1, 14));
        assert_eq!(err.got, Some(TokenKind::Newline));
    }

    #[test]
    fn test_double_else() {
        let err = parse_err("{IF c}s{ELSE}s{ELSE}s{END}");
        assert_eq!(err.expected, Expected::Keyword(Keyword::End));
        assert_eq!(err.got, Some(TokenKind::Keyword(Keyword::Else)));
    }

    #[test]
    fn test_elif_after_else() {
        let err = parse_err("{IF c}s{ELSE}s{ELIF d}s{END}");
        assert_eq!(err.expected, Expected::Keyword(Keyword::End));
    }

    #[test]
    fn test_if_without_end() {
        let err = parse_err("{IF c}s{ELSE}s");
        assert_eq!(err.expected, Expected::Keyword(Keyword::End));
        assert_eq!(err.got, Some(TokenKind::EndOfInput));
    }

    #[test]
    fn test_empty_bodies() {
        for source in [
            "{IF c}{END}",
            "{IF c}s{ELIF c}{END}",
            "{IF c}s{ELSE}{END}",
            "{FOR x IN xs}{END}",
            "{IF c}",
        ] {
            let err = parse_err(source);
            assert_eq!(err.expected, Expected::AnyOf(STATEMENT), "{source}");
        }
    }

    #[test]
    fn test_if_with_blank_condition() {
        let err = parse_err("{IF }s{END}");
        assert_eq!(err.expected, Expected::Construct("code"));
        assert_eq!(err.got, Some(TokenKind::Text));
    }

    #[test]
    fn test_closing_keyword_without_opening() {
        assert_eq!(parse_err("{END}").expected, Expected::AnyOf(STATEMENT));
        for source in ["s{END}", "s{ELIF}", "s{ELSE}t"] {
            let err = parse_err(source);
            assert_eq!(err.expected, Expected::Construct("end of input"), "{source}");
        }
    }

    #[test]
    fn test_keyword_in_place_of_code() {
        let err = parse_err("{FOR IN xs}x{END}");
        assert_eq!(err.expected, Expected::Construct("code"));
        assert_eq!(err.got, Some(TokenKind::Keyword(Keyword::In)));
    }

    #[test]
    fn test_wrong_keyword_is_rejected() {
        let err = parse_err("{FOR x SEPARATOR xs}x{END}");
        assert_eq!(err.expected, Expected::Keyword(Keyword::In));
        assert_eq!(err.got, Some(TokenKind::Keyword(Keyword::Separator)));
    }

    #[test]
    fn test_unexpected_keyword_after_branch() {
        let err = parse_err("{IF c}s{IN}");
        assert_eq!(err.expected, Expected::AnyOf(AFTER_BRANCH));
    }

    #[test]
    fn test_unterminated_directive() {
        let err = parse_err("something { inbalanced");
        assert_eq!(err.kind, ErrorKind::Lex);
        assert_eq!(err.span.start, 10);
    }

    #[test]
    fn test_empty_template() {
        let err = parse_err("");
        assert_eq!(err.got, Some(TokenKind::EndOfInput));
    }
}
