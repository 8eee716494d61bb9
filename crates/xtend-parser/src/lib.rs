//! xtend Parser
//!
//! Parses template source into an immutable syntax tree, pulling tokens from
//! `xtend-lexer` on demand. Fails at the first lexical or grammar violation
//! with a [`ParseError`] carrying the exact source span; [`format_error`]
//! turns that into a caret-annotated excerpt.
//!
//! # Example
//!
//! ```
//! use xtend_parser::{format_error, parse, Node};
//!
//! let root = parse("Hello {name}!").unwrap();
//! assert_eq!(root.children[1], Node::Expression("name".into()));
//!
//! let source = "{IF c}s{ELIF}\n{END}";
//! let err = parse(source).unwrap_err();
//! assert_eq!(format_error(&err, source), "{IF c}s{ELIF}\n             ^\n{END}\n");
//! ```

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{Branch, Conditional, Loop, Node, Sequence};
pub use error::{format_error, ErrorKind, Expected, ParseError};
pub use parser::Parser;

/// Parse a complete template into its root sequence.
pub fn parse(source: &str) -> Result<Sequence, ParseError> {
    Parser::parse(source)
}
