//! xtend Renderer
//!
//! Renders a parsed template against explicit global and local scopes. What
//! the code inside a directive means is decided by an [`Evaluator`] supplied
//! by the caller; [`ExprEvaluator`] is a small ready-made one.
//!
//! ```text
//! source → xtend_parser::parse() → Sequence → render(&ast, &context, &evaluator) → String
//! ```
//!
//! # Example
//!
//! ```
//! use xtend_render::{render_str, Context, ExprEvaluator, Scope};
//!
//! let globals = Scope::new().with("names", vec!["a", "b", "c"]);
//! let out = render_str(
//!     "{FOR n IN names SEPARATOR ', '}<{n}>{END}",
//!     &Context::with_globals(&globals),
//!     &ExprEvaluator,
//! )
//! .unwrap();
//! assert_eq!(out, "<a>, <b>, <c>");
//! ```

pub mod context;
pub mod evaluator;
pub mod expr;
pub mod expr_lexer;
pub mod expr_parser;
pub mod render;
pub mod value;

pub use context::{Context, Scope};
pub use evaluator::{EvaluationError, Evaluator};
pub use expr::ExprEvaluator;
pub use render::render;
pub use value::Value;

use xtend_parser::ParseError;

/// Failure of a one-shot [`render_str`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Parse `source` and render it in one step.
pub fn render_str<E>(source: &str, context: &Context<'_>, evaluator: &E) -> Result<String, Error>
where
    E: Evaluator + ?Sized,
{
    let root = xtend_parser::parse(source)?;
    Ok(render(&root, context, evaluator)?)
}
