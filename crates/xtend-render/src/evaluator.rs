//! The expression-evaluation seam.
//!
//! The renderer never looks inside the code of a directive. Everything it
//! needs to know about expressions goes through [`Evaluator`], which the
//! embedding application supplies.

use crate::context::Context;
use crate::value::Value;

/// A failure raised while evaluating embedded code. The renderer passes these
/// through to its caller unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("Invalid expression `{code}`: {message}")]
    Syntax { code: String, message: String },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Cannot iterate over a value of type {type_name}")]
    NotIterable { type_name: &'static str },

    #[error("{0}")]
    Custom(String),
}

/// Evaluates the code of a directive against a context.
///
/// Only [`evaluate`](Evaluator::evaluate) is required. The other methods
/// derive conditions and loop items from its result and can be overridden by
/// evaluators with their own notion of truth or iteration.
pub trait Evaluator {
    fn evaluate(&self, code: &str, context: &Context<'_>) -> Result<Value, EvaluationError>;

    /// Evaluate an `IF`/`ELIF` condition.
    fn evaluate_boolean(&self, code: &str, context: &Context<'_>) -> Result<bool, EvaluationError> {
        Ok(self.evaluate(code, context)?.is_truthy())
    }

    /// Evaluate the iterable of a `FOR` loop into its items.
    fn evaluate_iterable(
        &self,
        code: &str,
        context: &Context<'_>,
    ) -> Result<Vec<Value>, EvaluationError> {
        let value = self.evaluate(code, context)?;
        let type_name = value.type_name();
        value
            .into_items()
            .ok_or(EvaluationError::NotIterable { type_name })
    }
}

impl<F> Evaluator for F
where
    F: Fn(&str, &Context<'_>) -> Result<Value, EvaluationError>,
{
    fn evaluate(&self, code: &str, context: &Context<'_>) -> Result<Value, EvaluationError> {
        self(code, context)
    }
}
