//! Tree-walking renderer.
//!
//! A depth-first fold over the syntax tree. Each directive's code is handed to
//! the evaluator exactly once, in document order, and nothing is cached or
//! retried; the first evaluation error ends the render.

use xtend_parser::ast::{Conditional, Loop, Node, Sequence};

use crate::context::Context;
use crate::evaluator::{EvaluationError, Evaluator};

/// Render `root` against `context`, evaluating code with `evaluator`.
pub fn render<E>(
    root: &Sequence,
    context: &Context<'_>,
    evaluator: &E,
) -> Result<String, EvaluationError>
where
    E: Evaluator + ?Sized,
{
    tracing::debug!(nodes = root.node_count(), "rendering template");
    let renderer = Renderer { evaluator };
    let mut out = String::new();
    renderer.render_sequence(root, context, &mut out)?;
    tracing::debug!(bytes = out.len(), "rendered template");
    Ok(out)
}

struct Renderer<'e, E: ?Sized> {
    evaluator: &'e E,
}

impl<E: Evaluator + ?Sized> Renderer<'_, E> {
    fn render_sequence(
        &self,
        seq: &Sequence,
        context: &Context<'_>,
        out: &mut String,
    ) -> Result<(), EvaluationError> {
        for node in seq {
            self.render_node(node, context, out)?;
        }
        Ok(())
    }

    fn render_node(
        &self,
        node: &Node,
        context: &Context<'_>,
        out: &mut String,
    ) -> Result<(), EvaluationError> {
        match node {
            Node::Sequence(seq) => self.render_sequence(seq, context, out),
            Node::Text(value) => {
                out.push_str(value);
                Ok(())
            }
            Node::Expression(code) => {
                tracing::trace!(code = %code, "evaluating expression");
                let value = self.evaluator.evaluate(code, context)?;
                out.push_str(&value.to_string());
                Ok(())
            }
            Node::Conditional(cond) => self.render_conditional(cond, context, out),
            Node::Loop(lp) => self.render_loop(lp, context, out),
        }
    }

    /// Renders the first branch whose condition holds; later conditions are
    /// not evaluated.
    fn render_conditional(
        &self,
        cond: &Conditional,
        context: &Context<'_>,
        out: &mut String,
    ) -> Result<(), EvaluationError> {
        for branch in &cond.branches {
            tracing::trace!(code = %branch.condition, "evaluating condition");
            if self.evaluator.evaluate_boolean(&branch.condition, context)? {
                return self.render_sequence(&branch.body, context, out);
            }
        }

        match &cond.else_body {
            Some(body) => self.render_sequence(body, context, out),
            None => Ok(()),
        }
    }

    /// The iterable and the separator are evaluated once each, before the
    /// body. Every iteration sees its own copy of the locals with the loop
    /// variable bound.
    fn render_loop(
        &self,
        lp: &Loop,
        context: &Context<'_>,
        out: &mut String,
    ) -> Result<(), EvaluationError> {
        tracing::trace!(code = %lp.iterable, "evaluating iterable");
        let items = self.evaluator.evaluate_iterable(&lp.iterable, context)?;

        let separator = match &lp.separator {
            Some(code) => {
                tracing::trace!(code = %code, "evaluating separator");
                Some(self.evaluator.evaluate(code, context)?.to_string())
            }
            None => None,
        };

        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let scope = context.with_local(lp.var.as_str(), item);
            let mut part = String::new();
            self.render_sequence(&lp.body, &scope, &mut part)?;
            parts.push(part);
        }

        out.push_str(&parts.join(separator.as_deref().unwrap_or("")));
        Ok(())
    }
}
