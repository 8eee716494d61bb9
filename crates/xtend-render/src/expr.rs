//! A small sandboxed expression language, usable as the [`Evaluator`] for
//! templates whose directives hold plain data lookups and comparisons.
//!
//! ```
//! use xtend_render::{Context, Evaluator, ExprEvaluator, Scope, Value};
//!
//! let globals = Scope::new().with("items", vec![1, 2, 3]);
//! let ctx = Context::with_globals(&globals);
//! let value = ExprEvaluator.evaluate("len(items) * 2", &ctx).unwrap();
//! assert_eq!(value, Value::Int(6));
//! ```

use std::cmp::Ordering;

use crate::context::Context;
use crate::evaluator::{EvaluationError, Evaluator};
use crate::expr_parser::{BinaryOp, Expr, ExprParser, UnaryOp};
use crate::value::Value;

/// Largest list `range(n)` will build.
pub const MAX_RANGE: i64 = 1_000_000;

/// Evaluates directive code as a reference-language expression.
///
/// Names resolve through [`Context::lookup`]; an unknown name is an
/// [`EvaluationError::UndefinedVariable`]. The code is parsed on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, code: &str, context: &Context<'_>) -> Result<Value, EvaluationError> {
        let expr = ExprParser::parse(code)?;
        eval(&expr, context)
    }
}

fn eval(expr: &Expr, ctx: &Context<'_>) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Name(name) => ctx
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvaluationError::UndefinedVariable(name.clone())),
        Expr::Member(target, key) => {
            let target = eval(target, ctx)?;
            member(&target, key)
        }
        Expr::Index(target, index) => {
            let target = eval(target, ctx)?;
            let index = eval(index, ctx)?;
            index_into(&target, &index)
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, args)
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(n) => n
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| type_error("integer overflow")),
                    Value::Float(x) => Ok(Value::Float(-x)),
                    other => Err(type_error(format!("cannot negate {}", other.type_name()))),
                },
            }
        }
        Expr::Binary(left, BinaryOp::And, right) => {
            Ok(Value::Bool(eval(left, ctx)?.is_truthy() && eval(right, ctx)?.is_truthy()))
        }
        Expr::Binary(left, BinaryOp::Or, right) => {
            Ok(Value::Bool(eval(left, ctx)?.is_truthy() || eval(right, ctx)?.is_truthy()))
        }
        Expr::Binary(left, op, right) => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            binary(*op, left, right)
        }
    }
}

fn member(target: &Value, key: &str) -> Result<Value, EvaluationError> {
    match target {
        Value::Map(map) => map
            .get(key)
            .cloned()
            .ok_or_else(|| type_error(format!("map has no key `{key}`"))),
        Value::List(_) => match key.parse::<i64>() {
            Ok(n) => index_into(target, &Value::Int(n)),
            Err(_) => Err(type_error(format!("list has no attribute `{key}`"))),
        },
        other => Err(type_error(format!(
            "{} has no attribute `{key}`",
            other.type_name()
        ))),
    }
}

fn index_into(target: &Value, index: &Value) -> Result<Value, EvaluationError> {
    match (target, index) {
        (Value::List(items), Value::Int(i)) => resolve_index(*i, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(|| type_error(format!("list index {i} out of range"))),
        (Value::String(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            resolve_index(*i, chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or_else(|| type_error(format!("string index {i} out of range")))
        }
        (Value::Map(_), Value::String(key)) => member(target, key),
        (target, index) => Err(type_error(format!(
            "cannot index {} with {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

/// Python-style index: negative counts from the end.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvaluationError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            let ordering = compare(&left, &right)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Lte => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (left, right) => arithmetic(op, &left, &right),
        },
        _ => arithmetic(op, &left, &right),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let (a, b) = (*a, *b);
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Rem if b == 0 => return Err(type_error("division by zero")),
            BinaryOp::Rem => a.checked_rem_euclid(b),
            // `/` always produces a float.
            _ => return float_arithmetic(op, a as f64, b as f64),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| type_error("integer overflow"));
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => float_arithmetic(op, a, b),
        _ => Err(type_error(format!(
            "unsupported operand types for {op:?}: {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvaluationError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => return Err(type_error("division by zero")),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a.rem_euclid(b),
        _ => return Err(type_error(format!("{op:?} is not arithmetic"))),
    };
    Ok(Value::Float(result))
}

/// Structural equality, with ints and floats compared numerically.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            left.as_f64() == right.as_f64()
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, EvaluationError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        type_error(format!(
            "cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn call(name: &str, args: Vec<Value>) -> Result<Value, EvaluationError> {
    match (name, args.as_slice()) {
        ("len", [value]) => {
            let len = match value {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => return Err(type_error(format!("{} has no length", other.type_name()))),
            };
            i64::try_from(len)
                .map(Value::Int)
                .map_err(|_| type_error("length out of range"))
        }
        ("str", [value]) => Ok(Value::String(value.to_string())),
        ("upper", [Value::String(s)]) => Ok(Value::String(s.to_uppercase())),
        ("lower", [Value::String(s)]) => Ok(Value::String(s.to_lowercase())),
        ("join", [Value::List(items), separator]) => Ok(Value::String(
            items
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(&separator.to_string()),
        )),
        ("range", [Value::Int(n)]) if *n > MAX_RANGE => Err(type_error(format!(
            "range({n}) exceeds the limit of {MAX_RANGE} items"
        ))),
        ("range", [Value::Int(n)]) => Ok(Value::List((0..(*n).max(0)).map(Value::Int).collect())),
        ("len" | "str" | "upper" | "lower" | "join" | "range", _) => Err(type_error(format!(
            "invalid arguments for {name}(): {}",
            args.iter()
                .map(Value::type_name)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        _ => Err(type_error(format!("unknown function `{name}`"))),
    }
}

fn type_error(message: impl Into<String>) -> EvaluationError {
    EvaluationError::Type(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn globals() -> Scope {
        let mut user = BTreeMap::new();
        user.insert("name".to_string(), Value::from("Ada"));
        user.insert("tags".to_string(), Value::from(vec!["x", "y"]));
        Scope::new()
            .with("user", Value::Map(user))
            .with("n", 7)
            .with("empty", Value::List(vec![]))
    }

    fn eval_str(code: &str) -> Result<Value, EvaluationError> {
        let globals = globals();
        ExprEvaluator.evaluate(code, &Context::with_globals(&globals))
    }

    fn ok(code: &str) -> Value {
        eval_str(code).unwrap()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    #[test]
    fn test_names_members_and_indexes() {
        assert_eq!(ok("n"), Value::Int(7));
        assert_eq!(ok("user.name"), Value::from("Ada"));
        assert_eq!(ok("user['name']"), Value::from("Ada"));
        assert_eq!(ok("user.tags[-1]"), Value::from("y"));
        assert_eq!(ok("user.tags.0"), Value::from("x"));
        assert_eq!(ok("'abc'[1]"), Value::from("b"));
    }

    #[test]
    fn test_lookup_failures() {
        assert_eq!(eval_str("nope"), Err(EvaluationError::UndefinedVariable("nope".into())));
        assert!(matches!(eval_str("user.age"), Err(EvaluationError::Type(_))));
        assert!(matches!(eval_str("user.tags[5]"), Err(EvaluationError::Type(_))));
        assert!(matches!(eval_str("n.x"), Err(EvaluationError::Type(_))));
    }

    #[test]
    fn test_locals_shadow_globals() {
        let globals = globals();
        let locals = Scope::new().with("n", "local");
        let ctx = Context::new(&globals, &locals);
        assert_eq!(ExprEvaluator.evaluate("n", &ctx), Ok(Value::from("local")));
    }

    // =========================================================================
    // Operators
    // =========================================================================

    #[test]
    fn test_arithmetic() {
        assert_eq!(ok("1 + 2 * 3"), Value::Int(7));
        assert_eq!(ok("7 / 2"), Value::Float(3.5));
        assert_eq!(ok("-7 % 3"), Value::Int(2));
        assert_eq!(ok("1 + 0.5"), Value::Float(1.5));
        assert_eq!(ok("'a' + 'b'"), Value::from("ab"));
        assert_eq!(ok("[1] + [2]"), Value::from(vec![1, 2]));
        assert!(matches!(eval_str("1 / 0"), Err(EvaluationError::Type(_))));
        assert!(matches!(eval_str("'a' - 1"), Err(EvaluationError::Type(_))));
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(ok("n > 5 and n <= 7"), Value::Bool(true));
        assert_eq!(ok("1 == 1.0"), Value::Bool(true));
        assert_eq!(ok("'a' < 'b'"), Value::Bool(true));
        assert_eq!(ok("not empty"), Value::Bool(true));
        assert_eq!(ok("empty || user.name == 'Ada'"), Value::Bool(true));
        assert!(matches!(eval_str("'a' < 1"), Err(EvaluationError::Type(_))));
    }

    #[test]
    fn test_logic_short_circuits() {
        assert_eq!(ok("false and nope"), Value::Bool(false));
        assert_eq!(ok("true or nope"), Value::Bool(true));
    }

    // =========================================================================
    // Builtins
    // =========================================================================

    #[test]
    fn test_builtins() {
        assert_eq!(ok("len(user.tags)"), Value::Int(2));
        assert_eq!(ok("len('héllo')"), Value::Int(5));
        assert_eq!(ok("upper(user.name)"), Value::from("ADA"));
        assert_eq!(ok("join(user.tags, ', ')"), Value::from("x, y"));
        assert_eq!(ok("range(3)"), Value::from(vec![0, 1, 2]));
        assert_eq!(ok("str(n) + '!'"), Value::from("7!"));
        assert!(matches!(eval_str("len(n)"), Err(EvaluationError::Type(_))));
        assert!(matches!(eval_str("frobnicate(1)"), Err(EvaluationError::Type(_))));
    }

    #[test]
    fn test_range_is_bounded() {
        assert_eq!(ok("len(range(1000000))"), Value::Int(MAX_RANGE));
        assert_eq!(ok("range(-2)"), Value::List(vec![]));
        assert!(matches!(
            eval_str("range(100000000000000000)"),
            Err(EvaluationError::Type(_))
        ));
    }

    #[test]
    fn test_equality_is_numeric_inside_containers() {
        let map = |value: Value| Value::Map(BTreeMap::from([("a".to_string(), value)]));
        let globals = Scope::new()
            .with("int", map(Value::Int(1)))
            .with("float", map(Value::Float(1.0)))
            .with("half", map(Value::Float(1.5)));
        let ctx = Context::with_globals(&globals);
        let check = |code: &str| ExprEvaluator.evaluate(code, &ctx);

        assert_eq!(check("[1, 2] == [1.0, 2]"), Ok(Value::Bool(true)));
        assert_eq!(check("int == float"), Ok(Value::Bool(true)));
        assert_eq!(check("int == half"), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_syntax_error_carries_code() {
        match eval_str("1 +") {
            Err(EvaluationError::Syntax { code, .. }) => assert_eq!(code, "1 +"),
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }
}
