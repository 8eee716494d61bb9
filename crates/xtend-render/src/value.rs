use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value produced by an evaluator or stored in a scope.
///
/// Deserializes from any JSON document, so context files map directly onto
/// scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// `null`, `false`, zero, and empty strings, lists and maps are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// The items a loop walks over: list elements, map keys, or the
    /// characters of a string. `None` for anything else.
    pub fn into_items(self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            Value::Map(map) => Some(map.into_keys().map(Value::String).collect()),
            Value::String(s) => Some(s.chars().map(|c| Value::String(c.to_string())).collect()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of ints and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Nested form: strings are quoted so `["a, b"]` and `["a", "b"]` differ.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s.escape_debug()),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: ")?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_truthiness() {
        for falsy in [
            Value::Null,
            Value::Bool(false),
            Value::Int(0),
            Value::Float(0.0),
            Value::from(""),
            Value::List(vec![]),
            map(&[]),
        ] {
            assert!(!falsy.is_truthy(), "{falsy:?}");
        }
        for truthy in [Value::Bool(true), Value::Int(-1), Value::from("0"), Value::from(vec![0])] {
            assert!(truthy.is_truthy(), "{truthy:?}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[\"a\", \"b\"]");
        assert_eq!(
            map(&[("b", Value::Int(2)), ("a", Value::from("x"))]).to_string(),
            "{a: \"x\", b: 2}"
        );
    }

    #[test]
    fn test_into_items() {
        assert_eq!(Value::from(vec![1, 2]).into_items(), Some(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(
            map(&[("y", Value::Null), ("x", Value::Null)]).into_items(),
            Some(vec![Value::from("x"), Value::from("y")])
        );
        assert_eq!(Value::from("ab").into_items(), Some(vec![Value::from("a"), Value::from("b")]));
        assert_eq!(Value::Int(3).into_items(), None);
    }

    #[test]
    fn test_deserialize_from_json() {
        let value: Value = serde_json::from_str(r#"{"n": 1, "f": 1.5, "l": [true, null], "s": "x"}"#).unwrap();
        assert_eq!(
            value,
            map(&[
                ("f", Value::Float(1.5)),
                ("l", Value::List(vec![Value::Bool(true), Value::Null])),
                ("n", Value::Int(1)),
                ("s", Value::from("x")),
            ])
        );
    }
}
