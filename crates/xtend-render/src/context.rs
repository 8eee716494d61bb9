//! Variable scopes that expressions are evaluated against.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::value::Value;

/// A name -> value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    vars: HashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut scope = Scope::new();
        for (name, value) in iter {
            scope.insert(name, value);
        }
        scope
    }
}

/// The global and local scopes for one render. Locals shadow globals.
///
/// The globals are always borrowed. The locals are borrowed from the caller
/// at the top level and owned by every context derived for a loop iteration,
/// so the caller's scopes are never modified.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    globals: &'a Scope,
    locals: Cow<'a, Scope>,
}

impl<'a> Context<'a> {
    pub fn new(globals: &'a Scope, locals: &'a Scope) -> Self {
        Self {
            globals,
            locals: Cow::Borrowed(locals),
        }
    }

    /// A context with no locals.
    pub fn with_globals(globals: &'a Scope) -> Self {
        Self {
            globals,
            locals: Cow::Owned(Scope::new()),
        }
    }

    pub fn globals(&self) -> &Scope {
        self.globals
    }

    pub fn locals(&self) -> &Scope {
        &self.locals
    }

    /// Resolve `name`, locals first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    /// A derived context whose locals are this context's locals plus `name`
    /// bound to `value`. `self` is left untouched.
    pub fn with_local(&self, name: impl Into<String>, value: Value) -> Context<'a> {
        let mut locals = Scope::clone(&self.locals);
        locals.insert(name, value);
        Context {
            globals: self.globals,
            locals: Cow::Owned(locals),
        }
    }
}
