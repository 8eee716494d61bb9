//! Abstract Syntax Tree for xtend templates.
//!
//! The tree is immutable once built and holds no spans or references back to
//! the source, so one parsed template can be rendered any number of times.

/// An ordered run of nodes: the whole document, or one branch or loop body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    pub children: Vec<Node>,
}

impl Sequence {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.children.iter()
    }

    /// Total number of nodes in this sequence, counted recursively.
    pub fn node_count(&self) -> usize {
        self.children.iter().map(Node::node_count).sum()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A nested run of nodes, rendered as the concatenation of its children.
    Sequence(Sequence),

    /// Literal output, already de-escaped.
    Text(String),

    /// `{code}`: evaluated and stringified.
    Expression(String),

    /// `{IF c}...{ELIF c}...{ELSE}...{END}`
    Conditional(Conditional),

    /// `{FOR var IN code SEPARATOR code}...{END}`
    Loop(Loop),
}

impl Node {
    pub fn node_count(&self) -> usize {
        1 + match self {
            Node::Sequence(seq) => seq.node_count(),
            Node::Text(_) | Node::Expression(_) => 0,
            Node::Conditional(cond) => {
                cond.branches
                    .iter()
                    .map(|b| b.body.node_count())
                    .sum::<usize>()
                    + cond.else_body.as_ref().map_or(0, Sequence::node_count)
            }
            Node::Loop(lp) => lp.body.node_count(),
        }
    }
}

/// One `(condition, body)` arm of a conditional.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: String,
    pub body: Sequence,
}

/// `IF` plus any `ELIF` arms, in source order, and an optional `ELSE` body.
/// `branches` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub branches: Vec<Branch>,
    pub else_body: Option<Sequence>,
}

/// A `FOR` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Name bound to each item inside the body.
    pub var: String,
    pub iterable: String,
    /// Evaluated once; its string form joins the iteration outputs.
    pub separator: Option<String>,
    pub body: Sequence,
}
