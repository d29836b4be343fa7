//! Condition trees of `.if` and `.elif` directives.
//!
//! Nodes live in an arena owned by [`CondTree`] and refer to each other by
//! [`CondId`]. Checkers that need to remember "this node is already handled"
//! keep a set of ids instead of relying on reference identity.

use std::fmt;

use crate::varref::VarRef;
use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Node ids
// ══════════════════════════════════════════════════════════════════════════════

/// Index of a node in its [`CondTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CondId(u32);

impl CondId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Node shapes
// ══════════════════════════════════════════════════════════════════════════════

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondTerm {
    /// `${VAR}`
    Expr(VarRef),
    /// `"text"`; the text may contain references.
    Quoted(String),
    /// An unquoted word or number.
    Word(String),
}

impl CondTerm {
    /// The literal text of a non-expression term.
    pub fn literal(&self) -> Option<&str> {
        match self {
            CondTerm::Expr(_) => None,
            CondTerm::Quoted(s) | CondTerm::Word(s) => Some(s),
        }
    }
}

impl fmt::Display for CondTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CondTerm::Expr(expr) => write!(f, "{expr}"),
            CondTerm::Quoted(s) => write!(f, "\"{s}\""),
            CondTerm::Word(s) => f.write_str(s),
        }
    }
}

/// The closed set of condition shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    Or(Vec<CondId>),
    And(Vec<CondId>),
    Not(CondId),
    Paren(CondId),
    /// `defined(VAR)`
    Defined(String),
    /// `empty(VAR:mods)`; the name may be a whole `${...}` expression.
    EmptyTest(VarRef),
    /// `exists(file)`, `make(target)`, `target(name)`, `commands(name)`.
    Call { function: String, argument: String },
    /// `${VAR}` standing alone.
    BareVar(VarRef),
    /// A bare word, number or string standing alone.
    Literal(CondTerm),
    Compare {
        left: CondTerm,
        op: CompareOp,
        right: CondTerm,
    },
}

/// A node together with the part of the condition text it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondNode {
    pub cond: Cond,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Tree
// ══════════════════════════════════════════════════════════════════════════════

/// An arena of condition nodes plus the condition text they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondTree {
    text: String,
    nodes: Vec<CondNode>,
    root: Option<CondId>,
}

impl CondTree {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Add a node and return its id.
    pub fn alloc(&mut self, cond: Cond, span: Span) -> CondId {
        let id = CondId(self.nodes.len() as u32);
        self.nodes.push(CondNode { cond, span });
        id
    }

    pub fn set_root(&mut self, id: CondId) {
        self.root = Some(id);
    }

    /// The root node; `None` only for a tree that is still being built.
    pub fn root(&self) -> Option<CondId> {
        self.root
    }

    pub fn node(&self, id: CondId) -> &CondNode {
        &self.nodes[id.index()]
    }

    pub fn cond(&self, id: CondId) -> &Cond {
        &self.node(id).cond
    }

    /// The full condition text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The source text of one node.
    pub fn text_of(&self, id: CondId) -> &str {
        self.node(id).span.slice(&self.text)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The direct top-level conjuncts of the root: the children of a root
    /// `And`, or the root itself.
    pub fn conjuncts(&self) -> Vec<CondId> {
        match self.root {
            None => Vec::new(),
            Some(root) => match self.cond(root) {
                Cond::And(children) => children.clone(),
                _ => vec![root],
            },
        }
    }

    /// Ids of all nodes in pre-order, starting at the root.
    pub fn preorder(&self) -> Vec<CondId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<CondId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            match self.cond(id) {
                Cond::Or(children) | Cond::And(children) => {
                    stack.extend(children.iter().rev().copied());
                }
                Cond::Not(inner) | Cond::Paren(inner) => stack.push(*inner),
                _ => {}
            }
        }
        out
    }
}
