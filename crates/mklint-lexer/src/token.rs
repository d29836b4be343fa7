//! Tokens of a variable value: literal text and variable references.

use mklint_types::varref::VarRef;
use std::fmt;

/// A single token produced by [`crate::tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text. `$$` stays as written.
    Text(String),
    /// A variable reference.
    Expr(VarRef),
}

impl Token {
    pub fn as_expr(&self) -> Option<&VarRef> {
        match self {
            Token::Expr(expr) => Some(expr),
            Token::Text(_) => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

/// Result of tokenizing: tokens plus the unparsed remainder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokens {
    pub tokens: Vec<Token>,
    /// Non-empty when a reference was not closed; starts at its `$`.
    pub rest: String,
}

impl Tokens {
    /// All variable references, in order.
    pub fn exprs(&self) -> impl Iterator<Item = &VarRef> {
        self.tokens.iter().filter_map(Token::as_expr)
    }
}
