//! Quoting context of variable references in shell text.

use mklint_lexer::{tokenize, Token};
use mklint_types::varref::VarRef;

use crate::expr::Quoting;

/// A reference found in shell text, with the quotes around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellExpr {
    pub expr: VarRef,
    pub quoting: Quoting,
    /// Whether the reference is glued to other characters of the same word.
    pub is_word_part: bool,
}

/// The references of `text` with their quoting state, and the unparsed
/// remainder if a reference is not closed.
pub fn shell_exprs(text: &str) -> (Vec<ShellExpr>, String) {
    let tokens = tokenize(text);
    let mut quotes: Vec<u8> = Vec::new();
    let mut out = Vec::new();

    for (i, token) in tokens.tokens.iter().enumerate() {
        match token {
            Token::Text(text) => track_quotes(text, &mut quotes),
            Token::Expr(expr) => {
                let before = i.checked_sub(1).and_then(|j| tokens.tokens.get(j));
                let after = tokens.tokens.get(i + 1);
                let is_word_part = glued(before, |s| s.chars().next_back())
                    || glued(after, |s| s.chars().next());
                out.push(ShellExpr {
                    expr: expr.clone(),
                    quoting: current(&quotes),
                    is_word_part,
                });
            }
        }
    }
    (out, tokens.rest)
}

fn current(quotes: &[u8]) -> Quoting {
    match quotes.last() {
        None => Quoting::Plain,
        Some(b'"') => Quoting::Dquot,
        Some(b'\'') => Quoting::Squot,
        Some(_) => Quoting::Backt,
    }
}

fn track_quotes(text: &str, quotes: &mut Vec<u8>) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match (quotes.last().copied(), b) {
            (Some(b'\''), b'\'') => {
                quotes.pop();
            }
            (Some(b'\''), _) => {}
            (_, b'\\') => i += 1,
            (Some(open), b) if open == b => {
                quotes.pop();
            }
            (Some(b'"'), b'`') => quotes.push(b),
            (Some(b'"'), _) => {}
            (_, b'"' | b'\'' | b'`') => quotes.push(b),
            _ => {}
        }
        i += 1;
    }
}

/// Whether the neighbouring token continues the word of a reference.
fn glued(neighbour: Option<&Token>, edge: impl Fn(&str) -> Option<char>) -> bool {
    match neighbour {
        None => false,
        Some(Token::Expr(_)) => true,
        Some(Token::Text(text)) => edge(text).is_some_and(is_word_char),
    }
}

fn is_word_char(c: char) -> bool {
    !(c.is_whitespace() || "\"'`;|&()<>".contains(c))
}
