//! Condition parser: the text of an `.if` or `.elif` directive to a [`CondTree`].
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      = and { "||" and }
//! and     = not { "&&" not }
//! not     = "!" not | primary
//! primary = "(" or ")" | call | term [ op term ]
//! call    = ("defined" | "empty" | "exists" | "make" | "target" | "commands") "(" ... ")"
//! term    = "${...}" | "\"...\"" | word
//! op      = "==" | "!=" | "<" | "<=" | ">" | ">="
//! ```

use mklint_lexer::{parse_name_with_mods, parse_varref};
use mklint_types::cond::{CompareOp, Cond, CondId, CondTerm, CondTree};
use mklint_types::Span;

/// A condition that could not be parsed completely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// The unrecognized part, starting where parsing stopped.
    pub rest: String,
}

/// Parse a complete condition.
///
/// Fails if any part of the text is not consumed.
pub fn parse_condition(text: &str) -> Result<CondTree, ParseFailure> {
    CondParser::new(text).parse()
}

const FUNCTIONS: &[&str] = &["defined", "empty", "exists", "make", "target", "commands"];

/// Recursive-descent parser over the bytes of one condition.
pub struct CondParser<'src> {
    text: &'src str,
    pos: usize,
    tree: CondTree,
}

impl<'src> CondParser<'src> {
    pub fn new(text: &'src str) -> Self {
        Self {
            text,
            pos: 0,
            tree: CondTree::new(text),
        }
    }

    /// Parse the whole text, consuming the parser.
    pub fn parse(mut self) -> Result<CondTree, ParseFailure> {
        let root = self.or();
        self.skip_ws();
        match root {
            Some(root) if self.at_end() => {
                self.tree.set_root(root);
                Ok(self.tree)
            }
            _ => Err(ParseFailure {
                rest: self.text[self.pos..].to_string(),
            }),
        }
    }

    // ── Cursor ────────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn rest(&self) -> &'src str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    /// Skip whitespace, then consume `s` if it follows.
    fn eat(&mut self, s: &str) -> bool {
        let save = self.pos;
        self.skip_ws();
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            self.pos = save;
            false
        }
    }

    fn alloc(&mut self, cond: Cond, start: usize) -> CondId {
        self.tree.alloc(cond, Span::new(start, self.pos))
    }

    // ── Boolean structure ─────────────────────────────────────────────────────

    fn or(&mut self) -> Option<CondId> {
        self.skip_ws();
        let start = self.pos;
        let first = self.and()?;
        let mut children = vec![first];
        while self.eat("||") {
            children.push(self.and()?);
        }
        if children.len() == 1 {
            return Some(first);
        }
        Some(self.alloc(Cond::Or(children), start))
    }

    fn and(&mut self) -> Option<CondId> {
        self.skip_ws();
        let start = self.pos;
        let first = self.not()?;
        let mut children = vec![first];
        while self.eat("&&") {
            children.push(self.not()?);
        }
        if children.len() == 1 {
            return Some(first);
        }
        Some(self.alloc(Cond::And(children), start))
    }

    fn not(&mut self) -> Option<CondId> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some(b'!') && !self.rest().starts_with("!=") {
            self.pos += 1;
            let inner = self.not()?;
            return Some(self.alloc(Cond::Not(inner), start));
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<CondId> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some(b'(') {
            self.pos += 1;
            let inner = self.or()?;
            if !self.eat(")") {
                return None;
            }
            return Some(self.alloc(Cond::Paren(inner), start));
        }
        if let Some(call) = self.call() {
            return Some(call);
        }
        self.comparison()
    }

    // ── Function calls ────────────────────────────────────────────────────────

    fn call(&mut self) -> Option<CondId> {
        let start = self.pos;
        let name_len = self
            .rest()
            .bytes()
            .take_while(u8::is_ascii_alphabetic)
            .count();
        let function = &self.rest()[..name_len];
        if !FUNCTIONS.contains(&function) {
            return None;
        }
        self.pos += name_len;
        self.skip_ws();
        if self.peek() != Some(b'(') {
            self.pos = start;
            return None;
        }
        self.pos += 1;

        let cond = match function {
            "empty" => {
                let (expr, len) = match parse_name_with_mods(self.rest(), b')') {
                    Some(parsed) => parsed,
                    None => {
                        self.pos = start;
                        return None;
                    }
                };
                self.pos += len;
                let mut expr = expr;
                expr.name = expr.name.trim().to_string();
                if let Some(last) = expr.modifiers.last_mut() {
                    last.text = last.text.trim_end().to_string();
                }
                Cond::EmptyTest(expr)
            }
            _ => {
                let argument = match self.balanced_argument() {
                    Some(arg) => arg,
                    None => {
                        self.pos = start;
                        return None;
                    }
                };
                if function == "defined" {
                    Cond::Defined(argument)
                } else {
                    Cond::Call {
                        function: function.to_string(),
                        argument,
                    }
                }
            }
        };
        // Closing parenthesis of the call.
        self.pos += 1;
        Some(self.alloc(cond, start))
    }

    /// The text up to the `)` that closes the current call, which is not
    /// consumed.
    fn balanced_argument(&mut self) -> Option<String> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.peek()? {
                b'$' => match parse_varref(self.rest()) {
                    Some((_, len)) => self.pos += len,
                    None => self.pos += 1,
                },
                b'(' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' if depth == 0 => break,
                b')' => {
                    depth -= 1;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        Some(self.text[start..self.pos].trim().to_string())
    }

    // ── Comparisons and terms ─────────────────────────────────────────────────

    fn comparison(&mut self) -> Option<CondId> {
        let start = self.pos;
        let left = self.term()?;
        let after_left = self.pos;

        if let Some(op) = self.compare_op() {
            self.skip_ws();
            if let Some(right) = self.term() {
                return Some(self.alloc(Cond::Compare { left, op, right }, start));
            }
            // Leave the operator unconsumed so that it is reported.
            self.pos = after_left;
        }

        let cond = match left {
            CondTerm::Expr(expr) => Cond::BareVar(expr),
            other => Cond::Literal(other),
        };
        Some(self.alloc(cond, start))
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        const OPS: &[(&str, CompareOp)] = &[
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        OPS.iter()
            .find(|(text, _)| self.eat(text))
            .map(|&(_, op)| op)
    }

    fn term(&mut self) -> Option<CondTerm> {
        match self.peek()? {
            b'$' => {
                let (expr, len) = parse_varref(self.rest())?;
                self.pos += len;
                Some(CondTerm::Expr(expr))
            }
            b'"' => self.quoted(),
            _ => self.word(),
        }
    }

    fn quoted(&mut self) -> Option<CondTerm> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    self.pos = start;
                    return None;
                }
                Some(b'\\') => self.pos = (self.pos + 2).min(self.text.len()),
                Some(b'"') => break,
                Some(b'$') => match parse_varref(self.rest()) {
                    Some((_, len)) => self.pos += len,
                    None => self.pos += 1,
                },
                Some(_) => self.pos += 1,
            }
        }
        let content = self.text[content_start..self.pos].to_string();
        self.pos += 1;
        Some(CondTerm::Quoted(content))
    }

    fn word(&mut self) -> Option<CondTerm> {
        let len = self
            .rest()
            .bytes()
            .take_while(|b| !b" \t!=<>()&|\"$".contains(b))
            .count();
        if len == 0 {
            return None;
        }
        let word = self.rest()[..len].to_string();
        self.pos += len;
        Some(CondTerm::Word(word))
    }
}
