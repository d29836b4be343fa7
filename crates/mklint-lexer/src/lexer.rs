//! Value tokenizer: splits a string into literal text and variable references.
//!
//! Features:
//! - `${NAME:mod:mod}`, `$(NAME:mod)` and single-character `$X` references
//! - nested references inside names and modifiers, kept verbatim
//! - `:S`/`:C` bodies and `:@var@body@` loops may contain `:` and the
//!   closing brace without ending the modifier
//! - `$$` is literal text
//! - an unclosed reference ends tokenization; the remainder is returned

use mklint_types::varref::{Brace, Modifier, VarRef};

use crate::token::{Token, Tokens};

/// Split `text` into literal text and variable references.
pub fn tokenize(text: &str) -> Tokens {
    let mut scanner = Scanner::new(text);
    let mut tokens = Vec::new();
    let mut literal = String::new();

    while let Some(c) = scanner.peek() {
        if c != b'$' {
            literal.push(scanner.next_char());
            continue;
        }
        match scanner.peek_at(1) {
            Some(b'$') => {
                literal.push_str("$$");
                scanner.pos += 2;
                continue;
            }
            None => {
                literal.push('$');
                scanner.pos += 1;
                continue;
            }
            _ => {}
        }

        let start = scanner.pos;
        match scanner.varref() {
            Some(expr) => {
                if !literal.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Expr(expr));
            }
            None => {
                if !literal.is_empty() {
                    tokens.push(Token::Text(literal));
                }
                return Tokens {
                    tokens,
                    rest: text[start..].to_string(),
                };
            }
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Text(literal));
    }
    Tokens {
        tokens,
        rest: String::new(),
    }
}

/// Parse one reference at the start of `text`, which must begin with `$`.
///
/// Returns the reference and the number of bytes it occupies.
pub fn parse_varref(text: &str) -> Option<(VarRef, usize)> {
    let mut scanner = Scanner::new(text);
    let expr = scanner.varref()?;
    Some((expr, scanner.pos))
}

/// Parse `NAME:mod:mod` as written inside `empty(...)`, stopping before
/// `close` at nesting depth 0.
///
/// Returns the reference and the number of bytes consumed, not counting
/// the closing character.
pub fn parse_name_with_mods(text: &str, close: u8) -> Option<(VarRef, usize)> {
    let mut scanner = Scanner::new(text);
    let name = scanner.name_until(close)?;
    let mut modifiers = Vec::new();
    while scanner.peek() == Some(b':') {
        scanner.pos += 1;
        modifiers.push(Modifier::new(scanner.modifier(close)?));
    }
    if scanner.peek() != Some(close) {
        return None;
    }
    let expr = VarRef {
        name,
        modifiers,
        brace: Brace::Curly,
    };
    Some((expr, scanner.pos))
}

// ══════════════════════════════════════════════════════════════════════════════
// Scanner
// ══════════════════════════════════════════════════════════════════════════════

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + n).copied()
    }

    /// Consume one character, which may be longer than one byte.
    fn next_char(&mut self) -> char {
        let ch = self.text[self.pos..].chars().next().unwrap_or('\0');
        self.pos += ch.len_utf8().max(1);
        ch
    }

    /// At a `$`: parse a complete reference. On failure the position is
    /// restored and `None` is returned.
    fn varref(&mut self) -> Option<VarRef> {
        let start = self.pos;
        let close = match self.peek_at(1) {
            Some(b'{') => b'}',
            Some(b'(') => b')',
            Some(_) => {
                self.pos += 1;
                let ch = self.next_char();
                return Some(VarRef {
                    name: ch.to_string(),
                    modifiers: Vec::new(),
                    brace: Brace::Single,
                });
            }
            None => return None,
        };
        let brace = if close == b'}' { Brace::Curly } else { Brace::Paren };
        self.pos += 2;

        let result = self.name_and_mods(close);
        match result {
            Some((name, modifiers)) if self.peek() == Some(close) => {
                self.pos += 1;
                Some(VarRef {
                    name,
                    modifiers,
                    brace,
                })
            }
            _ => {
                self.pos = start;
                None
            }
        }
    }

    fn name_and_mods(&mut self, close: u8) -> Option<(String, Vec<Modifier>)> {
        let name = self.name_until(close)?;
        let mut modifiers = Vec::new();
        while self.peek() == Some(b':') {
            self.pos += 1;
            modifiers.push(Modifier::new(self.modifier(close)?));
        }
        Some((name, modifiers))
    }

    /// The variable name, up to `:` or `close`.
    fn name_until(&mut self, close: u8) -> Option<String> {
        let start = self.pos;
        loop {
            match self.peek() {
                None => return None,
                Some(c) if c == close || c == b':' => break,
                Some(b'$') => self.skip_dollar()?,
                Some(_) => {
                    self.next_char();
                }
            }
        }
        Some(self.text[start..self.pos].to_string())
    }

    /// At a `$` inside a name or modifier: skip a nested reference, or
    /// just the dollar sign if none follows.
    fn skip_dollar(&mut self) -> Option<()> {
        match self.peek_at(1) {
            Some(b'{' | b'(') => {
                self.varref()?;
            }
            _ => self.pos += 1,
        }
        Some(())
    }

    /// One modifier, without the leading `:`.
    fn modifier(&mut self, close: u8) -> Option<String> {
        let start = self.pos;
        match (self.peek(), self.peek_at(1)) {
            (Some(b'S' | b'C'), Some(delim))
                if !delim.is_ascii_alphanumeric() && delim != close && delim.is_ascii() =>
            {
                self.pos += 2;
                self.delimited(delim)?;
                self.delimited(delim)?;
                self.plain_until(close)?;
            }
            (Some(b'@'), _) => {
                self.pos += 1;
                self.delimited(b'@')?;
                self.delimited(b'@')?;
            }
            _ => self.plain_until(close)?,
        }
        Some(self.text[start..self.pos].to_string())
    }

    /// Skip up to and including the next unescaped `delim`.
    fn delimited(&mut self, delim: u8) -> Option<()> {
        loop {
            match self.peek() {
                None => return None,
                Some(b'\\') => {
                    self.pos += 1;
                    if self.peek().is_some() {
                        self.next_char();
                    }
                }
                Some(c) if c == delim => {
                    self.pos += 1;
                    return Some(());
                }
                Some(b'$') => self.skip_dollar()?,
                Some(_) => {
                    self.next_char();
                }
            }
        }
    }

    /// Skip up to, but not including, the next `:` or `close`.
    fn plain_until(&mut self, close: u8) -> Option<()> {
        loop {
            match self.peek() {
                None => return None,
                Some(c) if c == close || c == b':' => return Some(()),
                Some(b'\\') => {
                    self.pos += 1;
                    if self.peek().is_some() {
                        self.next_char();
                    }
                }
                Some(b'$') => self.skip_dollar()?,
                Some(_) => {
                    self.next_char();
                }
            }
        }
    }
}
