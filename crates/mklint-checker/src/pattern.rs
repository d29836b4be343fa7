//! Glob patterns of `:M` modifiers and their intersection.
//!
//! A [`Pattern`] compiles to a sequence of elements that forms a small NFA:
//! state `i` means "the first `i` elements have matched". `*` loops on its
//! own state. Two patterns intersect if the product automaton reaches a
//! state where both are accepting.

use std::collections::{HashSet, VecDeque};

use mklint_types::{MklintError, Result};

/// One position of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Elem {
    /// `*`: any number of bytes.
    Star,
    /// `?`: any single byte.
    Any,
    /// `[...]`, possibly negated with `!` or `^`.
    Class { negated: bool, ranges: Vec<(u8, u8)> },
    Literal(u8),
}

impl Elem {
    fn accepts(&self, b: u8) -> bool {
        match self {
            Elem::Star | Elem::Any => true,
            Elem::Class { negated, ranges } => {
                ranges.iter().any(|&(lo, hi)| lo <= b && b <= hi) != *negated
            }
            Elem::Literal(c) => *c == b,
        }
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    text: String,
    elems: Vec<Elem>,
}

impl Pattern {
    /// Compile `text`. Patterns containing variable references cannot be
    /// compiled.
    pub fn compile(text: &str) -> Result<Self> {
        let fail = |message: &str| MklintError::InvalidPattern {
            pattern: text.to_string(),
            message: message.to_string(),
        };
        if text.contains('$') {
            return Err(fail("contains a variable reference"));
        }

        let bytes = text.as_bytes();
        let mut elems = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'*' => {
                    if elems.last() != Some(&Elem::Star) {
                        elems.push(Elem::Star);
                    }
                    i += 1;
                }
                b'?' => {
                    elems.push(Elem::Any);
                    i += 1;
                }
                b'[' => {
                    let (class, len) =
                        parse_class(&bytes[i + 1..]).ok_or_else(|| fail("unclosed '['"))?;
                    elems.push(class);
                    i += 1 + len;
                }
                b'\\' => {
                    let escaped = *bytes.get(i + 1).ok_or_else(|| fail("trailing backslash"))?;
                    elems.push(Elem::Literal(escaped));
                    i += 2;
                }
                b => {
                    elems.push(Elem::Literal(b));
                    i += 1;
                }
            }
        }
        Ok(Self {
            text: text.to_string(),
            elems,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether `value` matches the whole pattern.
    pub fn matches(&self, value: &str) -> bool {
        let mut states = self.closure([0].into_iter().collect());
        for &b in value.as_bytes() {
            let next: HashSet<usize> = states.iter().flat_map(|&s| self.step(s, b)).collect();
            states = self.closure(next);
            if states.is_empty() {
                return false;
            }
        }
        states.contains(&self.accept())
    }

    /// The intersection of two patterns.
    pub fn intersect<'p>(&'p self, other: &'p Pattern) -> Intersection<'p> {
        Intersection {
            left: self,
            right: other,
        }
    }

    fn accept(&self) -> usize {
        self.elems.len()
    }

    /// States reachable from `state` by consuming `b`.
    fn step(&self, state: usize, b: u8) -> Option<usize> {
        let elem = self.elems.get(state)?;
        if !elem.accepts(b) {
            return None;
        }
        Some(if *elem == Elem::Star { state } else { state + 1 })
    }

    /// Add every state reachable by skipping `*` elements.
    fn closure(&self, mut states: HashSet<usize>) -> HashSet<usize> {
        let mut todo: Vec<usize> = states.iter().copied().collect();
        while let Some(s) = todo.pop() {
            if self.elems.get(s) == Some(&Elem::Star) && states.insert(s + 1) {
                todo.push(s + 1);
            }
        }
        states
    }

    fn closure_of(&self, state: usize) -> HashSet<usize> {
        self.closure([state].into_iter().collect())
    }
}

/// Parse the inside of a `[...]` class; returns the class and the number of
/// bytes consumed including the closing `]`.
fn parse_class(bytes: &[u8]) -> Option<(Elem, usize)> {
    let mut i = 0;
    let negated = matches!(bytes.first(), Some(b'!' | b'^'));
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    let mut first = true;
    loop {
        let mut lo = *bytes.get(i)?;
        if lo == b']' && !first {
            return Some((Elem::Class { negated, ranges }, i + 1));
        }
        first = false;
        if lo == b'\\' {
            i += 1;
            lo = *bytes.get(i)?;
        }
        i += 1;
        let mut hi = lo;
        if bytes.get(i) == Some(&b'-') && bytes.get(i + 1).is_some_and(|&c| c != b']') {
            hi = bytes[i + 1];
            i += 2;
        }
        ranges.push((lo.min(hi), lo.max(hi)));
    }
}

/// The product of two patterns.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'p> {
    left: &'p Pattern,
    right: &'p Pattern,
}

impl Intersection<'_> {
    /// Whether some value matches both patterns.
    pub fn can_match(&self) -> bool {
        let (l, r) = (self.left, self.right);
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        for a in l.closure_of(0) {
            for b in r.closure_of(0) {
                if seen.insert((a, b)) {
                    queue.push_back((a, b));
                }
            }
        }

        while let Some((a, b)) = queue.pop_front() {
            if a == l.accept() && b == r.accept() {
                return true;
            }
            for byte in 0..=u8::MAX {
                let (Some(na), Some(nb)) = (l.step(a, byte), r.step(b, byte)) else {
                    continue;
                };
                for ca in l.closure_of(na) {
                    for cb in r.closure_of(nb) {
                        if seen.insert((ca, cb)) {
                            queue.push_back((ca, cb));
                        }
                    }
                }
            }
        }
        false
    }
}
