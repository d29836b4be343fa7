//! The editable line model.
//!
//! A [`Line`] is one logical line, made of one or more [`RawLine`]s joined
//! by backslash continuation. The checkers read the logical text; the
//! autofix engine edits the raw lines, so that writing a file back
//! preserves its physical layout.

use serde::{Deserialize, Serialize};

use crate::Location;

/// One physical line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// 1-based physical line number.
    pub lineno: u32,
    /// The text as read from the file, without the newline.
    pub orig: String,
    /// The current text, possibly modified by autofix.
    pub text: String,
    /// The line terminator as read: `"\r\n"`, `"\n"`, or empty at the
    /// end of a file without final newline.
    pub eol: &'static str,
}

impl RawLine {
    pub fn new(lineno: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            lineno,
            orig: text.clone(),
            text,
            eol: "\n",
        }
    }

    pub fn with_eol(mut self, eol: &'static str) -> Self {
        self.eol = eol;
        self
    }

    pub fn is_changed(&self) -> bool {
        self.orig != self.text
    }
}

/// One logical line of a file together with its pending insertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub filename: String,
    pub location: Location,
    pub raw: Vec<RawLine>,
    /// Lines inserted by autofix before this line.
    pub insert_before: Vec<String>,
    /// Lines inserted by autofix after this line.
    pub insert_after: Vec<String>,
}

impl Line {
    pub fn new(filename: impl Into<String>, raw: Vec<RawLine>) -> Self {
        let first = raw.first().map_or(0, |r| r.lineno);
        let last = raw.last().map_or(first, |r| r.lineno);
        Self {
            filename: filename.into(),
            location: Location::new(first, last),
            raw,
            insert_before: Vec::new(),
            insert_after: Vec::new(),
        }
    }

    /// Whether autofix has modified or extended this line.
    pub fn is_changed(&self) -> bool {
        !self.insert_before.is_empty()
            || !self.insert_after.is_empty()
            || self.raw.iter().any(RawLine::is_changed)
    }

    /// Append the current physical text of this line, including
    /// insertions, to `out`. Each raw line keeps its own terminator;
    /// inserted lines use the line's.
    pub fn write_to(&self, out: &mut String) {
        let newline = self.newline();
        for text in &self.insert_before {
            out.push_str(text);
            out.push_str(newline);
        }
        let last = self.raw.len().saturating_sub(1);
        for (i, raw) in self.raw.iter().enumerate() {
            out.push_str(&raw.text);
            if i == last && raw.eol.is_empty() && !self.insert_after.is_empty() {
                out.push_str(newline);
            } else {
                out.push_str(raw.eol);
            }
        }
        // The last insertion takes over a missing final newline.
        let final_eol = self.raw.last().map_or(newline, |raw| raw.eol);
        for (i, text) in self.insert_after.iter().enumerate() {
            out.push_str(text);
            if i + 1 == self.insert_after.len() {
                out.push_str(final_eol);
            } else {
                out.push_str(newline);
            }
        }
    }

    fn newline(&self) -> &'static str {
        self.raw
            .iter()
            .map(|raw| raw.eol)
            .find(|eol| !eol.is_empty())
            .unwrap_or("\n")
    }
}

/// A proposed textual edit, always attached to one diagnostic and one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    /// Replace `old` with `new`, only if `old` occurs exactly once in the line.
    Replace { old: String, new: String },
    /// Replace `old` with `new` at a fixed position of one raw line.
    ReplaceAt {
        raw_index: usize,
        text_index: usize,
        old: String,
        new: String,
    },
    InsertBefore { text: String },
    InsertAfter { text: String },
}
