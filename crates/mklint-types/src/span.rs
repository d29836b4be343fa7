use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte range inside the text of a single logical line or condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered.
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The covered text, or `""` if the span does not fit `text`.
    pub fn slice(self, text: &str) -> &str {
        text.get(self.start..self.end).unwrap_or("")
    }
}

/// The physical line numbers covered by one logical line.
///
/// Line numbers are 1-based. A logical line made of continuation lines
/// covers more than one physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub first: u32,
    pub last: u32,
}

impl Location {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// A location covering exactly one physical line.
    pub fn line(lineno: u32) -> Self {
        Self::new(lineno, lineno)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}--{}", self.first, self.last)
        }
    }
}

/// Holds the text of one file for line-based access.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Extract a physical line by 1-based line number, without its newline.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// The terminator of a physical line as it appears in the source:
    /// `"\r\n"`, `"\n"`, or empty for a last line without newline.
    pub fn terminator(&self, line_number: u32) -> &'static str {
        let Some(idx) = line_number.checked_sub(1).map(|i| i as usize) else {
            return "";
        };
        let Some(&start) = self.line_starts.get(idx) else {
            return "";
        };
        match self.line_starts.get(idx + 1) {
            Some(&next) if self.source[start..next].ends_with("\r\n") => "\r\n",
            Some(_) => "\n",
            None if self.source[start..].ends_with('\r') => "\r",
            None => "",
        }
    }

    /// Number of physical lines. A trailing newline does not start a new line.
    pub fn line_count(&self) -> usize {
        if self.source.ends_with('\n') {
            self.line_starts.len() - 1
        } else {
            self.line_starts.len()
        }
    }

    /// Iterate over `(lineno, text)` pairs of all physical lines.
    pub fn lines(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        (1..=self.line_count() as u32).filter_map(move |n| self.line(n).map(|text| (n, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(2, 7));
        assert_eq!(merged, Span::new(2, 10));
        assert_eq!(merged.len(), 8);
    }

    #[test]
    fn test_span_slice_out_of_range() {
        assert_eq!(Span::new(0, 3).slice("abcdef"), "abc");
        assert_eq!(Span::new(4, 30).slice("abcdef"), "");
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::line(3).to_string(), "3");
        assert_eq!(Location::new(3, 5).to_string(), "3--5");
    }

    #[test]
    fn test_source_file_lines() {
        let src = SourceFile::new("Makefile", "A=1\r\nB=2\n");
        assert_eq!(src.line_count(), 2);
        assert_eq!(src.line(1), Some("A=1"));
        assert_eq!(src.line(2), Some("B=2"));
        assert_eq!(src.line(3), None);
        assert_eq!(src.line(0), None);
    }

    #[test]
    fn test_line_terminators() {
        let src = SourceFile::new("Makefile", "A=1\r\nB=2\nC=3");
        assert_eq!(src.terminator(1), "\r\n");
        assert_eq!(src.terminator(2), "\n");
        assert_eq!(src.terminator(3), "");
        assert_eq!(src.terminator(4), "");
        assert_eq!(SourceFile::new("Makefile", "A=1\r").terminator(1), "\r");
    }

    #[test]
    fn test_source_file_without_trailing_newline() {
        let src = SourceFile::new("Makefile", "a\nb");
        let lines: Vec<_> = src.lines().collect();
        assert_eq!(lines, vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn test_source_file_empty() {
        let src = SourceFile::new("Makefile", "");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
    }
}
