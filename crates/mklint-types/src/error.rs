use crate::line::Edit;
use crate::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARN"),
            Self::Note => write!(f, "NOTE"),
        }
    }
}

/// Diagnostic category, determined by code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagCategory {
    Syntax,
    Definedness,
    Permission,
    Quoting,
    Type,
    Simplification,
    Contradiction,
}

impl fmt::Display for DiagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "syntax",
            Self::Definedness => "definedness",
            Self::Permission => "permission",
            Self::Quoting => "quoting",
            Self::Type => "type",
            Self::Simplification => "simplification",
            Self::Contradiction => "contradiction",
        };
        f.write_str(name)
    }
}

/// Numeric diagnostic code (MK100–MK799).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiagCode(pub u16);

impl DiagCode {
    // ── Syntax (MK100–MK199) ──
    pub const INVALID_CONDITION: Self = Self(100);
    pub const UNCLOSED_EXPRESSION: Self = Self(101);
    pub const UNMATCHED_DIRECTIVE: Self = Self(102);
    pub const UNCLOSED_DIRECTIVE: Self = Self(103);

    // ── Definedness (MK200–MK299) ──
    pub const USED_NOT_DEFINED: Self = Self(200);
    pub const DEPRECATED_DEFINITION: Self = Self(201);

    // ── Permission and timing (MK300–MK399) ──
    pub const SET_NOT_ALLOWED: Self = Self(300);
    pub const APPEND_NOT_ALLOWED: Self = Self(301);
    pub const USE_NOT_ALLOWED: Self = Self(302);
    pub const USE_INDIRECT_LOADTIME: Self = Self(303);
    pub const TOOL_AT_LOADTIME: Self = Self(304);
    pub const PREFS_REQUIRED: Self = Self(305);
    pub const USE_AT_LOADTIME_NOWHERE: Self = Self(306);

    // ── Quoting (MK400–MK499) ──
    pub const QUOTE_NEEDED: Self = Self(400);
    pub const QUOTE_REDUNDANT: Self = Self(401);
    pub const QUOTE_MISPLACED: Self = Self(402);
    pub const LIST_IN_WORD: Self = Self(403);

    // ── Types (MK500–MK599) ──
    pub const INCOMPATIBLE_TYPES: Self = Self(500);
    pub const PATTERN_NEVER_MATCHES: Self = Self(501);

    // ── Simplification (MK600–MK699) ──
    pub const REDUNDANT_PARENS: Self = Self(600);
    pub const REDUNDANT_DEFINED: Self = Self(601);
    pub const EMPTY_WITH_EXPRESSION: Self = Self(602);
    pub const NOT_EMPTY_SIMPLER: Self = Self(603);
    pub const NEGATED_COMPARISON: Self = Self(604);
    pub const NUMERIC_VERSION_COMPARISON: Self = Self(605);
    pub const VERSION_STRING_COMPARISON: Self = Self(606);

    // ── Contradiction (MK700–MK799) ──
    pub const CONTRADICTION: Self = Self(700);

    /// Get the category for this code.
    pub fn category(self) -> DiagCategory {
        match self.0 {
            100..=199 => DiagCategory::Syntax,
            200..=299 => DiagCategory::Definedness,
            300..=399 => DiagCategory::Permission,
            400..=499 => DiagCategory::Quoting,
            500..=599 => DiagCategory::Type,
            600..=699 => DiagCategory::Simplification,
            _ => DiagCategory::Contradiction,
        }
    }

    /// The severity every diagnostic with this code is reported with.
    pub fn severity(self) -> Severity {
        match self {
            Self::INVALID_CONDITION
            | Self::UNMATCHED_DIRECTIVE
            | Self::UNCLOSED_DIRECTIVE
            | Self::USE_AT_LOADTIME_NOWHERE => Severity::Error,
            Self::QUOTE_REDUNDANT
            | Self::REDUNDANT_PARENS
            | Self::REDUNDANT_DEFINED
            | Self::NOT_EMPTY_SIMPLER
            | Self::NEGATED_COMPARISON => Severity::Note,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MK{}", self.0)
    }
}

/// What happened to the edits proposed together with a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixReport {
    /// The proposed edits, in the order they were recorded.
    pub edits: Vec<Edit>,
    /// Human-readable descriptions of the edits, filled in preview mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<String>,
    /// Whether at least one edit was applied to the line buffer.
    pub applied: bool,
}

/// A single diagnostic emitted by one of the checkers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub location: Location,
    pub code: DiagCode,
    pub severity: Severity,
    pub category: DiagCategory,
    pub message: String,
    /// Paragraphs of explanation, only filled when explanations are requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explanation: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<FixReport>,
}

impl Diagnostic {
    /// Create a new diagnostic; severity and category follow from the code.
    pub fn new(
        file: impl Into<String>,
        location: Location,
        code: DiagCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            location,
            code,
            severity: code.severity(),
            category: code.category(),
            message: message.into(),
            explanation: Vec::new(),
            fix: None,
        }
    }

    pub fn with_explanation(mut self, lines: &[&str]) -> Self {
        self.explanation = lines.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}:{}: {}",
            self.severity, self.file, self.location, self.message
        )
    }
}

/// The shared sink all checkers report to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_notes: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.total_errors += 1,
            Severity::Warning => self.total_warnings += 1,
            Severity::Note => self.total_notes += 1,
        }
        self.items.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics with the given code.
    pub fn with_code(&self, code: DiagCode) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.code == code)
    }

    /// Append all diagnostics of `other`, keeping their order.
    pub fn extend(&mut self, other: Diagnostics) {
        for diag in other.items {
            self.push(diag);
        }
    }
}

/// Errors that stop an operation, as opposed to diagnostics about the input.
#[derive(Debug, Error)]
pub enum MklintError {
    #[error("invalid ACL rule {rule:?} for {varname}: {reason}")]
    InvalidAcl {
        varname: String,
        rule: String,
        reason: String,
    },
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_category() {
        assert_eq!(DiagCode::INVALID_CONDITION.category(), DiagCategory::Syntax);
        assert_eq!(DiagCode::USED_NOT_DEFINED.category(), DiagCategory::Definedness);
        assert_eq!(DiagCode::USE_NOT_ALLOWED.category(), DiagCategory::Permission);
        assert_eq!(DiagCode::LIST_IN_WORD.category(), DiagCategory::Quoting);
        assert_eq!(DiagCode::INCOMPATIBLE_TYPES.category(), DiagCategory::Type);
        assert_eq!(DiagCode::REDUNDANT_PARENS.category(), DiagCategory::Simplification);
        assert_eq!(DiagCode::CONTRADICTION.category(), DiagCategory::Contradiction);
    }

    #[test]
    fn test_code_display() {
        assert_eq!(DiagCode::CONTRADICTION.to_string(), "MK700");
    }

    #[test]
    fn test_permission_severity_increases() {
        assert_eq!(DiagCode::USE_NOT_ALLOWED.severity(), Severity::Warning);
        assert_eq!(DiagCode::USE_AT_LOADTIME_NOWHERE.severity(), Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Note);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            "Makefile",
            Location::line(3),
            DiagCode::USED_NOT_DEFINED,
            "FOO is used but not defined.",
        );
        assert_eq!(diag.to_string(), "WARN: Makefile:3: FOO is used but not defined.");
    }

    #[test]
    fn test_diagnostics_counts() {
        let mut diags = Diagnostics::empty();
        diags.push(Diagnostic::new("a", Location::line(1), DiagCode::INVALID_CONDITION, "x"));
        diags.push(Diagnostic::new("a", Location::line(2), DiagCode::QUOTE_REDUNDANT, "y"));
        diags.push(Diagnostic::new("a", Location::line(3), DiagCode::LIST_IN_WORD, "z"));
        assert!(diags.has_errors());
        assert_eq!((diags.total_errors, diags.total_warnings, diags.total_notes), (1, 1, 1));
        assert_eq!(diags.with_code(DiagCode::LIST_IN_WORD).count(), 1);
    }

    #[test]
    fn test_diagnostic_json() {
        let diag = Diagnostic::new(
            "Makefile",
            Location::new(2, 4),
            DiagCode::CONTRADICTION,
            "The patterns \"a\" and \"b\" cannot match at the same time.",
        );
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"category\":\"contradiction\""));
        assert!(!json.contains("explanation"));
        assert!(!json.contains("\"fix\""));

        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diag);
    }

    #[test]
    fn test_error_display() {
        let err = MklintError::InvalidAcl {
            varname: "OPSYS".into(),
            rule: "Makefile use".into(),
            reason: "missing \":\"".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid ACL rule \"Makefile use\" for OPSYS: missing \":\""
        );
    }
}
