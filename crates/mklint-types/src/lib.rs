//! Shared types for mklint.
//!
//! This crate defines the line model, variable references, the
//! arena-backed condition tree, diagnostics and the crate-wide error type
//! used across all analysis stages.

mod error;
mod span;
pub mod cond;
pub mod line;
pub mod varref;

pub use error::{DiagCategory, DiagCode, Diagnostic, Diagnostics, FixReport, MklintError, Severity};
pub use span::{Location, SourceFile, Span};

/// Result type used throughout mklint.
pub type Result<T> = std::result::Result<T, MklintError>;
