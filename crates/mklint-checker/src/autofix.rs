//! Fixes attached to diagnostics.
//!
//! An [`Autofix`] collects the edits for exactly one diagnostic on exactly
//! one line. [`Autofix::emit`] reports the diagnostic and, depending on the
//! [`AutofixMode`], renders the edits or applies them to the line.
//!
//! An edit whose target text cannot be found unambiguously is skipped; its
//! diagnostic is reported all the same.

use std::fs;
use std::path::Path;

use mklint_lexer::MkLines;
use mklint_types::line::{Edit, Line};
use mklint_types::{Diagnostic, Diagnostics, FixReport, MklintError, Result};

use crate::options::AutofixMode;

/// Where an edit takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Raw { index: usize, pos: usize },
    Before,
    After,
}

/// A diagnostic together with the edits that fix it.
#[derive(Debug, Clone)]
pub struct Autofix {
    diag: Diagnostic,
    edits: Vec<Edit>,
}

impl Autofix {
    pub fn new(diag: Diagnostic) -> Self {
        Self {
            diag,
            edits: Vec::new(),
        }
    }

    /// Replace `old` with `new` if `old` occurs exactly once in the line.
    pub fn replace(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.edits.push(Edit::Replace {
            old: old.into(),
            new: new.into(),
        });
        self
    }

    /// Replace `old` with `new` at a fixed position of one physical line.
    pub fn replace_at(
        mut self,
        raw_index: usize,
        text_index: usize,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        self.edits.push(Edit::ReplaceAt {
            raw_index,
            text_index,
            old: old.into(),
            new: new.into(),
        });
        self
    }

    pub fn insert_before(mut self, text: impl Into<String>) -> Self {
        self.edits.push(Edit::InsertBefore { text: text.into() });
        self
    }

    pub fn insert_after(mut self, text: impl Into<String>) -> Self {
        self.edits.push(Edit::InsertAfter { text: text.into() });
        self
    }

    /// Report the diagnostic, handling its edits according to `mode`.
    pub fn emit(self, line: &mut Line, mode: AutofixMode, diags: &mut Diagnostics) {
        let Autofix { mut diag, edits } = self;
        if edits.is_empty() {
            diags.push(diag);
            return;
        }

        let mut report = FixReport {
            edits: edits.clone(),
            preview: Vec::new(),
            applied: false,
        };
        if mode != AutofixMode::Off {
            for edit in &edits {
                let Some(target) = locate(line, edit) else {
                    tracing::debug!(
                        file = %line.filename,
                        line = %line.location,
                        ?edit,
                        "autofix target not found exactly once, edit skipped"
                    );
                    continue;
                };
                report.preview.push(describe(edit));
                if mode == AutofixMode::Apply {
                    apply(line, edit, target);
                    report.applied = true;
                }
            }
        }
        diag.fix = Some(report);
        diags.push(diag);
    }
}

/// A one-line description of an edit.
pub fn describe(edit: &Edit) -> String {
    match edit {
        Edit::Replace { old, new } | Edit::ReplaceAt { old, new, .. } => {
            format!("Replacing \"{old}\" with \"{new}\".")
        }
        Edit::InsertBefore { text } => format!("Inserting a line \"{text}\" before this line."),
        Edit::InsertAfter { text } => format!("Inserting a line \"{text}\" after this line."),
    }
}

fn locate(line: &Line, edit: &Edit) -> Option<Target> {
    match edit {
        Edit::Replace { old, .. } => {
            if old.is_empty() {
                return None;
            }
            let mut found = None;
            let mut count = 0;
            for (index, raw) in line.raw.iter().enumerate() {
                for (pos, _) in raw.text.match_indices(old.as_str()) {
                    count += 1;
                    found = Some(Target::Raw { index, pos });
                }
            }
            if count == 1 {
                found
            } else {
                None
            }
        }
        Edit::ReplaceAt {
            raw_index,
            text_index,
            old,
            ..
        } => {
            let text = &line.raw.get(*raw_index)?.text;
            text.get(*text_index..)?
                .starts_with(old.as_str())
                .then_some(Target::Raw {
                    index: *raw_index,
                    pos: *text_index,
                })
        }
        Edit::InsertBefore { .. } => Some(Target::Before),
        Edit::InsertAfter { .. } => Some(Target::After),
    }
}

fn apply(line: &mut Line, edit: &Edit, target: Target) {
    match (edit, target) {
        (Edit::Replace { old, new } | Edit::ReplaceAt { old, new, .. }, Target::Raw { index, pos }) => {
            if let Some(raw) = line.raw.get_mut(index) {
                raw.text.replace_range(pos..pos + old.len(), new);
            }
        }
        (Edit::InsertBefore { text }, _) => line.insert_before.push(text.clone()),
        (Edit::InsertAfter { text }, _) => line.insert_after.push(text.clone()),
        _ => {}
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Saving
// ══════════════════════════════════════════════════════════════════════════════

/// Write `mklines` to `path` if autofix changed any of its lines.
///
/// Returns whether the file was written.
pub fn save_autofix_changes(path: &Path, mklines: &MkLines) -> Result<bool> {
    if !mklines.is_changed() {
        return Ok(false);
    }
    fs::write(path, mklines.to_text()).map_err(|source| MklintError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), "autofix changes saved");
    Ok(true)
}
