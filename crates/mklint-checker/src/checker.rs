//! Per-file driver.
//!
//! [`Linter`] owns everything that lives for a whole run: the registry, the
//! options and the memo of names already reported as undefined. For each
//! file it creates a [`FileChecker`], which walks the logical lines in
//! source order and dispatches them to the assignment, expression and
//! condition checks.
//!
//! Entry points:
//! - [`Linter::check_mklines`] / [`Linter::check_text`] / [`Linter::check_file`]
//! - [`FileChecker::check_assignment`]
//! - [`FileChecker::check_condition`]
//! - [`FileChecker::check_expr`]

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use mklint_lexer::{tokenize, AssignOp, Assignment, Directive, Include, LineKind, MkLine, MkLines};
use mklint_types::line::Line;
use mklint_types::{DiagCode, Diagnostic, Diagnostics, MklintError, Result};
use regex::Regex;

use crate::autofix::{save_autofix_changes, Autofix};
use crate::cond::VarFact;
use crate::expr::{ExprContext, Timing};
use crate::options::{AutofixMode, CheckOptions};
use crate::registry::TypeRegistry;
use crate::scope::{for_values, FileScope, ScopeProvider};
use crate::shell::shell_exprs;
use crate::vartype::{BasicType, Permissions, VariableType};

/// A dotted version number such as `5.10` or `1.2.3`.
const VERSION_LITERAL: &str = r"^[0-9]+\.[0-9]+(\.[0-9]+)*$";

const PREFS_FILES: &[&str] = &["bsd.prefs.mk", "bsd.fast.prefs.mk"];

// ══════════════════════════════════════════════════════════════════════════════
// Run state
// ══════════════════════════════════════════════════════════════════════════════

/// State shared by all files of one run.
#[derive(Debug, Default)]
pub struct RunState {
    pub(crate) warned_undefined: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.warned_undefined.clear();
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Linter
// ══════════════════════════════════════════════════════════════════════════════

/// Checks files one after another.
#[derive(Debug)]
pub struct Linter {
    registry: TypeRegistry,
    options: CheckOptions,
    state: RunState,
    version: Regex,
}

impl Linter {
    /// A linter with the built-in registry.
    pub fn new(options: CheckOptions) -> Result<Self> {
        Self::with_registry(TypeRegistry::new()?, options)
    }

    pub fn with_registry(registry: TypeRegistry, options: CheckOptions) -> Result<Self> {
        let version = Regex::new(VERSION_LITERAL).map_err(|err| MklintError::InvalidPattern {
            pattern: VERSION_LITERAL.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            registry,
            options,
            state: RunState::new(),
            version,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Forget which names have already been reported.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// A checker for single lines of `filename`, for callers that drive the
    /// checks themselves.
    pub fn file_checker<'a>(
        &'a mut self,
        filename: &str,
        file_scope: &'a FileScope,
        scope: &'a dyn ScopeProvider,
        diags: &'a mut Diagnostics,
    ) -> FileChecker<'a> {
        FileChecker {
            registry: &self.registry,
            options: &self.options,
            scope,
            file_scope,
            state: &mut self.state,
            diags,
            version: &self.version,
            filename: filename.to_string(),
            prefs_seen: false,
            stack: Vec::new(),
            stack_broken: false,
        }
    }

    /// Check all lines of one file. In apply mode, fixes are applied to
    /// `mklines`.
    #[tracing::instrument(skip_all, fields(file = %mklines.filename))]
    pub fn check_mklines(&mut self, mklines: &mut MkLines, scope: &dyn ScopeProvider) -> Diagnostics {
        let mut diags = Diagnostics::empty();
        let file_scope = FileScope::collect(mklines);
        let filename = mklines.filename.clone();
        let mut checker = self.file_checker(&filename, &file_scope, scope, &mut diags);
        checker.check_lines(&mut mklines.lines);
        tracing::debug!(diagnostics = diags.len(), "file checked");
        diags
    }

    pub fn check_text(
        &mut self,
        filename: &str,
        text: &str,
        scope: &dyn ScopeProvider,
    ) -> (MkLines, Diagnostics) {
        let mut mklines = MkLines::parse(filename, text);
        let diags = self.check_mklines(&mut mklines, scope);
        (mklines, diags)
    }

    /// Read, check and, in apply mode, rewrite one file.
    pub fn check_file(&mut self, path: &Path, scope: &dyn ScopeProvider) -> Result<Diagnostics> {
        let text = fs::read_to_string(path).map_err(|source| MklintError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let (mklines, diags) = self.check_text(&path.display().to_string(), &text, scope);
        if self.options.autofix == AutofixMode::Apply {
            save_autofix_changes(path, &mklines)?;
        }
        Ok(diags)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// FileChecker
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    /// `.if` and its relatives, closed by `.endif`.
    Cond,
    /// `.for`, closed by `.endfor`.
    Loop,
}

/// An open `.if` or `.for` block.
#[derive(Debug, Clone)]
pub(crate) struct OpenBlock {
    pub kind: BlockKind,
    pub facts: Vec<VarFact>,
}

impl OpenBlock {
    fn new(kind: BlockKind, facts: Vec<VarFact>) -> Self {
        Self { kind, facts }
    }
}

/// Checks the lines of one file, in order.
pub struct FileChecker<'a> {
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) options: &'a CheckOptions,
    pub(crate) scope: &'a dyn ScopeProvider,
    pub(crate) file_scope: &'a FileScope,
    pub(crate) state: &'a mut RunState,
    pub(crate) diags: &'a mut Diagnostics,
    pub(crate) version: &'a Regex,
    pub(crate) filename: String,
    /// `bsd.prefs.mk` has been included.
    pub(crate) prefs_seen: bool,
    pub(crate) stack: Vec<OpenBlock>,
    /// The directives did not nest properly; contradictions are not
    /// checked until the next block that opens at depth 0.
    pub(crate) stack_broken: bool,
}

impl FileChecker<'_> {
    pub fn check_lines(&mut self, lines: &mut [MkLine]) {
        for mkline in lines.iter_mut() {
            let kind = mkline.kind.clone();
            let line = &mut mkline.line;
            match &kind {
                LineKind::Assignment(assign) => self.check_assignment(line, assign),
                LineKind::ShellCommand { text } => self.check_shell_command(line, text),
                LineKind::Directive(directive) => self.check_directive(line, directive),
                LineKind::Include(include) => self.check_include(include),
                _ => {}
            }
        }

        if let Some(last) = lines.last() {
            if !self.stack.is_empty() {
                let depth = self.stack.len();
                self.report(
                    &last.line,
                    DiagCode::UNCLOSED_DIRECTIVE,
                    format!("Directive indentation is not 0, but {depth}."),
                );
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Assignments
    // ══════════════════════════════════════════════════════════════════════

    pub fn check_assignment(&mut self, line: &mut Line, assign: &Assignment) {
        let registry = self.registry;
        if self.options.warn_extra {
            if let Some(instructions) = registry.deprecated(&assign.varname) {
                self.report(
                    line,
                    DiagCode::DEPRECATED_DEFINITION,
                    format!("Definition of {} is deprecated. {instructions}", assign.varname),
                );
            }
        }

        let vartype = registry.lookup(&assign.varname);
        if let Some(vartype) = vartype {
            if self.options.warn_perm {
                self.check_assignment_permissions(line, assign, vartype);
            }
        }

        let timing = if assign.op.evaluates_at_load_time() {
            Timing::LoadTime
        } else {
            Timing::RunTime
        };
        let mut ctx = ExprContext::new(timing);
        if let Some(vartype) = vartype {
            ctx = ctx.expecting(&assign.varname, vartype);
        }
        let shell = assign.op == AssignOp::Shell
            || vartype.is_some_and(|vt| {
                matches!(
                    vt.basic,
                    BasicType::ShellCommand | BasicType::ShellCommands | BasicType::ShellWord
                )
            });
        self.check_value(line, &assign.value, &ctx, shell);
    }

    fn check_assignment_permissions(
        &mut self,
        line: &Line,
        assign: &Assignment,
        vartype: &VariableType,
    ) {
        if vartype.is_guessed() || self.scope.is_infrastructure() {
            return;
        }
        let (needed, verb, code) = match assign.op {
            AssignOp::Append => (Permissions::APPEND, "appended to", DiagCode::APPEND_NOT_ALLOWED),
            _ => (Permissions::SET, "set", DiagCode::SET_NOT_ALLOWED),
        };
        if vartype.effective_permissions(&self.filename).contains(needed) {
            return;
        }
        let files = vartype.alternative_files(needed);
        let message = if files.is_empty() {
            format!("The variable {} should not be {verb} in any file.", assign.varname)
        } else {
            format!(
                "The variable {} should not be {verb} in this file; it would be ok in {files}.",
                assign.varname
            )
        };
        self.report(line, code, message);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Values and shell commands
    // ══════════════════════════════════════════════════════════════════════

    pub fn check_shell_command(&mut self, line: &mut Line, text: &str) {
        self.check_value(line, text, &ExprContext::new(Timing::RunTime), true);
    }

    /// Check every reference in `text`. In shell text, each reference gets
    /// the quoting state at its position.
    fn check_value(&mut self, line: &mut Line, text: &str, ctx: &ExprContext<'_>, shell: bool) {
        let rest = if shell {
            let (exprs, rest) = shell_exprs(text);
            for found in &exprs {
                let ctx = ctx.quoted(found.quoting, found.is_word_part);
                self.check_expr(line, &found.expr, &ctx);
            }
            rest
        } else {
            let tokens = tokenize(text);
            for expr in tokens.exprs() {
                self.check_expr(line, expr, ctx);
            }
            tokens.rest
        };
        if !rest.is_empty() {
            self.report_unclosed(line, &rest);
        }
    }

    fn report_unclosed(&mut self, line: &Line, rest: &str) {
        let (body, close) = match rest.get(..2) {
            Some("$(") => (&rest[2..], ')'),
            _ => (rest.get(2..).unwrap_or_default(), '}'),
        };
        let name_len = body.find([':', '}', ')']).unwrap_or(body.len());
        let name = &body[..name_len];
        self.report(
            line,
            DiagCode::UNCLOSED_EXPRESSION,
            format!("Missing closing \"{close}\" for \"{name}\"."),
        );
    }

    // ══════════════════════════════════════════════════════════════════════
    // Directives
    // ══════════════════════════════════════════════════════════════════════

    fn check_include(&mut self, include: &Include) {
        let basename = Path::new(&include.path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if PREFS_FILES.contains(&basename) {
            self.prefs_seen = true;
        }
    }

    fn check_directive(&mut self, line: &mut Line, directive: &Directive) {
        match directive.name.as_str() {
            "if" => {
                self.begin_block();
                let facts = self.check_condition(line, "if", &directive.args);
                self.stack.push(OpenBlock::new(BlockKind::Cond, facts));
            }
            "elif" => {
                let open = self.top_is(BlockKind::Cond);
                if !open {
                    self.unmatched(line, "elif");
                }
                let facts = self.check_condition(line, "elif", &directive.args);
                if let Some(top) = self.stack.last_mut().filter(|_| open) {
                    top.facts = facts;
                }
            }
            "ifdef" | "ifndef" | "ifmake" | "ifnmake" => {
                self.begin_block();
                self.stack.push(OpenBlock::new(BlockKind::Cond, Vec::new()));
            }
            "else" => {
                if !self.top_is(BlockKind::Cond) {
                    self.unmatched(line, "else");
                } else if let Some(top) = self.stack.last_mut() {
                    top.facts.clear();
                }
            }
            "endif" => self.close_block(line, BlockKind::Cond, "endif"),
            "for" => {
                self.begin_block();
                let ctx = ExprContext::new(Timing::LoadTime);
                self.check_value(line, for_values(&directive.args), &ctx, false);
                self.stack.push(OpenBlock::new(BlockKind::Loop, Vec::new()));
            }
            "endfor" => self.close_block(line, BlockKind::Loop, "endfor"),
            _ => {}
        }
    }

    /// A block opening at depth 0 starts a fresh nesting.
    fn begin_block(&mut self) {
        if self.stack.is_empty() {
            self.stack_broken = false;
        }
    }

    fn top_is(&self, kind: BlockKind) -> bool {
        self.stack.last().is_some_and(|top| top.kind == kind)
    }

    fn close_block(&mut self, line: &Line, kind: BlockKind, name: &str) {
        if self.top_is(kind) {
            self.stack.pop();
        } else {
            self.unmatched(line, name);
        }
    }

    fn unmatched(&mut self, line: &Line, name: &str) {
        self.report(
            line,
            DiagCode::UNMATCHED_DIRECTIVE,
            format!("Unmatched .{name}."),
        );
        if !self.stack_broken {
            tracing::debug!(
                file = %self.filename,
                line = %line.location,
                directive = name,
                "unbalanced directives, contradiction detection disabled for this nesting"
            );
            self.stack_broken = true;
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Reporting
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn basename(&self) -> &str {
        Path::new(&self.filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.filename)
    }

    pub(crate) fn diag(&self, line: &Line, code: DiagCode, message: impl Into<String>) -> Diagnostic {
        let diag = Diagnostic::new(self.filename.clone(), line.location, code, message);
        let explanation = explanation(code);
        if self.options.explain && !explanation.is_empty() {
            diag.with_explanation(explanation)
        } else {
            diag
        }
    }

    pub(crate) fn report(&mut self, line: &Line, code: DiagCode, message: impl Into<String>) {
        let diag = self.diag(line, code, message);
        self.diags.push(diag);
    }

    pub(crate) fn fix(&mut self, line: &mut Line, fix: Autofix) {
        fix.emit(line, self.options.autofix, self.diags);
    }
}

/// Explanations shown when the caller asks for them.
fn explanation(code: DiagCode) -> &'static [&'static str] {
    match code {
        DiagCode::USED_NOT_DEFINED => &[
            "The variable is neither assigned in this file nor in the package,",
            "and it is not one of the well-known variables.",
        ],
        DiagCode::PREFS_REQUIRED => &[
            "The variable is only defined after bsd.prefs.mk has been",
            "included. Before that, conditions that use it see an empty value.",
        ],
        DiagCode::TOOL_AT_LOADTIME => &[
            "Tools are found while the package is set up. Their variables",
            "are empty before bsd.prefs.mk has been included.",
        ],
        DiagCode::USE_INDIRECT_LOADTIME => &[
            "The target variable may be used at load time, for example in a",
            "condition. At that point the value of this variable is not",
            "known yet.",
        ],
        DiagCode::LIST_IN_WORD => &[
            "The value of a list variable consists of several words. When it",
            "is glued to other text, only its first and last word are",
            "affected by that text.",
        ],
        DiagCode::QUOTE_MISPLACED => &[
            "The :Q modifier quotes for the shell already. Inside other quotes,",
            "the backslashes it adds become part of the value.",
        ],
        DiagCode::NUMERIC_VERSION_COMPARISON | DiagCode::VERSION_STRING_COMPARISON => &[
            "Version numbers are neither numbers nor strings. A numeric",
            "comparison treats 5.10 as less than 5.9, and a string comparison",
            "does not match 5.10.1. A pattern such as ${OS_VERSION:M5.10*}",
            "states the intention precisely.",
        ],
        DiagCode::CONTRADICTION => &[
            "The two conditions can never be true at the same time, so the",
            "lines they guard are never used.",
        ],
        _ => &[],
    }
}
