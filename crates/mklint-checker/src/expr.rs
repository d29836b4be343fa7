//! Checks for a single variable reference.
//!
//! Every reference in a value, a shell command or a condition passes
//! through [`FileChecker::check_expr`] together with an [`ExprContext`]
//! describing when it is evaluated, where its value goes and which quotes
//! surround it. The sub-checks are independent of each other; each can be
//! switched off in the [`CheckOptions`](crate::options::CheckOptions).

use mklint_lexer::lines::varname_canon;
use mklint_lexer::tokenize;
use mklint_types::line::Line;
use mklint_types::varref::{ModifierKind, VarRef};
use mklint_types::DiagCode;

use crate::autofix::Autofix;
use crate::checker::FileChecker;
use crate::pattern::Pattern;
use crate::registry::ToolValidity;
use crate::vartype::{BasicType, Permissions, VariableType};

// ══════════════════════════════════════════════════════════════════════════════
// Context
// ══════════════════════════════════════════════════════════════════════════════

/// When the value of a reference is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// While the file is being loaded: conditions, `:=`, `!=`, `.for`.
    LoadTime,
    /// When the commands run.
    RunTime,
}

/// The quotes surrounding a reference in shell text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Plain,
    Dquot,
    Squot,
    Backt,
    /// Not shell text at all.
    Unknown,
}

/// The variable a reference is assigned to.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedType<'e> {
    pub varname: &'e str,
    pub vartype: &'e VariableType,
}

#[derive(Debug, Clone, Copy)]
pub struct ExprContext<'e> {
    pub expected: Option<ExpectedType<'e>>,
    pub timing: Timing,
    pub quoting: Quoting,
    /// The reference is glued to other characters of one shell word.
    pub is_word_part: bool,
}

impl<'e> ExprContext<'e> {
    pub fn new(timing: Timing) -> Self {
        Self {
            expected: None,
            timing,
            quoting: Quoting::Unknown,
            is_word_part: false,
        }
    }

    pub fn expecting(mut self, varname: &'e str, vartype: &'e VariableType) -> Self {
        self.expected = Some(ExpectedType { varname, vartype });
        self
    }

    pub fn quoted(mut self, quoting: Quoting, is_word_part: bool) -> Self {
        self.quoting = quoting;
        self.is_word_part = is_word_part;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NeedsQuoting {
    Yes,
    No,
    DontKnow,
}

fn needs_quoting(vartype: &VariableType) -> NeedsQuoting {
    let basic = vartype.basic;
    if vartype.is_list() {
        NeedsQuoting::DontKnow
    } else if basic.is_shell_safe()
        || matches!(basic, BasicType::ShellCommand | BasicType::ShellCommands)
    {
        NeedsQuoting::No
    } else if basic.may_need_quoting() {
        NeedsQuoting::Yes
    } else {
        NeedsQuoting::DontKnow
    }
}

/// Variables provided by make itself: `${.CURDIR}`, `$@`, `$<`.
fn is_builtin(varname: &str) -> bool {
    varname.starts_with('.') || varname.chars().count() == 1
}

/// Targets that may hold the path of a shell even though a command is not a
/// plain value in general.
const SHELL_PATH_TARGETS: &[&str] = &["PKG_SHELL", "PKG_SHELL.*"];
const SHELL_PATH_SOURCES: &[&str] = &["SH", "BASH", "TOOLS_PLATFORM.sh"];

// ══════════════════════════════════════════════════════════════════════════════
// Checks
// ══════════════════════════════════════════════════════════════════════════════

impl FileChecker<'_> {
    /// Check one reference.
    pub fn check_expr(&mut self, line: &mut Line, expr: &VarRef, ctx: &ExprContext<'_>) {
        self.check_nested(line, expr, ctx.timing);
        if self.options.warn_extra {
            self.check_defined(line, expr);
        }
        if self.file_scope.is_loop_var(&expr.name) {
            return;
        }
        let registry = self.registry;
        let Some(vartype) = registry.lookup(&expr.name) else {
            return;
        };
        if self.options.warn_perm {
            self.check_permissions(line, expr, vartype, ctx);
        }
        if self.options.warn_quoting && ctx.quoting != Quoting::Unknown {
            self.check_quoting(line, expr, vartype, ctx);
        }
        if self.options.warn_types {
            self.check_assignable(line, expr, vartype, ctx);
            self.check_enum_patterns(line, expr, vartype);
        }
    }

    /// References inside the name or the modifiers, as in
    /// `${PKG_OPTIONS.${PKGBASE}}` or `${A:M${B}}`, are evaluated together
    /// with the outer one.
    fn check_nested(&mut self, line: &mut Line, expr: &VarRef, timing: Timing) {
        let ctx = ExprContext::new(timing);
        let parts = std::iter::once(expr.name.as_str())
            .chain(expr.modifiers.iter().map(|m| m.text.as_str()));
        for part in parts {
            let tokens = tokenize(part);
            for nested in tokens.exprs() {
                self.check_expr(line, nested, &ctx);
            }
        }
    }

    // ── Definedness ──

    fn check_defined(&mut self, line: &Line, expr: &VarRef) {
        let name = expr.name.as_str();
        if name.is_empty() || expr.is_parameterized() || is_builtin(name) {
            return;
        }
        let known = self.file_scope.is_defined(name)
            || self.scope.is_defined(name)
            || self.registry.declared(name).is_some()
            || self.registry.deprecated(name).is_some();
        if known || !self.state.warned_undefined.insert(name.to_string()) {
            return;
        }
        self.report(
            line,
            DiagCode::USED_NOT_DEFINED,
            format!("{name} is used but not defined."),
        );
    }

    // ── Permissions and timing ──

    fn check_permissions(
        &mut self,
        line: &Line,
        expr: &VarRef,
        vartype: &VariableType,
        ctx: &ExprContext<'_>,
    ) {
        if vartype.is_guessed() || self.scope.is_infrastructure() {
            return;
        }
        let name = expr.name.as_str();
        let load_time = ctx.timing == Timing::LoadTime;

        if load_time {
            if let Some(tool) = self.registry.tool_by_varname(name) {
                let message = match tool.validity {
                    ToolValidity::AfterPrefsMk if self.prefs_seen => return,
                    ToolValidity::AfterPrefsMk => format!(
                        "To use the tool ${{{name}}} at load time, bsd.prefs.mk has to be included before."
                    ),
                    ToolValidity::AtRunTime => {
                        format!("The tool ${{{name}}} cannot be used at load time.")
                    }
                };
                self.report(line, DiagCode::TOOL_AT_LOADTIME, message);
                return;
            }
        }

        let perms = vartype.effective_permissions(&self.filename);
        if perms.contains(Permissions::USE_LOADTIME) {
            let opts = vartype.options;
            if load_time
                && !self.prefs_seen
                && (opts.system_provided || opts.user_settable)
                && !opts.always_in_scope
                && self.basename() == "Makefile"
            {
                self.report(
                    line,
                    DiagCode::PREFS_REQUIRED,
                    format!(
                        "To use {name} at load time, .include \"../../mk/bsd.prefs.mk\" first."
                    ),
                );
            }
            return;
        }

        let union = vartype.union();
        if load_time {
            if union.contains(Permissions::USE_LOADTIME) {
                let files = vartype.alternative_files(Permissions::USE_LOADTIME);
                self.report(
                    line,
                    DiagCode::USE_NOT_ALLOWED,
                    format!(
                        "{name} should not be used at load time in this file; it would be ok in {files}."
                    ),
                );
            } else {
                self.report(
                    line,
                    DiagCode::USE_AT_LOADTIME_NOWHERE,
                    format!("{name} should not be used at load time in any file."),
                );
            }
            return;
        }

        if perms.contains(Permissions::USE) {
            if let Some(target) = ctx.expected {
                if !target.vartype.is_guessed()
                    && target.vartype.union().contains(Permissions::USE_LOADTIME)
                {
                    self.report(
                        line,
                        DiagCode::USE_INDIRECT_LOADTIME,
                        format!(
                            "{name} should not be used indirectly at load time (via {}).",
                            target.varname
                        ),
                    );
                }
            }
            return;
        }

        let message = if union.contains(Permissions::USE) {
            let files = vartype.alternative_files(Permissions::USE);
            format!("{name} should not be used in this file; it would be ok in {files}.")
        } else if union.intersects(Permissions::SET | Permissions::APPEND) {
            format!("{name} should not be used in any file; it is a write-only variable.")
        } else {
            format!("{name} should not be used in any file.")
        };
        self.report(line, DiagCode::USE_NOT_ALLOWED, message);
    }

    // ── Quoting ──

    fn check_quoting(
        &mut self,
        line: &mut Line,
        expr: &VarRef,
        vartype: &VariableType,
        ctx: &ExprContext<'_>,
    ) {
        let quoted = expr.has_quote();

        if vartype.is_list() && ctx.is_word_part && ctx.quoting == Quoting::Plain && !quoted {
            self.report(
                line,
                DiagCode::LIST_IN_WORD,
                format!(
                    "The list variable {} should not be embedded in a word.",
                    expr.name
                ),
            );
            return;
        }

        if quoted && matches!(ctx.quoting, Quoting::Dquot | Quoting::Squot | Quoting::Backt) {
            self.report(
                line,
                DiagCode::QUOTE_MISPLACED,
                format!("Please move {expr} outside of any quoting characters."),
            );
            return;
        }

        if ctx.quoting != Quoting::Plain {
            return;
        }
        match needs_quoting(vartype) {
            NeedsQuoting::No if quoted => {
                let plain = expr.without_quote();
                let diag = self.diag(
                    line,
                    DiagCode::QUOTE_REDUNDANT,
                    format!("The :Q modifier isn't necessary for {plain} here."),
                );
                self.fix(
                    line,
                    Autofix::new(diag).replace(expr.to_string(), plain.to_string()),
                );
            }
            NeedsQuoting::Yes if !quoted => {
                let with_quote = expr.with_quote();
                let diag = self.diag(
                    line,
                    DiagCode::QUOTE_NEEDED,
                    format!("Please use {with_quote} instead of {expr}."),
                );
                self.fix(
                    line,
                    Autofix::new(diag).replace(expr.to_string(), with_quote.to_string()),
                );
            }
            _ => {}
        }
    }

    // ── Types ──

    fn check_assignable(
        &mut self,
        line: &Line,
        expr: &VarRef,
        vartype: &VariableType,
        ctx: &ExprContext<'_>,
    ) {
        let Some(target) = ctx.expected else {
            return;
        };
        if !expr.modifiers.is_empty() || vartype.is_guessed() || target.vartype.is_guessed() {
            return;
        }
        if vartype.basic.is_assignable_to(target.vartype.basic) {
            return;
        }
        let canon = varname_canon(target.varname);
        if SHELL_PATH_TARGETS.contains(&canon.as_str())
            && SHELL_PATH_SOURCES.contains(&expr.name.as_str())
        {
            return;
        }
        self.report(
            line,
            DiagCode::INCOMPATIBLE_TYPES,
            format!(
                "Incompatible types: {} (type \"{}\") cannot be assigned to type \"{}\".",
                expr.name, vartype.basic, target.vartype.basic
            ),
        );
    }

    /// The leading `:M` patterns of a reference to an enumerated variable
    /// must match at least one of its values.
    fn check_enum_patterns(&mut self, line: &Line, expr: &VarRef, vartype: &VariableType) {
        let Some(values) = vartype.basic.enum_values() else {
            return;
        };
        for modifier in &expr.modifiers {
            let ModifierKind::Match {
                positive: true,
                pattern,
            } = modifier.kind()
            else {
                break;
            };
            let Ok(compiled) = Pattern::compile(pattern) else {
                continue;
            };
            if values.iter().any(|value| compiled.matches(value)) {
                continue;
            }
            self.report(
                line,
                DiagCode::PATTERN_NEVER_MATCHES,
                format!(
                    "The pattern \"{pattern}\" cannot match any of {{ {} }} for {}.",
                    values.join(" "),
                    expr.name
                ),
            );
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vartype::{AclRule, VarOptions};

    fn vartype(basic: BasicType, list: bool) -> VariableType {
        let options = VarOptions {
            list,
            ..VarOptions::default()
        };
        let rules = AclRule::parse("X", "*: use").unwrap();
        VariableType::new(basic, options, rules)
    }

    #[test]
    fn test_needs_quoting() {
        assert_eq!(needs_quoting(&vartype(BasicType::Pathname, false)), NeedsQuoting::No);
        assert_eq!(needs_quoting(&vartype(BasicType::ShellCommand, false)), NeedsQuoting::No);
        assert_eq!(needs_quoting(&vartype(BasicType::Comment, false)), NeedsQuoting::Yes);
        assert_eq!(needs_quoting(&vartype(BasicType::Comment, true)), NeedsQuoting::DontKnow);
        assert_eq!(needs_quoting(&vartype(BasicType::Unknown, false)), NeedsQuoting::DontKnow);
    }

    #[test]
    fn test_builtins() {
        assert!(is_builtin(".CURDIR"));
        assert!(is_builtin("@"));
        assert!(!is_builtin("PREFIX"));
    }

    #[test]
    fn test_context_builders() {
        let vt = vartype(BasicType::Pathname, false);
        let ctx = ExprContext::new(Timing::RunTime)
            .expecting("WRKSRC", &vt)
            .quoted(Quoting::Dquot, true);
        assert_eq!(ctx.expected.map(|e| e.varname), Some("WRKSRC"));
        assert_eq!(ctx.quoting, Quoting::Dquot);
        assert!(ctx.is_word_part);
    }
}
