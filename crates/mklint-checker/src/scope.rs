//! Where names are defined.
//!
//! [`ScopeProvider`] is implemented by the caller and describes everything
//! outside the current file. [`FileScope`] is collected from the file itself
//! before its lines are checked.

use std::collections::HashSet;

use mklint_lexer::lines::varname_canon;
use mklint_lexer::{LineKind, MkLines};

/// Definitions outside the current file.
pub trait ScopeProvider {
    /// Whether `varname` is defined by the package or anywhere else.
    fn is_defined(&self, varname: &str) -> bool;

    /// Whether the current file belongs to the infrastructure rather than
    /// to a package. Permission checks are skipped for such files.
    fn is_infrastructure(&self) -> bool;
}

/// A scope that defines nothing and belongs to a package.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScope;

impl ScopeProvider for NoScope {
    fn is_defined(&self, _varname: &str) -> bool {
        false
    }

    fn is_infrastructure(&self) -> bool {
        false
    }
}

/// Names defined by the other files of a package.
#[derive(Debug, Clone, Default)]
pub struct PackageScope {
    defined: HashSet<String>,
    infrastructure: bool,
}

impl PackageScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope for checking infrastructure files.
    pub fn infrastructure() -> Self {
        Self {
            defined: HashSet::new(),
            infrastructure: true,
        }
    }

    pub fn define(&mut self, varname: impl Into<String>) {
        self.defined.insert(varname.into());
    }

    pub fn with_defined<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.define(name);
        }
        self
    }
}

impl ScopeProvider for PackageScope {
    fn is_defined(&self, varname: &str) -> bool {
        self.defined.contains(varname) || self.defined.contains(&varname_canon(varname))
    }

    fn is_infrastructure(&self) -> bool {
        self.infrastructure
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// File-local scope
// ══════════════════════════════════════════════════════════════════════════════

/// Names assigned in the current file and `.for` loop variables.
#[derive(Debug, Clone, Default)]
pub struct FileScope {
    assigned: HashSet<String>,
    loop_vars: HashSet<String>,
}

impl FileScope {
    pub fn collect(mklines: &MkLines) -> Self {
        let mut scope = Self::default();
        for mkline in &mklines.lines {
            match &mkline.kind {
                LineKind::Assignment(assign) => {
                    scope.assigned.insert(assign.varname.clone());
                    scope.assigned.insert(assign.varcanon.clone());
                }
                LineKind::Directive(dir) if dir.name == "for" => {
                    scope.loop_vars.extend(for_variables(&dir.args));
                }
                _ => {}
            }
        }
        scope
    }

    pub fn is_defined(&self, varname: &str) -> bool {
        self.loop_vars.contains(varname)
            || self.assigned.contains(varname)
            || self.assigned.contains(&varname_canon(varname))
    }

    pub fn is_loop_var(&self, varname: &str) -> bool {
        self.loop_vars.contains(varname)
    }
}

/// The variable names of `.for a b in list`.
pub fn for_variables(args: &str) -> Vec<String> {
    args.split_whitespace()
        .take_while(|word| *word != "in")
        .map(str::to_string)
        .collect()
}

/// The value list of `.for a b in list`.
pub fn for_values(args: &str) -> &str {
    match args.find(" in ") {
        Some(pos) => args[pos + 4..].trim(),
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_scope_collects_assignments_and_loops() {
        let mklines = MkLines::parse(
            "Makefile",
            "FOO=\tbar\nPKG_SHELL.user=\t/bin/sh\n.for f g in a b\n.endfor\n",
        );
        let scope = FileScope::collect(&mklines);
        assert!(scope.is_defined("FOO"));
        assert!(scope.is_defined("PKG_SHELL.other"));
        assert!(scope.is_defined("f"));
        assert!(scope.is_loop_var("g"));
        assert!(!scope.is_defined("in"));
        assert!(!scope.is_defined("BAR"));
    }

    #[test]
    fn test_for_values() {
        assert_eq!(for_values("f in ${FILES} x"), "${FILES} x");
        assert_eq!(for_values("f"), "");
    }

    #[test]
    fn test_package_scope() {
        let scope = PackageScope::new().with_defined(["LOCAL_VAR", "OPT.*"]);
        assert!(scope.is_defined("LOCAL_VAR"));
        assert!(scope.is_defined("OPT.x"));
        assert!(!scope.is_infrastructure());
        assert!(PackageScope::infrastructure().is_infrastructure());
        assert!(!NoScope.is_defined("LOCAL_VAR"));
    }
}
