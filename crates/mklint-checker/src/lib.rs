//! mklint checker: semantic analysis of Makefile fragments.
//!
//! ```text
//! text → MkLines → FileChecker ─┬─ assignments ──┐
//!                               ├─ shell commands ├─→ check_expr → Diagnostics
//!                               └─ conditions ────┘        ↑
//!                                    │          TypeRegistry (types, ACLs, tools)
//!                                    └─ facts → Pattern::intersect → contradictions
//! ```

pub mod autofix;
pub mod checker;
mod cond;
mod expr;
pub mod options;
pub mod pattern;
pub mod registry;
pub mod scope;
pub mod shell;
pub mod vartype;

pub use autofix::{save_autofix_changes, Autofix};
pub use checker::{FileChecker, Linter, RunState};
pub use cond::VarFact;
pub use expr::{ExpectedType, ExprContext, Quoting, Timing};
pub use options::{AutofixMode, CheckOptions};
pub use pattern::{Intersection, Pattern};
pub use registry::{Tool, ToolValidity, TypeRegistry};
pub use scope::{FileScope, NoScope, PackageScope, ScopeProvider};
pub use vartype::{AclRule, BasicType, Permissions, VarOptions, VariableType};
