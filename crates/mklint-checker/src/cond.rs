//! Checks for `.if` and `.elif` conditions.
//!
//! A condition is parsed into a [`CondTree`] first. A malformed condition is
//! reported once and not analyzed further. Otherwise the checker
//!
//! 1. suggests simpler forms of the condition,
//! 2. checks every variable reference at load time,
//! 3. warns about comparisons with version numbers,
//! 4. extracts the facts `${VAR:Mpattern}` that the condition asserts and
//!    compares them with the facts of all enclosing conditions.
//!
//! Nodes that one simplification already covers are recorded by [`CondId`]
//! so that no two fixes overlap.

use std::collections::HashSet;

use mklint_lexer::{parse_varref, tokenize};
use mklint_parser::parse_condition;
use mklint_types::cond::{CompareOp, Cond, CondId, CondTerm, CondTree};
use mklint_types::line::Line;
use mklint_types::varref::VarRef;
use mklint_types::DiagCode;

use crate::autofix::Autofix;
use crate::checker::FileChecker;
use crate::expr::{ExprContext, Timing};
use crate::pattern::Pattern;

/// `${VAR:Mpattern}` holds while the condition is true.
#[derive(Debug, Clone)]
pub struct VarFact {
    pub varname: String,
    pub pattern: Pattern,
    pub lineno: u32,
}

/// Characters that make a word a pattern rather than a plain value.
const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '\\'];

impl FileChecker<'_> {
    /// Check the condition of an `.if` or `.elif` directive and return the
    /// facts it establishes.
    pub fn check_condition(&mut self, line: &mut Line, directive: &str, args: &str) -> Vec<VarFact> {
        let tree = match parse_condition(args) {
            Ok(tree) => tree,
            Err(failure) => {
                self.report(
                    line,
                    DiagCode::INVALID_CONDITION,
                    format!("Invalid condition, unrecognized part: \"{}\".", failure.rest),
                );
                return Vec::new();
            }
        };

        if self.options.simplify {
            let mut handled = HashSet::new();
            self.simplify_parens(line, &tree, &mut handled);
            self.simplify_defined(line, &tree, &mut handled);
            self.simplify_empty(line, &tree, &mut handled);
            self.simplify_negated_compare(line, &tree, &mut handled);
        }
        self.check_leaves(line, &tree);
        self.check_version_compare(line, &tree);

        let facts = self.facts(&tree, line.location.first);
        if self.options.contradictions {
            self.check_contradictions(line, directive, &facts);
        }
        facts
    }

    // ══════════════════════════════════════════════════════════════════════
    // Simplifications
    // ══════════════════════════════════════════════════════════════════════

    /// `(A && B)` as the whole condition.
    fn simplify_parens(&mut self, line: &mut Line, tree: &CondTree, handled: &mut HashSet<CondId>) {
        let Some(root) = tree.root() else {
            return;
        };
        let Cond::Paren(inner) = tree.cond(root) else {
            return;
        };
        let diag = self.diag(
            line,
            DiagCode::REDUNDANT_PARENS,
            "Parentheses around the outermost condition are redundant.",
        );
        self.fix(
            line,
            Autofix::new(diag).replace(tree.text_of(root), tree.text_of(*inner)),
        );
        handled.extend(tree.preorder());
    }

    /// `defined(V) && !empty(V)` is the same as `!empty(V)`.
    fn simplify_defined(&mut self, line: &mut Line, tree: &CondTree, handled: &mut HashSet<CondId>) {
        let conjuncts = tree.conjuncts();
        for pair in conjuncts.windows(2) {
            let (defined, not_empty) = (pair[0], pair[1]);
            if handled.contains(&defined) || handled.contains(&not_empty) {
                continue;
            }
            let Cond::Defined(name) = tree.cond(defined) else {
                continue;
            };
            let Some(expr) = negated_empty(tree, not_empty) else {
                continue;
            };
            if expr.name != *name {
                continue;
            }
            let start = tree.node(defined).span.start;
            let end = tree.node(not_empty).span.start;
            let removed = tree.text().get(start..end).unwrap_or_default();

            let diag = self.diag(
                line,
                DiagCode::REDUNDANT_DEFINED,
                format!("Using \"defined({name})\" is redundant since \"!empty({name})\" implies it."),
            );
            self.fix(line, Autofix::new(diag).replace(removed, ""));
            handled.insert(defined);
        }
    }

    /// `empty(${V})` and `!empty(V)`.
    fn simplify_empty(&mut self, line: &mut Line, tree: &CondTree, handled: &mut HashSet<CondId>) {
        for id in tree.preorder() {
            if handled.contains(&id) {
                continue;
            }
            match tree.cond(id) {
                Cond::EmptyTest(expr) => {
                    let Some(inner) = nested_reference(expr) else {
                        continue;
                    };
                    let simpler = format!("empty({}{}{})", inner.name, inner.mods_text(), expr.mods_text());
                    let diag = self.diag(
                        line,
                        DiagCode::EMPTY_WITH_EXPRESSION,
                        "The empty() function takes a variable name as parameter, not a variable expression.",
                    );
                    self.fix(line, Autofix::new(diag).replace(tree.text_of(id), simpler));
                    handled.insert(id);
                }
                Cond::Not(inner) => {
                    let Some(expr) = negated_empty(tree, id) else {
                        continue;
                    };
                    if handled.contains(inner) || nested_reference(expr).is_some() {
                        continue;
                    }
                    let name_with_mods = expr.name_with_mods();
                    let diag = self.diag(
                        line,
                        DiagCode::NOT_EMPTY_SIMPLER,
                        format!(
                            "!empty({name_with_mods}) can be replaced with the simpler ${{{name_with_mods}}}."
                        ),
                    );
                    self.fix(
                        line,
                        Autofix::new(diag).replace(tree.text_of(id), format!("${{{name_with_mods}}}")),
                    );
                    handled.insert(id);
                    handled.insert(*inner);
                }
                _ => {}
            }
        }
    }

    /// `!(${V} == word)` becomes `!${V:Mword}`.
    fn simplify_negated_compare(
        &mut self,
        line: &mut Line,
        tree: &CondTree,
        handled: &mut HashSet<CondId>,
    ) {
        for id in tree.preorder() {
            if handled.contains(&id) {
                continue;
            }
            let Cond::Not(paren) = tree.cond(id) else {
                continue;
            };
            let Cond::Paren(compare) = tree.cond(*paren) else {
                continue;
            };
            let Cond::Compare {
                left: CondTerm::Expr(expr),
                op: CompareOp::Eq,
                right,
            } = tree.cond(*compare)
            else {
                continue;
            };
            let Some(word) = right.literal() else {
                continue;
            };
            if word.is_empty() || word.contains(GLOB_CHARS) || word.contains([':', '$', ' ']) {
                continue;
            }
            if self.registry.lookup(&expr.name).is_some_and(|vt| vt.is_list()) {
                continue;
            }

            let simpler = format!("!${{{}:M{}}}", expr.name_with_mods(), word);
            let diag = self.diag(
                line,
                DiagCode::NEGATED_COMPARISON,
                format!("!({expr} == {word}) can be replaced with the simpler {simpler}."),
            );
            self.fix(line, Autofix::new(diag).replace(tree.text_of(id), simpler));
            handled.insert(id);
            handled.insert(*paren);
            handled.insert(*compare);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Leaves
    // ══════════════════════════════════════════════════════════════════════

    /// Conditions are evaluated while the file is loaded.
    fn check_leaves(&mut self, line: &mut Line, tree: &CondTree) {
        let ctx = ExprContext::new(Timing::LoadTime);
        for id in tree.preorder() {
            match tree.cond(id) {
                Cond::BareVar(expr) => self.check_expr(line, expr, &ctx),
                Cond::EmptyTest(expr) => match nested_reference(expr) {
                    Some(inner) => self.check_expr(line, &inner, &ctx),
                    None => self.check_expr(line, expr, &ctx),
                },
                Cond::Compare { left, right, .. } => {
                    self.check_term(line, left, &ctx);
                    self.check_term(line, right, &ctx);
                }
                Cond::Literal(term) => self.check_term(line, term, &ctx),
                Cond::Defined(name) => self.check_embedded(line, name, &ctx),
                Cond::Call { argument, .. } => self.check_embedded(line, argument, &ctx),
                Cond::Or(_) | Cond::And(_) | Cond::Not(_) | Cond::Paren(_) => {}
            }
        }
    }

    fn check_term(&mut self, line: &mut Line, term: &CondTerm, ctx: &ExprContext<'_>) {
        match term {
            CondTerm::Expr(expr) => self.check_expr(line, expr, ctx),
            CondTerm::Quoted(text) => self.check_embedded(line, text, ctx),
            CondTerm::Word(_) => {}
        }
    }

    /// References inside literal text, like `exists(${WRKSRC}/file)`.
    fn check_embedded(&mut self, line: &mut Line, text: &str, ctx: &ExprContext<'_>) {
        let tokens = tokenize(text);
        for expr in tokens.exprs() {
            self.check_expr(line, expr, ctx);
        }
    }

    /// Comparisons with dotted version numbers are numeric or string
    /// comparisons, neither of which orders `5.9` before `5.10`. The
    /// reference may be on either side.
    fn check_version_compare(&mut self, line: &Line, tree: &CondTree) {
        for id in tree.preorder() {
            let Cond::Compare { left, op, right } = tree.cond(id) else {
                continue;
            };
            let (expr, literal) = match (left, right) {
                (CondTerm::Expr(_), CondTerm::Expr(_)) => continue,
                (CondTerm::Expr(expr), literal) | (literal, CondTerm::Expr(expr)) => (expr, literal),
                _ => continue,
            };
            match literal {
                CondTerm::Word(word) if self.version.is_match(word) => {
                    self.report(
                        line,
                        DiagCode::NUMERIC_VERSION_COMPARISON,
                        format!("Numeric comparison {left} {op} {right}."),
                    );
                }
                CondTerm::Quoted(value) if self.version.is_match(value) => {
                    if matches!(op, CompareOp::Eq | CompareOp::Ne) {
                        self.report(
                            line,
                            DiagCode::VERSION_STRING_COMPARISON,
                            format!(
                                "Use pattern matching like ${{{}:M{value}}} instead of the comparison {left} {op} {right}.",
                                expr.name_with_mods()
                            ),
                        );
                    } else {
                        self.report(
                            line,
                            DiagCode::NUMERIC_VERSION_COMPARISON,
                            format!("Numeric comparison {left} {op} {right}."),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Facts and contradictions
    // ══════════════════════════════════════════════════════════════════════

    /// The facts of the top-level conjuncts. Only a single positive `:M`
    /// on a scalar variable makes a fact.
    fn facts(&self, tree: &CondTree, lineno: u32) -> Vec<VarFact> {
        let mut facts = Vec::new();
        for id in tree.conjuncts() {
            let expr = match tree.cond(id) {
                Cond::BareVar(expr) => expr,
                _ => match negated_empty(tree, id) {
                    Some(expr) => expr,
                    None => continue,
                },
            };
            let Some((true, pattern)) = expr.single_match() else {
                continue;
            };
            if expr.is_parameterized() {
                continue;
            }
            match self.registry.lookup(&expr.name) {
                Some(vartype) if !vartype.is_list() => {}
                _ => continue,
            }
            match Pattern::compile(pattern) {
                Ok(pattern) => facts.push(VarFact {
                    varname: expr.name.clone(),
                    pattern,
                    lineno,
                }),
                Err(err) => {
                    tracing::debug!(
                        file = %self.filename,
                        lineno,
                        varname = %expr.name,
                        %err,
                        "fact dropped"
                    );
                }
            }
        }
        facts
    }

    fn check_contradictions(&mut self, line: &Line, directive: &str, facts: &[VarFact]) {
        if self.stack_broken || facts.is_empty() {
            return;
        }
        // An `.elif` is an alternative to the branch on top of the stack.
        let depth = match directive {
            "elif" => self.stack.len().saturating_sub(1),
            _ => self.stack.len(),
        };

        let mut messages = Vec::new();
        for block in &self.stack[..depth] {
            for outer in &block.facts {
                for fact in facts {
                    if disjoint(outer, fact) {
                        messages.push(format!(
                            "The patterns \"{}\" from line {} and \"{}\" cannot match at the same time.",
                            outer.pattern.as_str(),
                            outer.lineno,
                            fact.pattern.as_str()
                        ));
                    }
                }
            }
        }
        for (i, a) in facts.iter().enumerate() {
            for b in &facts[i + 1..] {
                if disjoint(a, b) {
                    messages.push(format!(
                        "The patterns \"{}\" and \"{}\" cannot match at the same time.",
                        a.pattern.as_str(),
                        b.pattern.as_str()
                    ));
                }
            }
        }

        for message in messages {
            self.report(line, DiagCode::CONTRADICTION, message);
        }
    }
}

fn disjoint(a: &VarFact, b: &VarFact) -> bool {
    a.varname == b.varname && !a.pattern.intersect(&b.pattern).can_match()
}

/// The reference of `!empty(...)`.
fn negated_empty(tree: &CondTree, id: CondId) -> Option<&VarRef> {
    let Cond::Not(inner) = tree.cond(id) else {
        return None;
    };
    match tree.cond(*inner) {
        Cond::EmptyTest(expr) => Some(expr),
        _ => None,
    }
}

/// For `empty(${V:mods})`, the reference written as the name.
fn nested_reference(expr: &VarRef) -> Option<VarRef> {
    if !expr.name.starts_with('$') {
        return None;
    }
    match parse_varref(&expr.name) {
        Some((inner, len)) if len == expr.name.len() => Some(inner),
        _ => None,
    }
}
