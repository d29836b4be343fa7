//! Checker tests.
//!
//! Covers: contradiction detection across nested and sibling conditions,
//! permissions and load-time rules, quoting, assignability, condition
//! simplifications with their fixes in all autofix modes, nesting errors,
//! idempotence of applied fixes, saving, and determinism.

use mklint_checker::{
    AutofixMode, BasicType, CheckOptions, ExprContext, FileScope, Linter, NoScope, PackageScope,
    Quoting, Timing, TypeRegistry, VarOptions,
};
use mklint_types::line::{Line, RawLine};
use mklint_types::varref::VarRef;
use mklint_types::{DiagCategory, DiagCode, Diagnostics, Severity};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

const PREFS: &str = ".include \"../../mk/bsd.prefs.mk\"\n";

fn linter(options: CheckOptions) -> Linter {
    Linter::new(options).expect("built-in registry is valid")
}

fn check_in(filename: &str, text: &str) -> Diagnostics {
    linter(CheckOptions::default())
        .check_text(filename, text, &NoScope)
        .1
}

fn check(text: &str) -> Diagnostics {
    check_in("Makefile", text)
}

fn with_prefs(text: &str) -> String {
    format!("{PREFS}{text}")
}

/// Check in `mode` and return the resulting file text.
fn run_mode(text: &str, mode: AutofixMode) -> (String, Diagnostics) {
    let mut linter = linter(CheckOptions::default().with_autofix(mode));
    let (mklines, diags) = linter.check_text("Makefile", text, &NoScope);
    (mklines.to_text(), diags)
}

fn all(diags: &Diagnostics) -> Vec<String> {
    diags.iter().map(|d| format!("{} {}", d.code, d)).collect()
}

fn messages(diags: &Diagnostics, code: DiagCode) -> Vec<String> {
    diags.with_code(code).map(|d| d.message.clone()).collect()
}

fn assert_diag(diags: &Diagnostics, code: DiagCode, message: &str) {
    assert!(
        messages(diags, code).iter().any(|m| m == message),
        "expected {code} {message:?}, got {:#?}",
        all(diags)
    );
}

fn assert_clean(diags: &Diagnostics) {
    assert!(diags.is_empty(), "expected no diagnostics, got {:#?}", all(diags));
}

// ─────────────────────────────────────────────────────────────────────
// Contradictions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn nested_disjoint_patterns_contradict() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:MLinux}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::CONTRADICTION,
        "The patterns \"Linux\" from line 2 and \"NetBSD\" cannot match at the same time.",
    );
    let diag = diags.with_code(DiagCode::CONTRADICTION).next().unwrap();
    assert_eq!(diag.location.first, 3);
    assert_eq!(diag.severity, Severity::Warning);
}

#[test]
fn identical_patterns_do_not_contradict() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:MLinux}\n.  if ${OPSYS:MLinux}\n.  endif\n.endif\n",
    ));
    assert_clean(&diags);
}

#[test]
fn overlapping_wildcards_do_not_contradict() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:M*BSD}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_clean(&diags);
}

#[test]
fn contradiction_within_one_condition() {
    let diags = check(&with_prefs(".if ${OPSYS:MLinux} && ${OPSYS:MNetBSD}\n.endif\n"));
    assert_eq!(
        messages(&diags, DiagCode::CONTRADICTION),
        vec!["The patterns \"Linux\" and \"NetBSD\" cannot match at the same time."]
    );
}

#[test]
fn negated_empty_is_a_fact() {
    let diags = check(&with_prefs(
        ".if !empty(OPSYS:MLinux)\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_eq!(diags.with_code(DiagCode::CONTRADICTION).count(), 1);
}

#[test]
fn modifier_chains_are_not_facts() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:MLinux:tl}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_eq!(diags.with_code(DiagCode::CONTRADICTION).count(), 0);
}

#[test]
fn list_variables_are_not_facts() {
    let diags = check(&with_prefs(
        ".if ${PKG_OPTIONS:Mx11}\n.  if ${PKG_OPTIONS:Mgtk}\n.  endif\n.endif\n",
    ));
    assert_clean(&diags);
}

#[test]
fn elif_is_an_alternative_not_a_nesting() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:MLinux}\n.elif ${OPSYS:MNetBSD}\n.endif\n",
    ));
    assert_clean(&diags);
}

#[test]
fn elif_replaces_the_facts_of_its_block() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:MLinux}\n.elif ${OPSYS:MNetBSD}\n.  if ${OPSYS:MLinux}\n.  endif\n.endif\n",
    ));
    assert_eq!(
        messages(&diags, DiagCode::CONTRADICTION),
        vec!["The patterns \"NetBSD\" from line 3 and \"Linux\" cannot match at the same time."]
    );
}

#[test]
fn else_clears_the_facts_of_its_block() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:MLinux}\n.else\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_clean(&diags);
}

#[test]
fn unbalanced_directives_disable_contradictions_for_their_nesting() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:MLinux}\n.endfor\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n\
         .if ${OPSYS:MLinux}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_eq!(messages(&diags, DiagCode::UNMATCHED_DIRECTIVE), vec!["Unmatched .endfor."]);
    assert_eq!(
        messages(&diags, DiagCode::CONTRADICTION),
        vec!["The patterns \"Linux\" from line 7 and \"NetBSD\" cannot match at the same time."]
    );
    let diag = diags.with_code(DiagCode::CONTRADICTION).next().unwrap();
    assert_eq!(diag.location.first, 8);
}

#[test]
fn stray_endif_does_not_affect_later_blocks() {
    let diags = check(&with_prefs(
        ".endif\n.if ${OPSYS:MLinux}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_eq!(messages(&diags, DiagCode::UNMATCHED_DIRECTIVE), vec!["Unmatched .endif."]);
    assert_eq!(diags.with_code(DiagCode::CONTRADICTION).count(), 1);
}

#[test]
fn unparsable_pattern_drops_only_its_fact() {
    let diags = check(&with_prefs(
        ".if ${OPSYS:M[Lin}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_clean(&diags);

    let diags = check(&with_prefs(
        ".if ${OPSYS:M[Lin} && ${OPSYS:MLinux}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n",
    ));
    assert_eq!(
        messages(&diags, DiagCode::CONTRADICTION),
        vec!["The patterns \"Linux\" from line 2 and \"NetBSD\" cannot match at the same time."]
    );
}

#[test]
fn contradictions_can_be_switched_off() {
    let options = CheckOptions {
        contradictions: false,
        ..CheckOptions::default()
    };
    let text = with_prefs(".if ${OPSYS:MLinux}\n.  if ${OPSYS:MNetBSD}\n.  endif\n.endif\n");
    let (_, diags) = linter(options).check_text("Makefile", &text, &NoScope);
    assert_clean(&diags);
}

// ─────────────────────────────────────────────────────────────────────
// Directive nesting
// ─────────────────────────────────────────────────────────────────────

#[test]
fn mismatched_and_unclosed_directives() {
    let diags = check(".if 1\n.for x in a\n.endif\n");
    assert_diag(&diags, DiagCode::UNMATCHED_DIRECTIVE, "Unmatched .endif.");
    assert_diag(
        &diags,
        DiagCode::UNCLOSED_DIRECTIVE,
        "Directive indentation is not 0, but 2.",
    );
    assert!(diags.has_errors());
}

#[test]
fn stray_endfor() {
    let diags = check(".endfor\n");
    assert_eq!(messages(&diags, DiagCode::UNMATCHED_DIRECTIVE), vec!["Unmatched .endfor."]);
}

#[test]
fn invalid_condition_is_reported_once() {
    let diags = check(".if ${A} ==\n.endif\n");
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::INVALID_CONDITION,
        "Invalid condition, unrecognized part: \"==\".",
    );
}

// ─────────────────────────────────────────────────────────────────────
// Definedness
// ─────────────────────────────────────────────────────────────────────

#[test]
fn undefined_is_reported_once_per_run() {
    let mut linter = linter(CheckOptions::default());
    let text = "\techo ${UNDEFINED_THING} ${UNDEFINED_THING}\n";
    let (_, first) = linter.check_text("Makefile", text, &NoScope);
    assert_eq!(
        messages(&first, DiagCode::USED_NOT_DEFINED),
        vec!["UNDEFINED_THING is used but not defined."]
    );

    let (_, second) = linter.check_text("Makefile.common", text, &NoScope);
    assert_eq!(second.with_code(DiagCode::USED_NOT_DEFINED).count(), 0);

    linter.reset();
    let (_, third) = linter.check_text("Makefile", text, &NoScope);
    assert_eq!(third.with_code(DiagCode::USED_NOT_DEFINED).count(), 1);
}

#[test]
fn loop_variables_and_package_definitions_are_defined() {
    assert_clean(&check(".for file in a b\n\techo ${file}\n.endfor\n"));

    let scope = PackageScope::new().with_defined(["MY_VAR"]);
    let (_, diags) = linter(CheckOptions::default()).check_text(
        "Makefile",
        "\techo ${MY_VAR}\n",
        &scope,
    );
    assert_clean(&diags);
}

#[test]
fn deprecated_definition() {
    let diags = check("USE_GNU_TOOLS=\tmake\n");
    assert_eq!(diags.len(), 1);
    assert_diag(
        &diags,
        DiagCode::DEPRECATED_DEFINITION,
        "Definition of USE_GNU_TOOLS is deprecated. Use USE_TOOLS instead.",
    );
}

// ─────────────────────────────────────────────────────────────────────
// Permissions and timing
// ─────────────────────────────────────────────────────────────────────

#[test]
fn prefs_required_for_system_variables_in_makefile() {
    let diags = check(".if ${OPSYS} == NetBSD\n.endif\n");
    assert_diag(
        &diags,
        DiagCode::PREFS_REQUIRED,
        "To use OPSYS at load time, .include \"../../mk/bsd.prefs.mk\" first.",
    );
    assert_clean(&check_in("options.mk", ".if ${OPSYS} == NetBSD\n.endif\n"));
}

#[test]
fn tools_at_load_time() {
    let diags = check("X:=\t${SED}\nY:=\t${ECHO}\n");
    assert_diag(
        &diags,
        DiagCode::TOOL_AT_LOADTIME,
        "To use the tool ${SED} at load time, bsd.prefs.mk has to be included before.",
    );
    assert_diag(
        &diags,
        DiagCode::TOOL_AT_LOADTIME,
        "The tool ${ECHO} cannot be used at load time.",
    );

    let diags = check(&with_prefs("X:=\t${SED}\nY:=\t${ECHO}\n"));
    assert_eq!(
        messages(&diags, DiagCode::TOOL_AT_LOADTIME),
        vec!["The tool ${ECHO} cannot be used at load time."]
    );
}

#[test]
fn load_time_use_in_wrong_file() {
    let diags = check_in("bsd.options.mk", ".if ${PKG_OPTIONS:Mx11}\n.endif\n");
    assert_eq!(
        messages(&diags, DiagCode::USE_NOT_ALLOWED),
        vec![
            "PKG_OPTIONS should not be used at load time in this file; \
             it would be ok in options.mk, Makefile, Makefile.* or *.mk."
        ]
    );
}

#[test]
fn load_time_use_nowhere_is_an_error() {
    let diags = check(".if ${WRKSRC} == foo\n.endif\n");
    assert_diag(
        &diags,
        DiagCode::USE_AT_LOADTIME_NOWHERE,
        "WRKSRC should not be used at load time in any file.",
    );
    assert!(diags.has_errors());
}

#[test]
fn references_inside_function_arguments() {
    let nowhere = "WRKSRC should not be used at load time in any file.";
    let diags = check(&with_prefs(".if exists(${WRKSRC}/foo)\n.endif\n"));
    assert_eq!(messages(&diags, DiagCode::USE_AT_LOADTIME_NOWHERE), vec![nowhere]);

    let diags = check(&with_prefs(".if make(${UNDEFINED_TARGET_NAME})\n.endif\n"));
    assert_eq!(
        messages(&diags, DiagCode::USED_NOT_DEFINED),
        vec!["UNDEFINED_TARGET_NAME is used but not defined."]
    );
}

#[test]
fn references_inside_quoted_operands() {
    let diags = check(&with_prefs(".if ${OPSYS} == \"${WRKSRC}\"\n.endif\n"));
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::USE_AT_LOADTIME_NOWHERE,
        "WRKSRC should not be used at load time in any file.",
    );
}

#[test]
fn references_nested_in_names_and_modifiers() {
    let diags = check("\techo ${PKG_OPTIONS.${NO_SUCH_VAR_X}}\n");
    assert_eq!(
        messages(&diags, DiagCode::USED_NOT_DEFINED),
        vec!["NO_SUCH_VAR_X is used but not defined."]
    );

    let diags = check(&with_prefs(".if ${OPSYS:M${WRKSRC}}\n.endif\n"));
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::USE_AT_LOADTIME_NOWHERE,
        "WRKSRC should not be used at load time in any file.",
    );

    let diags = check("X:=\t${PKG_OPTIONS.${WRKSRC}}\n");
    assert_diag(
        &diags,
        DiagCode::USE_AT_LOADTIME_NOWHERE,
        "WRKSRC should not be used at load time in any file.",
    );
}

#[test]
fn indirect_load_time_use() {
    let diags = check("PKGNAME=\t${WRKSRC}\n");
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::USE_INDIRECT_LOADTIME,
        "WRKSRC should not be used indirectly at load time (via PKGNAME).",
    );
}

#[test]
fn write_only_variable() {
    let diags = check("\techo ${COMMENT}\n");
    assert_eq!(
        messages(&diags, DiagCode::USE_NOT_ALLOWED),
        vec!["COMMENT should not be used in any file; it is a write-only variable."]
    );
}

#[test]
fn infrastructure_files_skip_permissions() {
    let scope = PackageScope::infrastructure();
    let (_, diags) = linter(CheckOptions::default()).check_text(
        "Makefile",
        "\techo ${COMMENT}\n",
        &scope,
    );
    assert!(diags.iter().all(|d| d.category != DiagCategory::Permission));
}

#[test]
fn assignment_permissions() {
    let diags = check("PKGREVISION+=\t1\n");
    assert_diag(
        &diags,
        DiagCode::APPEND_NOT_ALLOWED,
        "The variable PKGREVISION should not be appended to in any file.",
    );

    let diags = check_in("options.mk", "CATEGORIES=\tdevel\n");
    assert_diag(
        &diags,
        DiagCode::SET_NOT_ALLOWED,
        "The variable CATEGORIES should not be set in this file; it would be ok in Makefile or Makefile.common.",
    );
}

#[test]
fn guessed_types_never_get_permission_diagnostics() {
    let mut linter = linter(CheckOptions::default());
    let target = linter
        .registry()
        .lookup("PKGNAME")
        .expect("PKGNAME is declared")
        .clone();
    let file_scope = FileScope::default();
    let mut diags = Diagnostics::empty();

    for filename in ["Makefile", "buildlink3.mk", "options.mk", "hacks.mk"] {
        let mut checker = linter.file_checker(filename, &file_scope, &NoScope, &mut diags);
        let mut line = Line::new(filename, vec![RawLine::new(1, "X=\t${FOO_DIR}")]);
        for name in ["FOO_DIR", "BAR_CMD", "MY_FLAGS", "SOME_USER", "LIB_VARS"] {
            let expr = VarRef::new(name);
            for timing in [Timing::LoadTime, Timing::RunTime] {
                for quoting in [Quoting::Plain, Quoting::Dquot, Quoting::Unknown] {
                    for word_part in [false, true] {
                        let plain = ExprContext::new(timing).quoted(quoting, word_part);
                        checker.check_expr(&mut line, &expr, &plain);
                        let indirect = plain.expecting("PKGNAME", &target);
                        checker.check_expr(&mut line, &expr, &indirect);
                    }
                }
            }
        }
    }

    assert!(!diags.is_empty(), "undefined names are still reported");
    assert!(
        diags.iter().all(|d| d.category != DiagCategory::Permission),
        "{:#?}",
        all(&diags)
    );
}

// ─────────────────────────────────────────────────────────────────────
// Quoting
// ─────────────────────────────────────────────────────────────────────

#[test]
fn list_variable_embedded_in_word() {
    let diags = check("do-build:\n\tcd ${WRKSRC} && ${CC} -DFLAGS=${CFLAGS} -o foo foo.c\n");
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::LIST_IN_WORD,
        "The list variable CFLAGS should not be embedded in a word.",
    );
    assert_eq!(diags.with_code(DiagCode::QUOTE_NEEDED).count(), 0);
}

#[test]
fn list_variable_as_separate_words() {
    assert_clean(&check("do-build:\n\t${CC} ${CFLAGS} -o foo foo.c\n"));
}

#[test]
fn quote_inside_quotes() {
    let diags = check("\techo \"${PREFIX:Q}\"\n");
    assert_eq!(
        messages(&diags, DiagCode::QUOTE_MISPLACED),
        vec!["Please move ${PREFIX:Q} outside of any quoting characters."]
    );
}

#[test]
fn redundant_quote_is_removed_once() {
    let (text, diags) = run_mode("\techo ${PREFIX:Q}\n", AutofixMode::Apply);
    assert_eq!(
        messages(&diags, DiagCode::QUOTE_REDUNDANT),
        vec!["The :Q modifier isn't necessary for ${PREFIX} here."]
    );
    assert_eq!(text, "\techo ${PREFIX}\n");

    let (again, diags) = run_mode(&text, AutofixMode::Apply);
    assert_clean(&diags);
    assert_eq!(again, text);
}

#[test]
fn missing_quote_is_added() {
    let mut registry = TypeRegistry::new().unwrap();
    registry
        .declare("MY_COMMENT", BasicType::Comment, VarOptions::default(), &["*: use"])
        .unwrap();
    let options = CheckOptions::default().with_autofix(AutofixMode::Apply);
    let mut linter = Linter::with_registry(registry, options).unwrap();

    let (mklines, diags) = linter.check_text("Makefile", "\techo ${MY_COMMENT}\n", &NoScope);
    assert_eq!(
        messages(&diags, DiagCode::QUOTE_NEEDED),
        vec!["Please use ${MY_COMMENT:Q} instead of ${MY_COMMENT}."]
    );
    let text = mklines.to_text();
    assert!(text.contains("${MY_COMMENT:Q}"));
    assert!(!text.contains("${MY_COMMENT}"));

    let (_, diags) = linter.check_text("Makefile", &text, &NoScope);
    assert_eq!(diags.with_code(DiagCode::QUOTE_NEEDED).count(), 0);
    assert_eq!(diags.with_code(DiagCode::QUOTE_REDUNDANT).count(), 0);
}

// ─────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────

#[test]
fn incompatible_assignment() {
    let diags = check("WRKSRC=\t${CC}\n");
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::INCOMPATIBLE_TYPES,
        "Incompatible types: CC (type \"ShellCommand\") cannot be assigned to type \"Pathname\".",
    );
}

#[test]
fn shell_path_exception() {
    assert_clean(&check("PKG_SHELL.foo=\t${SH}\n"));
}

#[test]
fn enum_pattern_that_never_matches() {
    let diags = check(&with_prefs(".if ${OPSYS:MLinus}\n.endif\n"));
    let found = messages(&diags, DiagCode::PATTERN_NEVER_MATCHES);
    assert_eq!(found.len(), 1, "{:#?}", all(&diags));
    assert!(found[0].starts_with("The pattern \"Linus\" cannot match any of { AIX BSDOS "));
    assert!(found[0].ends_with(" UnixWare } for OPSYS."));

    assert_clean(&check(&with_prefs(".if ${OPSYS:M*BSD}\n.endif\n")));
}

// ─────────────────────────────────────────────────────────────────────
// Simplifications
// ─────────────────────────────────────────────────────────────────────

const NOT_EMPTY: &str = ".if !empty(PKG_BUILD_OPTIONS.foo)\n.endif\n";

#[test]
fn not_empty_suggestion_without_mutation() {
    let (text, diags) = run_mode(NOT_EMPTY, AutofixMode::Off);
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::NOT_EMPTY_SIMPLER,
        "!empty(PKG_BUILD_OPTIONS.foo) can be replaced with the simpler ${PKG_BUILD_OPTIONS.foo}.",
    );
    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.severity, Severity::Note);
    let fix = diag.fix.as_ref().expect("fix attached");
    assert!(!fix.applied);
    assert_eq!(text, NOT_EMPTY);
}

#[test]
fn not_empty_preview() {
    let (text, diags) = run_mode(NOT_EMPTY, AutofixMode::Preview);
    let fix = diags.iter().next().unwrap().fix.as_ref().unwrap();
    assert_eq!(
        fix.preview,
        vec!["Replacing \"!empty(PKG_BUILD_OPTIONS.foo)\" with \"${PKG_BUILD_OPTIONS.foo}\"."]
    );
    assert!(!fix.applied);
    assert_eq!(text, NOT_EMPTY);
}

#[test]
fn not_empty_apply_is_idempotent() {
    let (text, diags) = run_mode(NOT_EMPTY, AutofixMode::Apply);
    assert!(diags.iter().next().unwrap().fix.as_ref().unwrap().applied);
    assert_eq!(text, ".if ${PKG_BUILD_OPTIONS.foo}\n.endif\n");

    let (again, diags) = run_mode(&text, AutofixMode::Apply);
    assert_clean(&diags);
    assert_eq!(again, text);
}

#[test]
fn redundant_outer_parentheses() {
    let (text, diags) = run_mode(
        &with_prefs(".if (${OPSYS:MLinux} && ${MACHINE_ARCH:Mx86_64})\n.endif\n"),
        AutofixMode::Apply,
    );
    assert_eq!(
        messages(&diags, DiagCode::REDUNDANT_PARENS),
        vec!["Parentheses around the outermost condition are redundant."]
    );
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_eq!(
        text,
        with_prefs(".if ${OPSYS:MLinux} && ${MACHINE_ARCH:Mx86_64}\n.endif\n")
    );
}

#[test]
fn redundant_defined() {
    let (text, diags) = run_mode(
        &with_prefs(".if defined(PKG_DEVELOPER) && !empty(PKG_DEVELOPER)\n.endif\n"),
        AutofixMode::Apply,
    );
    assert_diag(
        &diags,
        DiagCode::REDUNDANT_DEFINED,
        "Using \"defined(PKG_DEVELOPER)\" is redundant since \"!empty(PKG_DEVELOPER)\" implies it.",
    );
    assert_eq!(diags.with_code(DiagCode::NOT_EMPTY_SIMPLER).count(), 1);
    assert_eq!(text, with_prefs(".if ${PKG_DEVELOPER}\n.endif\n"));
}

#[test]
fn expression_inside_empty() {
    let (text, diags) = run_mode(".if empty(${PKGNAME})\n.endif\n", AutofixMode::Apply);
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::EMPTY_WITH_EXPRESSION,
        "The empty() function takes a variable name as parameter, not a variable expression.",
    );
    assert_eq!(text, ".if empty(PKGNAME)\n.endif\n");
}

#[test]
fn negated_comparison() {
    let (text, diags) = run_mode(
        &with_prefs(".if !(${OPSYS} == NetBSD)\n.endif\n"),
        AutofixMode::Apply,
    );
    assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
    assert_diag(
        &diags,
        DiagCode::NEGATED_COMPARISON,
        "!(${OPSYS} == NetBSD) can be replaced with the simpler !${OPSYS:MNetBSD}.",
    );
    assert_eq!(text, with_prefs(".if !${OPSYS:MNetBSD}\n.endif\n"));

    let (_, diags) = run_mode(&text, AutofixMode::Apply);
    assert_clean(&diags);
}

#[test]
fn negated_comparison_with_pattern_is_kept() {
    assert_clean(&check(&with_prefs(".if !(${OPSYS} == Net*)\n.endif\n")));
}

#[test]
fn simplifications_can_be_switched_off() {
    let options = CheckOptions {
        simplify: false,
        ..CheckOptions::default()
    };
    let (_, diags) = linter(options).check_text("Makefile", NOT_EMPTY, &NoScope);
    assert_clean(&diags);
}

// ─────────────────────────────────────────────────────────────────────
// Version comparisons
// ─────────────────────────────────────────────────────────────────────

#[test]
fn quoted_version_equality_suggests_pattern() {
    let text = with_prefs(".if ${OS_VERSION} == \"5.10\"\n.endif\n");
    for mode in [AutofixMode::Off, AutofixMode::Preview, AutofixMode::Apply] {
        let (after, diags) = run_mode(&text, mode);
        assert_eq!(diags.len(), 1, "{:#?}", all(&diags));
        assert_diag(
            &diags,
            DiagCode::VERSION_STRING_COMPARISON,
            "Use pattern matching like ${OS_VERSION:M5.10} instead of the comparison ${OS_VERSION} == \"5.10\".",
        );
        assert_eq!(after, text);
    }
}

#[test]
fn numeric_version_comparisons() {
    let diags = check(&with_prefs(
        ".if ${OS_VERSION} > 5.1\n.endif\n.if ${OS_VERSION} < \"5.10\"\n.endif\n",
    ));
    assert_eq!(
        messages(&diags, DiagCode::NUMERIC_VERSION_COMPARISON),
        vec![
            "Numeric comparison ${OS_VERSION} > 5.1.",
            "Numeric comparison ${OS_VERSION} < \"5.10\".",
        ]
    );
}

#[test]
fn version_literal_on_the_left() {
    let diags = check(&with_prefs(
        ".if \"5.10\" == ${OS_VERSION}\n.endif\n.if 5.10 < ${OS_VERSION}\n.endif\n",
    ));
    assert_eq!(
        messages(&diags, DiagCode::VERSION_STRING_COMPARISON),
        vec!["Use pattern matching like ${OS_VERSION:M5.10} instead of the comparison \"5.10\" == ${OS_VERSION}."]
    );
    assert_eq!(
        messages(&diags, DiagCode::NUMERIC_VERSION_COMPARISON),
        vec!["Numeric comparison 5.10 < ${OS_VERSION}."]
    );
    assert_eq!(diags.len(), 2, "{:#?}", all(&diags));
}

#[test]
fn plain_numbers_are_not_versions() {
    assert_clean(&check(&with_prefs(".if ${OS_VERSION} > 5\n.endif\n")));
}

// ─────────────────────────────────────────────────────────────────────
// Files and configuration
// ─────────────────────────────────────────────────────────────────────

#[test]
fn check_file_saves_applied_fixes() {
    let dir = std::env::temp_dir().join(format!("mklint-checker-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("Makefile");
    std::fs::write(&path, "\techo ${PREFIX:Q}\n").unwrap();

    let mut linter = linter(CheckOptions::default().with_autofix(AutofixMode::Apply));
    let diags = linter.check_file(&path, &NoScope).unwrap();
    assert_eq!(diags.with_code(DiagCode::QUOTE_REDUNDANT).count(), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "\techo ${PREFIX}\n");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn saving_keeps_line_endings_of_untouched_lines() {
    let dir = std::env::temp_dir().join(format!("mklint-crlf-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("Makefile");
    std::fs::write(&path, "COMMENT=\tx\r\n.if (${OPSYS} == NetBSD)\r\n.endif").unwrap();

    let mut linter = linter(CheckOptions::default().with_autofix(AutofixMode::Apply));
    let diags = linter.check_file(&path, &NoScope).unwrap();
    assert_eq!(diags.with_code(DiagCode::REDUNDANT_PARENS).count(), 1);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "COMMENT=\tx\r\n.if ${OPSYS} == NetBSD\r\n.endif"
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_an_io_error() {
    let mut linter = linter(CheckOptions::default());
    let path = std::env::temp_dir().join("mklint-does-not-exist/Makefile");
    let err = linter.check_file(&path, &NoScope).unwrap_err();
    assert!(err.to_string().starts_with("cannot access "));
}

#[test]
fn options_from_json_drive_the_checks() {
    let options = CheckOptions::from_json(r#"{"warn_quoting": false}"#).unwrap();
    let (_, diags) = linter(options).check_text("Makefile", "\techo \"${PREFIX:Q}\"\n", &NoScope);
    assert_clean(&diags);
}

#[test]
fn diagnostics_serialize_to_json() {
    let diags = check(NOT_EMPTY);
    let json = serde_json::to_string(&diags).unwrap();
    assert!(json.contains("\"code\":603"));
    assert!(json.contains("\"category\":\"simplification\""));
}

// ─────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────

const SAMPLE: &str = "\
.include \"../../mk/bsd.prefs.mk\"
PKGNAME=\t${WRKSRC}
USE_GNU_TOOLS=\tyes
.if ${OPSYS:MLinux} && !empty(PKG_BUILD_OPTIONS.foo)
.  if ${OPSYS:MNetBSD} || ${OS_VERSION} == \"5.10\"
.  endif
.endif
do-build:
\tcd ${WRKSRC} && ${CC} -DFLAGS=${CFLAGS} ${PREFIX:Q} ${UNKNOWN_VAR}
";

#[test]
fn determinism_100_iterations() {
    let reference: Vec<String> = all(&check(SAMPLE));
    assert!(!reference.is_empty());
    for _ in 0..100 {
        assert_eq!(all(&check(SAMPLE)), reference);
    }
}
