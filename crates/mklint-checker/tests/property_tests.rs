//! Property tests for the pattern algebra and the permission lookup.

use mklint_checker::{Pattern, TypeRegistry};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn pattern(text: &str) -> Pattern {
    Pattern::compile(text).expect("generated patterns are valid")
}

fn filenames() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Makefile".to_string()),
        Just("Makefile.common".to_string()),
        Just("options.mk".to_string()),
        Just("bsd.options.mk".to_string()),
        Just("buildlink3.mk".to_string()),
        "[a-z]{1,8}(\\.mk)?",
        "[a-z]{1,4}/[a-z]{1,8}\\.mk",
    ]
}

const VARIABLES: &[&str] = &[
    "PKGNAME",
    "WRKSRC",
    "CATEGORIES",
    "COMMENT",
    "PKG_OPTIONS",
    "PKG_BUILD_OPTIONS.foo",
    "PREFIX",
    "OPSYS",
    "CFLAGS",
    "SOME_DIR",
];

// ─────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn intersection_is_symmetric(a in "[a-c*?]{0,6}", b in "[a-c*?]{0,6}") {
        let (a, b) = (pattern(&a), pattern(&b));
        prop_assert_eq!(a.intersect(&b).can_match(), b.intersect(&a).can_match());
    }

    #[test]
    fn literal_intersection_is_matching(literal in "[a-c]{0,6}", p in "[a-c*?]{0,6}") {
        let p = pattern(&p);
        let lit = pattern(&literal);
        prop_assert_eq!(lit.intersect(&p).can_match(), p.matches(&literal));
    }

    #[test]
    fn patterns_intersect_themselves(p in "[a-c*?]{0,6}") {
        let p = pattern(&p);
        prop_assert!(p.intersect(&p).can_match());
    }

    #[test]
    fn star_intersects_everything(p in "[a-c*?\\[\\]!-]{0,6}") {
        if let Ok(p) = Pattern::compile(&p) {
            let star = pattern("*");
            prop_assert_eq!(star.intersect(&p).can_match(), p.intersect(&p).can_match());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Permissions
// ─────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn effective_permissions_are_granted_somewhere(
        filename in filenames(),
        varname in prop::sample::select(VARIABLES),
    ) {
        let registry = TypeRegistry::new().unwrap();
        let vartype = registry.lookup(varname).unwrap();
        let perms = vartype.effective_permissions(&filename);
        prop_assert!(vartype.union().contains(perms));
        prop_assert_eq!(perms, vartype.effective_permissions(&filename));
    }

    #[test]
    fn directories_do_not_change_permissions(
        dir in "[a-z]{1,8}",
        filename in filenames(),
        varname in prop::sample::select(VARIABLES),
    ) {
        let registry = TypeRegistry::new().unwrap();
        let vartype = registry.lookup(varname).unwrap();
        let basename = filename.rsplit('/').next().unwrap_or(&filename);
        prop_assert_eq!(
            vartype.effective_permissions(&format!("{dir}/{filename}")),
            vartype.effective_permissions(basename)
        );
    }
}
