//! Variable references such as `${CFLAGS:M-O*:Q}`.

use std::fmt;

/// The bracket style a reference was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Brace {
    /// `${NAME}`
    Curly,
    /// `$(NAME)`
    Paren,
    /// `$N`, a single-character name.
    Single,
}

/// One modifier of a reference, stored without its leading `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Modifier {
    pub text: String,
}

/// Classification of a [`Modifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind<'a> {
    /// `:Mpattern` (positive) or `:Npattern`.
    Match { positive: bool, pattern: &'a str },
    /// `:S/from/to/` or `:C/regex/to/`.
    Subst,
    /// `:[1]`, `:[-1..1]`, ...
    RangeSelect,
    /// `:@var@body@`
    Loop,
    /// `:Q`
    Quote,
    Other,
}

impl Modifier {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn kind(&self) -> ModifierKind<'_> {
        let text = self.text.as_str();
        if let Some(pattern) = text.strip_prefix('M') {
            return ModifierKind::Match {
                positive: true,
                pattern,
            };
        }
        if let Some(pattern) = text.strip_prefix('N') {
            return ModifierKind::Match {
                positive: false,
                pattern,
            };
        }
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some('S' | 'C'), Some(sep)) if !sep.is_alphanumeric() => ModifierKind::Subst,
            (Some('['), _) => ModifierKind::RangeSelect,
            (Some('@'), _) => ModifierKind::Loop,
            (Some('Q'), None) => ModifierKind::Quote,
            _ => ModifierKind::Other,
        }
    }

    pub fn is_quote(&self) -> bool {
        matches!(self.kind(), ModifierKind::Quote)
    }
}

/// A parsed variable reference: a bare name plus a modifier chain.
///
/// The name may itself contain unresolved references, as in
/// `PKG_OPTIONS.${PKGBASE}`. Rendering with [`fmt::Display`] reproduces the
/// original text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub brace: Brace,
}

impl VarRef {
    /// A `${NAME}` reference without modifiers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
            brace: Brace::Curly,
        }
    }

    pub fn with_modifiers(mut self, modifiers: &[&str]) -> Self {
        self.modifiers = modifiers.iter().map(|m| Modifier::new(*m)).collect();
        self
    }

    /// Whether the name depends on another, unresolved reference.
    pub fn is_parameterized(&self) -> bool {
        self.name.contains('$')
    }

    /// The modifier chain as written, e.g. `:M*:Q`, or `""`.
    pub fn mods_text(&self) -> String {
        self.modifiers
            .iter()
            .map(|m| format!(":{}", m.text))
            .collect()
    }

    /// Whether the last modifier is `:Q`.
    pub fn has_quote(&self) -> bool {
        self.modifiers.last().is_some_and(Modifier::is_quote)
    }

    /// A copy of this reference with a trailing `:Q` added.
    pub fn with_quote(&self) -> VarRef {
        let mut quoted = self.clone();
        quoted.modifiers.push(Modifier::new("Q"));
        if quoted.brace == Brace::Single {
            quoted.brace = Brace::Curly;
        }
        quoted
    }

    /// A copy of this reference without its trailing `:Q`.
    pub fn without_quote(&self) -> VarRef {
        let mut plain = self.clone();
        if plain.has_quote() {
            plain.modifiers.pop();
        }
        plain
    }

    /// The `positive` flag and pattern if the chain is exactly one match modifier.
    pub fn single_match(&self) -> Option<(bool, &str)> {
        match self.modifiers.as_slice() {
            [only] => match only.kind() {
                ModifierKind::Match { positive, pattern } => Some((positive, pattern)),
                _ => None,
            },
            _ => None,
        }
    }

    /// The name and modifiers as written inside `empty(...)`, e.g. `VAR:M*`.
    pub fn name_with_mods(&self) -> String {
        format!("{}{}", self.name, self.mods_text())
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.brace {
            Brace::Curly => write!(f, "${{{}{}}}", self.name, self.mods_text()),
            Brace::Paren => write!(f, "$({}{})", self.name, self.mods_text()),
            Brace::Single => write!(f, "${}", self.name),
        }
    }
}
