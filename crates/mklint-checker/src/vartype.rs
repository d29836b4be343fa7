//! Variable types and access control.
//!
//! A [`VariableType`] pairs a [`BasicType`] with declaration options and an
//! ordered list of [`AclRule`]s. The first rule whose file pattern matches
//! the basename of the current file decides the [`Permissions`].

use std::fmt;
use std::ops::BitOr;
use std::path::Path;

use globset::{Glob, GlobMatcher};
use mklint_types::{MklintError, Result};

// ══════════════════════════════════════════════════════════════════════════════
// Basic types
// ══════════════════════════════════════════════════════════════════════════════

/// The kind of value a variable holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Unknown,
    Category,
    CFlag,
    Comment,
    DependencyPattern,
    /// One of a fixed set of values.
    Enum(&'static [&'static str]),
    FileName,
    FilePattern,
    Homepage,
    Identifier,
    Integer,
    LdFlag,
    License,
    MachineArch,
    MailAddress,
    Option,
    Pathname,
    PathPattern,
    PkgName,
    PkgOptionsVar,
    PkgRevision,
    ShellCommand,
    ShellCommands,
    ShellWord,
    Tool,
    Url,
    UserGroupName,
    VariableName,
    Version,
    Yes,
    YesNo,
}

impl BasicType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Category => "Category",
            Self::CFlag => "CFlag",
            Self::Comment => "Comment",
            Self::DependencyPattern => "DependencyPattern",
            Self::Enum(_) => "Enum",
            Self::FileName => "FileName",
            Self::FilePattern => "FilePattern",
            Self::Homepage => "Homepage",
            Self::Identifier => "Identifier",
            Self::Integer => "Integer",
            Self::LdFlag => "LdFlag",
            Self::License => "License",
            Self::MachineArch => "MachineArch",
            Self::MailAddress => "MailAddress",
            Self::Option => "Option",
            Self::Pathname => "Pathname",
            Self::PathPattern => "PathPattern",
            Self::PkgName => "PkgName",
            Self::PkgOptionsVar => "PkgOptionsVar",
            Self::PkgRevision => "PkgRevision",
            Self::ShellCommand => "ShellCommand",
            Self::ShellCommands => "ShellCommands",
            Self::ShellWord => "ShellWord",
            Self::Tool => "Tool",
            Self::Url => "Url",
            Self::UserGroupName => "UserGroupName",
            Self::VariableName => "VariableName",
            Self::Version => "Version",
            Self::Yes => "Yes",
            Self::YesNo => "YesNo",
        }
    }

    pub fn enum_values(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Enum(values) => Some(values),
            _ => None,
        }
    }

    /// Values of these types never contain characters that are special to
    /// the shell.
    pub fn is_shell_safe(self) -> bool {
        matches!(
            self,
            Self::Enum(_)
                | Self::Category
                | Self::FileName
                | Self::Identifier
                | Self::Integer
                | Self::MachineArch
                | Self::Option
                | Self::Pathname
                | Self::PkgName
                | Self::PkgOptionsVar
                | Self::PkgRevision
                | Self::UserGroupName
                | Self::VariableName
                | Self::Version
                | Self::Yes
                | Self::YesNo
        )
    }

    /// Values of these types may contain spaces or shell metacharacters
    /// and must be quoted when they form a single shell word.
    pub fn may_need_quoting(self) -> bool {
        matches!(
            self,
            Self::Comment
                | Self::Homepage
                | Self::Url
                | Self::MailAddress
                | Self::ShellWord
                | Self::CFlag
                | Self::LdFlag
                | Self::License
        )
    }

    /// Whether a value of type `self` may be assigned to a variable of type
    /// `target`.
    pub fn is_assignable_to(self, target: BasicType) -> bool {
        let command = matches!(self, Self::ShellCommand | Self::ShellCommands);
        let plain_value = matches!(
            target,
            Self::Pathname
                | Self::FileName
                | Self::Url
                | Self::Version
                | Self::Integer
                | Self::Yes
                | Self::YesNo
        );
        !(command && plain_value)
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Permissions
// ══════════════════════════════════════════════════════════════════════════════

/// A set of permissions drawn from set, append, use and use-loadtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions(u8);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const SET: Permissions = Permissions(1);
    pub const APPEND: Permissions = Permissions(2);
    pub const USE: Permissions = Permissions(4);
    pub const USE_LOADTIME: Permissions = Permissions(8);
    pub const ALL: Permissions = Permissions(15);

    const NAMES: [(Permissions, &'static str); 4] = [
        (Self::SET, "set"),
        (Self::APPEND, "append"),
        (Self::USE, "use"),
        (Self::USE_LOADTIME, "use-loadtime"),
    ];

    pub fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Permissions) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parse a single permission name.
    pub fn from_name(name: &str) -> Option<Permissions> {
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|&(perm, _)| perm)
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(perm, _)| self.contains(*perm))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ACL rules
// ══════════════════════════════════════════════════════════════════════════════

/// One file pattern and the permissions it grants.
#[derive(Debug, Clone)]
pub struct AclRule {
    pub pattern: String,
    matcher: GlobMatcher,
    pub permissions: Permissions,
}

impl AclRule {
    pub fn new(pattern: &str, permissions: Permissions) -> Result<Self> {
        let matcher = Glob::new(pattern)
            .map_err(|e| MklintError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            permissions,
        })
    }

    /// Parse rule text such as `"Makefile, *.mk: set, append, use"`.
    ///
    /// Every pattern becomes its own rule, in the order written.
    pub fn parse(varname: &str, text: &str) -> Result<Vec<AclRule>> {
        let invalid = |reason: &str| MklintError::InvalidAcl {
            varname: varname.to_string(),
            rule: text.to_string(),
            reason: reason.to_string(),
        };

        let (patterns, perms) = text.split_once(':').ok_or_else(|| invalid("missing ':'"))?;

        let mut permissions = Permissions::NONE;
        for name in perms.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let perm = Permissions::from_name(name)
                .ok_or_else(|| invalid(&format!("unknown permission {name:?}")))?;
            permissions = permissions | perm;
        }

        let patterns: Vec<&str> = patterns
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if patterns.is_empty() {
            return Err(invalid("no file pattern"));
        }
        patterns
            .into_iter()
            .map(|pattern| AclRule::new(pattern, permissions))
            .collect()
    }

    /// Whether this rule applies to `filename`, matched by its basename.
    pub fn matches(&self, filename: &str) -> bool {
        let basename = Path::new(filename)
            .file_name()
            .map_or(Path::new(filename), Path::new);
        self.matcher.is_match(basename)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Variable types
// ══════════════════════════════════════════════════════════════════════════════

/// Declaration options of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarOptions {
    /// The value is a whitespace-separated list.
    pub list: bool,
    /// The type was inferred from the variable name.
    pub guessed: bool,
    pub package_settable: bool,
    pub user_settable: bool,
    pub system_provided: bool,
    /// Defined before any file of a package is loaded.
    pub always_in_scope: bool,
}

/// The declared type of a variable.
#[derive(Debug, Clone)]
pub struct VariableType {
    pub basic: BasicType,
    pub options: VarOptions,
    pub rules: Vec<AclRule>,
}

impl VariableType {
    pub fn new(basic: BasicType, options: VarOptions, rules: Vec<AclRule>) -> Self {
        Self {
            basic,
            options,
            rules,
        }
    }

    pub fn is_list(&self) -> bool {
        self.options.list
    }

    pub fn is_guessed(&self) -> bool {
        self.options.guessed
    }

    /// The permissions of the first rule matching `filename`, or none.
    pub fn effective_permissions(&self, filename: &str) -> Permissions {
        self.rules
            .iter()
            .find(|rule| rule.matches(filename))
            .map_or(Permissions::NONE, |rule| rule.permissions)
    }

    /// Everything any rule grants, in any file.
    pub fn union(&self) -> Permissions {
        self.rules
            .iter()
            .fold(Permissions::NONE, |acc, rule| acc | rule.permissions)
    }

    /// The patterns of all rules granting `perm`, as `A, B or C`.
    pub fn alternative_files(&self, perm: Permissions) -> String {
        let patterns: Vec<&str> = self
            .rules
            .iter()
            .filter(|rule| rule.permissions.contains(perm))
            .map(|rule| rule.pattern.as_str())
            .collect();
        match patterns.as_slice() {
            [] => String::new(),
            [only] => (*only).to_string(),
            [init @ .., last] => format!("{} or {}", init.join(", "), last),
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_list() {
            write!(f, "List of {}", self.basic)
        } else {
            write!(f, "{}", self.basic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vartype(rules: &[&str]) -> VariableType {
        let rules = rules
            .iter()
            .flat_map(|text| AclRule::parse("VAR", text).unwrap())
            .collect();
        VariableType::new(BasicType::Pathname, VarOptions::default(), rules)
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let t = vartype(&["buildlink3.mk:", "*.mk: set, use", "*: use"]);
        assert_eq!(t.effective_permissions("buildlink3.mk"), Permissions::NONE);
        assert_eq!(
            t.effective_permissions("options.mk"),
            Permissions::SET | Permissions::USE
        );
        assert_eq!(t.effective_permissions("Makefile"), Permissions::USE);
    }

    #[test]
    fn test_no_matching_rule_means_no_permissions() {
        let t = vartype(&["Makefile: set"]);
        assert!(t.effective_permissions("options.mk").is_empty());
    }

    #[test]
    fn test_rules_match_basename() {
        let t = vartype(&["Makefile.*: set"]);
        assert_eq!(
            t.effective_permissions("category/package/Makefile.common"),
            Permissions::SET
        );
    }

    #[test]
    fn test_alternative_files() {
        let t = vartype(&["Makefile, Makefile.*, *.mk: set", "*: use"]);
        assert_eq!(
            t.alternative_files(Permissions::SET),
            "Makefile, Makefile.* or *.mk"
        );
        assert_eq!(t.alternative_files(Permissions::USE), "*");
        assert_eq!(t.alternative_files(Permissions::APPEND), "");
    }

    #[test]
    fn test_invalid_rule_text() {
        assert!(matches!(
            AclRule::parse("VAR", "Makefile set"),
            Err(MklintError::InvalidAcl { .. })
        ));
        assert!(matches!(
            AclRule::parse("VAR", "Makefile: write"),
            Err(MklintError::InvalidAcl { .. })
        ));
        assert!(matches!(
            AclRule::parse("VAR", "[: set"),
            Err(MklintError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_permission_display() {
        assert_eq!((Permissions::SET | Permissions::USE).to_string(), "set, use");
        assert_eq!(Permissions::NONE.to_string(), "none");
    }

    #[test]
    fn test_command_not_assignable_to_path() {
        assert!(!BasicType::ShellCommand.is_assignable_to(BasicType::Pathname));
        assert!(BasicType::Pathname.is_assignable_to(BasicType::ShellCommand));
        assert!(BasicType::ShellCommand.is_assignable_to(BasicType::ShellCommand));
    }
}
