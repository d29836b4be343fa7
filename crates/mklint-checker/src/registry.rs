//! The variable type registry.
//!
//! Declares the type and access control list of every well-known variable,
//! the tools a package may use, and the variables that are deprecated.
//! Built once by [`TypeRegistry::new`] and read-only afterwards.

use std::cmp::Reverse;
use std::collections::HashMap;

use mklint_lexer::lines::varname_canon;
use mklint_types::Result;

use crate::vartype::{AclRule, BasicType, VarOptions, VariableType};

// ══════════════════════════════════════════════════════════════════════════════
// Tools
// ══════════════════════════════════════════════════════════════════════════════

/// When a tool's variable may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolValidity {
    /// Only in shell commands.
    AtRunTime,
    /// Also at load time, once `bsd.prefs.mk` has been included.
    AfterPrefsMk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    /// The name used in `USE_TOOLS`, e.g. `sed`.
    pub name: String,
    /// The variable holding the tool's command, e.g. `SED`.
    pub varname: String,
    pub validity: ToolValidity,
}

// ══════════════════════════════════════════════════════════════════════════════
// Option presets
// ══════════════════════════════════════════════════════════════════════════════

const PLAIN: VarOptions = VarOptions {
    list: false,
    guessed: false,
    package_settable: false,
    user_settable: false,
    system_provided: false,
    always_in_scope: false,
};
const LIST: VarOptions = VarOptions { list: true, ..PLAIN };
const PKG: VarOptions = VarOptions {
    package_settable: true,
    ..PLAIN
};
const PKG_LIST: VarOptions = VarOptions { list: true, ..PKG };
const SYS: VarOptions = VarOptions {
    system_provided: true,
    ..PLAIN
};
const SYS_LIST: VarOptions = VarOptions { list: true, ..SYS };
const SYS_ALWAYS: VarOptions = VarOptions {
    always_in_scope: true,
    ..SYS
};
const USR: VarOptions = VarOptions {
    user_settable: true,
    ..PLAIN
};
const USR_LIST: VarOptions = VarOptions { list: true, ..USR };
const GUESSED: VarOptions = VarOptions {
    guessed: true,
    ..PLAIN
};
const GUESSED_LIST: VarOptions = VarOptions {
    list: true,
    ..GUESSED
};

const GUESSED_RULES: &[&str] = &["*: set, append, use, use-loadtime"];

const OPSYS_VALUES: &[&str] = &[
    "AIX", "BSDOS", "Cygwin", "Darwin", "DragonFly", "FreeBSD", "FreeMiNT", "GNUkFreeBSD",
    "HPUX", "Haiku", "Interix", "IRIX", "Linux", "Minix", "MirBSD", "NetBSD", "OpenBSD", "OSF1",
    "QNX", "SCO_SV", "SunOS", "UnixWare",
];
const MACHINE_ARCH_VALUES: &[&str] = &[
    "aarch64", "alpha", "arm", "armeb", "earmv6hf", "earmv7hf", "hppa", "i386", "m68k", "mips",
    "mipsel", "powerpc", "powerpc64", "riscv64", "sparc", "sparc64", "vax", "x86_64",
];
const COMPILERS: &[&str] = &["ccache", "clang", "distcc", "f2c", "gcc", "mipspro", "sunpro", "xlc"];
const LANGUAGES: &[&str] = &[
    "ada", "c", "c99", "c++", "c++03", "c++11", "c++14", "c++17", "fortran", "fortran77", "java",
    "obj-c++", "objc",
];
const STAGES: &[&str] = &[
    "pre-configure",
    "do-configure",
    "post-configure",
    "pre-build",
    "do-build",
    "post-build",
    "pre-install",
    "post-install",
];

// ══════════════════════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════════════════════

/// Types, tools and deprecations of all well-known variables.
#[derive(Debug)]
pub struct TypeRegistry {
    types: HashMap<String, VariableType>,
    /// Guessed types by name suffix, longest suffix first.
    guesses: Vec<(&'static str, VariableType)>,
    /// Tools by variable name.
    tools: HashMap<String, Tool>,
    deprecated: HashMap<String, String>,
}

impl TypeRegistry {
    /// Create the registry with all built-in declarations.
    pub fn new() -> Result<Self> {
        let mut reg = Self::empty();
        reg.register_guesses()?;
        reg.register_system()?;
        reg.register_package()?;
        reg.register_flags()?;
        reg.register_options()?;
        reg.register_tools()?;
        reg.register_deprecated();
        Ok(reg)
    }

    /// A registry without any declarations.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            guesses: Vec::new(),
            tools: HashMap::new(),
            deprecated: HashMap::new(),
        }
    }

    /// Declare a variable. `rules` are ACL rule texts in evaluation order.
    pub fn declare(
        &mut self,
        varname: &str,
        basic: BasicType,
        options: VarOptions,
        rules: &[&str],
    ) -> Result<()> {
        let vartype = Self::build(varname, basic, options, rules)?;
        self.types.insert(varname.to_string(), vartype);
        Ok(())
    }

    /// Declare a tool together with the type of its variable.
    pub fn declare_tool(&mut self, name: &str, varname: &str, validity: ToolValidity) -> Result<()> {
        if !self.types.contains_key(varname) {
            self.declare(
                varname,
                BasicType::ShellCommand,
                SYS,
                &["*: use, use-loadtime"],
            )?;
        }
        self.tools.insert(
            varname.to_string(),
            Tool {
                name: name.to_string(),
                varname: varname.to_string(),
                validity,
            },
        );
        Ok(())
    }

    pub fn declare_deprecated(&mut self, varname: &str, instructions: &str) {
        self.deprecated
            .insert(varname.to_string(), instructions.to_string());
    }

    fn build(
        varname: &str,
        basic: BasicType,
        options: VarOptions,
        rules: &[&str],
    ) -> Result<VariableType> {
        let mut acl = Vec::new();
        for text in rules {
            acl.extend(AclRule::parse(varname, text)?);
        }
        Ok(VariableType::new(basic, options, acl))
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    /// The type of `varname`: declared exactly, declared in its
    /// parameterized form `VAR.*`, or guessed from its name.
    pub fn lookup(&self, varname: &str) -> Option<&VariableType> {
        self.declared(varname).or_else(|| self.guess(varname))
    }

    /// The declared type, without guessing.
    pub fn declared(&self, varname: &str) -> Option<&VariableType> {
        self.types
            .get(varname)
            .or_else(|| self.types.get(&varname_canon(varname)))
    }

    fn guess(&self, varname: &str) -> Option<&VariableType> {
        let base = varname.split('.').next().unwrap_or(varname);
        self.guesses
            .iter()
            .find(|(suffix, _)| base.ends_with(suffix))
            .map(|(_, vartype)| vartype)
    }

    pub fn tool_by_varname(&self, varname: &str) -> Option<&Tool> {
        self.tools.get(varname)
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Instructions for replacing a deprecated variable.
    pub fn deprecated(&self, varname: &str) -> Option<&str> {
        self.deprecated
            .get(varname)
            .or_else(|| self.deprecated.get(&varname_canon(varname)))
            .map(String::as_str)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Declarations
    // ══════════════════════════════════════════════════════════════════════

    fn register_guesses(&mut self) -> Result<()> {
        use BasicType::*;
        let table: &[(&'static str, BasicType, VarOptions)] = &[
            ("DIR", Pathname, GUESSED),
            ("_HOME", Pathname, GUESSED),
            ("FILE", Pathname, GUESSED),
            ("_PREFIX", Pathname, GUESSED),
            ("DIRS", PathPattern, GUESSED_LIST),
            ("FILES", PathPattern, GUESSED_LIST),
            ("_USER", UserGroupName, GUESSED),
            ("_GROUP", UserGroupName, GUESSED),
            ("_ENV", ShellWord, GUESSED_LIST),
            ("_ARGS", ShellWord, GUESSED_LIST),
            ("FLAGS", ShellWord, GUESSED_LIST),
            ("_CFLAGS", CFlag, GUESSED_LIST),
            ("_CPPFLAGS", CFlag, GUESSED_LIST),
            ("_CXXFLAGS", CFlag, GUESSED_LIST),
            ("_LDFLAGS", LdFlag, GUESSED_LIST),
            ("_CMD", ShellCommand, GUESSED),
            ("_MK", Unknown, GUESSED),
            ("_VAR", VariableName, GUESSED),
            ("_VARS", VariableName, GUESSED_LIST),
            ("_NAME", Identifier, GUESSED),
        ];
        for &(suffix, basic, options) in table {
            let vartype = Self::build(suffix, basic, options, GUESSED_RULES)?;
            self.guesses.push((suffix, vartype));
        }
        self.guesses.sort_by_key(|(suffix, _)| Reverse(suffix.len()));
        Ok(())
    }

    /// Variables provided by the infrastructure.
    fn register_system(&mut self) -> Result<()> {
        use BasicType::*;
        let anywhere = &["*: use, use-loadtime"];
        self.declare("OPSYS", Enum(OPSYS_VALUES), SYS, anywhere)?;
        self.declare("OS_VERSION", Version, SYS, anywhere)?;
        self.declare("MACHINE_ARCH", Enum(MACHINE_ARCH_VALUES), SYS, anywhere)?;
        self.declare("LOWER_OPSYS", Identifier, SYS, anywhere)?;
        self.declare("PKGSRCDIR", Pathname, SYS_ALWAYS, anywhere)?;
        self.declare("PKGSRC_COMPILER", Enum(COMPILERS), USR_LIST, anywhere)?;
        self.declare("LOCALBASE", Pathname, USR, anywhere)?;
        self.declare("PKG_DEVELOPER", YesNo, USR, anywhere)?;
        self.declare("PREFIX", Pathname, SYS, &["buildlink3.mk:", "*: use"])?;
        self.declare("WRKDIR", Pathname, SYS, &["*: use"])?;
        self.declare("DESTDIR", Pathname, SYS, &["*: use"])?;
        self.declare("CC", ShellCommand, SYS, &["*: use"])?;
        self.declare("CXX", ShellCommand, SYS, &["*: use"])?;
        self.declare("SH", ShellCommand, SYS, &["*: use"])?;
        self.declare("BASH", ShellCommand, SYS, &["*: use"])?;
        self.declare("TOOLS_PLATFORM.*", ShellCommand, SYS, &["*: use"])?;
        self.declare("PKG_SYSCONFDIR", Pathname, SYS, &["*: use"])?;
        Ok(())
    }

    /// Variables describing a package.
    fn register_package(&mut self) -> Result<()> {
        use BasicType::*;
        let makefiles = &["Makefile, Makefile.*, *.mk: set, append, use"];
        self.declare(
            "PKGNAME",
            PkgName,
            PKG,
            &["Makefile, Makefile.*, *.mk: set, use, use-loadtime"],
        )?;
        self.declare(
            "DISTNAME",
            FileName,
            PKG,
            &["Makefile, Makefile.*, *.mk: set, use, use-loadtime"],
        )?;
        self.declare("PKGREVISION", PkgRevision, PKG, &["Makefile: set, use"])?;
        self.declare(
            "CATEGORIES",
            Category,
            PKG_LIST,
            &["Makefile: set, append", "Makefile.common: set, append, use"],
        )?;
        self.declare(
            "COMMENT",
            Comment,
            PKG,
            &["Makefile, Makefile.common: set, append"],
        )?;
        self.declare("HOMEPAGE", Homepage, PKG, &["Makefile, Makefile.common: set"])?;
        self.declare(
            "MAINTAINER",
            MailAddress,
            PKG,
            &["Makefile, Makefile.common: set"],
        )?;
        self.declare(
            "LICENSE",
            License,
            PKG,
            &["Makefile, Makefile.*, *.mk: set, append"],
        )?;
        self.declare("MASTER_SITES", Url, PKG_LIST, makefiles)?;
        self.declare(
            "WRKSRC",
            Pathname,
            PKG,
            &["Makefile, Makefile.*, *.mk: set, use"],
        )?;
        self.declare(
            "FILESDIR",
            Pathname,
            PKG,
            &["Makefile, Makefile.*, *.mk: set, use, use-loadtime"],
        )?;
        self.declare(
            "GNU_CONFIGURE",
            Yes,
            PKG,
            &["Makefile, Makefile.*, *.mk: set, use, use-loadtime"],
        )?;
        self.declare("CONFIGURE_ARGS", ShellWord, PKG_LIST, makefiles)?;
        self.declare("CONFIGURE_ENV", ShellWord, PKG_LIST, makefiles)?;
        self.declare("MAKE_ENV", ShellWord, PKG_LIST, makefiles)?;
        self.declare("MAKE_FLAGS", ShellWord, PKG_LIST, makefiles)?;
        self.declare(
            "USE_TOOLS",
            BasicType::Tool,
            PKG_LIST,
            &["Makefile, Makefile.*, *.mk: set, append, use, use-loadtime"],
        )?;
        self.declare("USE_LANGUAGES", Enum(LANGUAGES), PKG_LIST, makefiles)?;
        self.declare(
            "INSTALLATION_DIRS",
            Pathname,
            PKG_LIST,
            &["Makefile, Makefile.*, *.mk: set, append"],
        )?;
        self.declare(
            "DEPENDS",
            DependencyPattern,
            PKG_LIST,
            &["Makefile, Makefile.*, *.mk: append"],
        )?;
        self.declare(
            "BUILDLINK_API_DEPENDS.*",
            DependencyPattern,
            PKG_LIST,
            &[
                "buildlink3.mk, builtin.mk: set, append, use",
                "Makefile, Makefile.*, *.mk: set, append, use",
            ],
        )?;
        self.declare(
            "PKG_SHELL.*",
            Pathname,
            PKG,
            &["Makefile, Makefile.*, *.mk: set, use"],
        )?;
        self.declare(
            "SUBST_CLASSES",
            Identifier,
            PKG_LIST,
            &["Makefile, Makefile.*, *.mk: append"],
        )?;
        self.declare("SUBST_SED.*", ShellWord, PKG_LIST, makefiles)?;
        self.declare("SUBST_FILES.*", PathPattern, PKG_LIST, makefiles)?;
        self.declare(
            "SUBST_STAGE.*",
            Enum(STAGES),
            PKG,
            &["Makefile, Makefile.*, *.mk: set"],
        )?;
        Ok(())
    }

    /// Compiler and linker flags.
    fn register_flags(&mut self) -> Result<()> {
        use BasicType::*;
        let makefiles = &["Makefile, Makefile.*, *.mk: set, append, use"];
        self.declare("CFLAGS", CFlag, PKG_LIST, makefiles)?;
        self.declare("CPPFLAGS", CFlag, PKG_LIST, makefiles)?;
        self.declare("CXXFLAGS", CFlag, PKG_LIST, makefiles)?;
        self.declare("LDFLAGS", LdFlag, PKG_LIST, makefiles)?;
        self.declare("LIBS", LdFlag, PKG_LIST, makefiles)?;
        Ok(())
    }

    /// The package options framework.
    fn register_options(&mut self) -> Result<()> {
        use BasicType::PkgOptionsVar;
        self.declare(
            "PKG_OPTIONS_VAR",
            PkgOptionsVar,
            PKG,
            &["options.mk, Makefile, Makefile.*: set"],
        )?;
        self.declare(
            "PKG_SUPPORTED_OPTIONS",
            BasicType::Option,
            PKG_LIST,
            &["options.mk, Makefile, Makefile.*, *.mk: set, append"],
        )?;
        self.declare(
            "PKG_SUGGESTED_OPTIONS",
            BasicType::Option,
            PKG_LIST,
            &["options.mk, Makefile, Makefile.*, *.mk: set, append"],
        )?;
        self.declare(
            "PKG_OPTIONS",
            BasicType::Option,
            SYS_LIST,
            &[
                "bsd.options.mk: set",
                "options.mk, Makefile, Makefile.*, *.mk: use, use-loadtime",
            ],
        )?;
        self.declare(
            "PKG_BUILD_OPTIONS.*",
            BasicType::Option,
            LIST,
            &["Makefile, Makefile.*, *.mk: use, use-loadtime"],
        )?;
        Ok(())
    }

    fn register_tools(&mut self) -> Result<()> {
        use ToolValidity::*;
        let table: &[(&str, &str, ToolValidity)] = &[
            ("awk", "AWK", AfterPrefsMk),
            ("grep", "GREP", AfterPrefsMk),
            ("perl", "PERL5", AfterPrefsMk),
            ("sed", "SED", AfterPrefsMk),
            ("chmod", "CHMOD", AtRunTime),
            ("cp", "CP", AtRunTime),
            ("echo", "ECHO", AtRunTime),
            ("false", "FALSE", AtRunTime),
            ("find", "FIND", AtRunTime),
            ("gmake", "GMAKE", AtRunTime),
            ("install", "INSTALL", AtRunTime),
            ("ln", "LN", AtRunTime),
            ("mkdir", "MKDIR", AtRunTime),
            ("patch", "PATCH", AtRunTime),
            ("pkg-config", "PKG_CONFIG", AtRunTime),
            ("rm", "RM", AtRunTime),
            ("test", "TEST", AtRunTime),
            ("true", "TRUE", AtRunTime),
        ];
        for &(name, varname, validity) in table {
            self.declare_tool(name, varname, validity)?;
        }
        Ok(())
    }

    fn register_deprecated(&mut self) {
        self.declare_deprecated("USE_GNU_TOOLS", "Use USE_TOOLS instead.");
        self.declare_deprecated("NO_PATCH", "You can just remove it.");
        self.declare_deprecated(
            "USE_PERL5",
            "Use USE_TOOLS+=perl or USE_TOOLS+=perl:run instead.",
        );
        self.declare_deprecated("BUILD_USES_MSGFMT", "Use USE_TOOLS+=msgfmt instead.");
        self.declare_deprecated(
            "MASTER_SITE_SUBDIR",
            "Use some form of MASTER_SITES instead.",
        );
        self.declare_deprecated(
            "USE_X11",
            "Use ../../x11/libX11/buildlink3.mk instead.",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vartype::Permissions;

    fn registry() -> TypeRegistry {
        TypeRegistry::new().unwrap()
    }

    #[test]
    fn test_exact_and_parameterized_lookup() {
        let reg = registry();
        assert_eq!(reg.lookup("OPSYS").unwrap().basic.name(), "Enum");
        let opts = reg.lookup("PKG_BUILD_OPTIONS.foo").unwrap();
        assert!(opts.is_list());
        assert!(!opts.is_guessed());
        assert!(reg.lookup("PKG_BUILD_OPTIONS.${PKGBASE}").is_some());
    }

    #[test]
    fn test_guess_prefers_longest_suffix() {
        let reg = registry();
        let t = reg.lookup("MY_CFLAGS").unwrap();
        assert!(t.is_guessed());
        assert_eq!(t.basic, BasicType::CFlag);
        let t = reg.lookup("OTHER_FLAGS").unwrap();
        assert_eq!(t.basic, BasicType::ShellWord);
        let t = reg.lookup("EGDIR").unwrap();
        assert_eq!(t.basic, BasicType::Pathname);
        assert_eq!(t.effective_permissions("anything.mk"), Permissions::ALL);
    }

    #[test]
    fn test_unknown_name() {
        assert!(registry().lookup("WHATEVER").is_none());
    }

    #[test]
    fn test_tools() {
        let reg = registry();
        let sed = reg.tool_by_varname("SED").unwrap();
        assert_eq!(sed.name, "sed");
        assert_eq!(sed.validity, ToolValidity::AfterPrefsMk);
        assert_eq!(reg.declared("SED").unwrap().basic, BasicType::ShellCommand);
        assert!(reg.tool_by_varname("CFLAGS").is_none());
    }

    #[test]
    fn test_deprecated() {
        let reg = registry();
        assert_eq!(reg.deprecated("USE_GNU_TOOLS"), Some("Use USE_TOOLS instead."));
        assert_eq!(reg.deprecated("CFLAGS"), None);
    }

    #[test]
    fn test_first_rule_wins_in_declarations() {
        let reg = registry();
        let prefix = reg.lookup("PREFIX").unwrap();
        assert!(prefix.effective_permissions("buildlink3.mk").is_empty());
        assert_eq!(prefix.effective_permissions("Makefile"), Permissions::USE);
    }
}
