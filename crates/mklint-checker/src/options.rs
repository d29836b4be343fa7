//! Check configuration.

use serde::{Deserialize, Serialize};

use mklint_types::Result;

/// What happens to the fixes attached to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutofixMode {
    /// Fixes are attached to diagnostics but neither rendered nor applied.
    #[default]
    Off,
    /// Fixes are rendered as text; lines stay unchanged.
    Preview,
    /// Fixes are applied to the lines.
    Apply,
}

/// Which checks run and how their results are presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckOptions {
    /// Report variables that are used but not defined.
    pub warn_extra: bool,
    /// Report permission and load-time violations.
    pub warn_perm: bool,
    pub warn_quoting: bool,
    /// Report incompatible assignments and impossible enum patterns.
    pub warn_types: bool,
    /// Suggest simpler forms of conditions.
    pub simplify: bool,
    pub contradictions: bool,
    /// Attach explanations to diagnostics.
    pub explain: bool,
    pub autofix: AutofixMode,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            warn_extra: true,
            warn_perm: true,
            warn_quoting: true,
            warn_types: true,
            simplify: true,
            contradictions: true,
            explain: false,
            autofix: AutofixMode::Off,
        }
    }
}

impl CheckOptions {
    /// Decode options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_autofix(mut self, mode: AutofixMode) -> Self {
        self.autofix = mode;
        self
    }
}
