//! Environment mode selection.
//!
//! The mode is read exactly once, by the CLI, and then travels inside the
//! [`BuildContext`](crate::build::BuildContext). Nothing else in the crate
//! looks at the process environment.

use std::fmt;
use std::str::FromStr;

/// Name of the environment variable that selects the mode.
pub const MODE_ENV_VAR: &str = "ASSETFLOW_ENV";

/// Build mode.
///
/// `Bare` is the state when no mode is selected: none of the mode-gated
/// stages run (no source maps, no prefixing, no minification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Neither dev nor prod
    #[default]
    Bare,
    /// Development: source maps, no minification
    Dev,
    /// Production: unit conversion, prefixing, grouping, minification
    Prod,
}

impl Mode {
    /// Interpret the raw value of [`MODE_ENV_VAR`].
    ///
    /// Only the exact values `dev` and `prod` select a mode; anything else,
    /// including an absent variable, is `Bare`.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("dev") => Mode::Dev,
            Some("prod") => Mode::Prod,
            Some(other) if !other.is_empty() => {
                tracing::warn!(value = other, "unrecognised {} value, using bare mode", MODE_ENV_VAR);
                Mode::Bare
            }
            _ => Mode::Bare,
        }
    }

    /// Read the mode from the process environment.
    pub fn from_env() -> Self {
        let value = std::env::var(MODE_ENV_VAR).ok();
        Self::from_env_value(value.as_deref())
    }

    /// Short name used in logs and template contexts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Bare => "",
            Mode::Dev => "dev",
            Mode::Prod => "prod",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Bare => write!(f, "bare"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Mode::Dev),
            "prod" => Ok(Mode::Prod),
            "bare" | "none" => Ok(Mode::Bare),
            other => Err(format!("unknown mode '{}', expected dev, prod or bare", other)),
        }
    }
}

/// Set of modes in which a stage is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSet {
    bare: bool,
    dev: bool,
    prod: bool,
}

impl ModeSet {
    /// Active in every mode.
    pub const ALL: ModeSet = ModeSet { bare: true, dev: true, prod: true };
    /// Active only in dev mode.
    pub const DEV: ModeSet = ModeSet { bare: false, dev: true, prod: false };
    /// Active only in prod mode.
    pub const PROD: ModeSet = ModeSet { bare: false, dev: false, prod: true };

    /// Whether the set contains `mode`.
    pub fn contains(&self, mode: Mode) -> bool {
        match mode {
            Mode::Bare => self.bare,
            Mode::Dev => self.dev,
            Mode::Prod => self.prod,
        }
    }
}

impl fmt::Display for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == ModeSet::ALL {
            return write!(f, "all");
        }
        let names: Vec<&str> = [(self.bare, "bare"), (self.dev, "dev"), (self.prod, "prod")]
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("+"))
    }
}
