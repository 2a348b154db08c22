//! Lint rule file loading.
//!
//! The rule file uses the sass-lint YAML layout:
//!
//! ```yaml
//! options:
//!   merge-default-rules: false
//! rules:
//!   no-ids: 2
//!   indentation:
//!     - 1
//!     - size: 4
//! ```
//!
//! A rule is either a bare severity or a `[severity, {options}]` pair.
//! With `merge-default-rules` (the default) the listed rules override the
//! built-in defaults; without it only the listed rules run.

use crate::build::TaskError;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// How a violation is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Rule disabled
    Off,
    /// Reported, does not fail the task
    Warning,
    /// Reported, fails the task
    Error,
}

impl Severity {
    /// Map a sass-lint severity number.
    pub fn from_level(level: u64) -> Option<Self> {
        match level {
            0 => Some(Severity::Off),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Off => "off",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Built-in rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rule {
    /// `#id` selectors
    NoIds,
    /// `!important`
    NoImportant,
    /// Spaces or tabs at the end of a line
    NoTrailingWhitespace,
    /// File does not end with a newline
    FinalNewline,
    /// Nesting indentation (`size`, default 2)
    Indentation,
    /// Lines longer than `length` (default 80)
    MaxLineLength,
    /// `/* */` comments (`/*!` is allowed)
    NoCssComments,
    /// `{}` with nothing inside
    NoEmptyRulesets,
    /// Units on zero lengths
    ZeroUnit,
}

impl Rule {
    /// Every rule, in report order.
    pub const ALL: [Rule; 9] = [
        Rule::NoIds,
        Rule::NoImportant,
        Rule::NoTrailingWhitespace,
        Rule::FinalNewline,
        Rule::Indentation,
        Rule::MaxLineLength,
        Rule::NoCssComments,
        Rule::NoEmptyRulesets,
        Rule::ZeroUnit,
    ];

    /// Rule name as written in rule files.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::NoIds => "no-ids",
            Rule::NoImportant => "no-important",
            Rule::NoTrailingWhitespace => "no-trailing-whitespace",
            Rule::FinalNewline => "final-newline",
            Rule::Indentation => "indentation",
            Rule::MaxLineLength => "max-line-length",
            Rule::NoCssComments => "no-css-comments",
            Rule::NoEmptyRulesets => "no-empty-rulesets",
            Rule::ZeroUnit => "zero-unit",
        }
    }

    /// Look a rule up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Rule::ALL.into_iter().find(|r| r.name() == name)
    }

    /// Severity when the rule file does not mention the rule.
    pub fn default_severity(&self) -> Severity {
        match self {
            Rule::MaxLineLength => Severity::Off,
            _ => Severity::Warning,
        }
    }
}

/// Severity and options of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSetting {
    /// Severity
    pub severity: Severity,
    /// Rule options (`size`, `length`, ...)
    pub options: Mapping,
}

impl RuleSetting {
    /// Integer option, or `default` when absent or not an integer.
    pub fn usize_option(&self, key: &str, default: usize) -> usize {
        self.options
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(default)
    }
}

/// Resolved rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct LintSettings {
    rules: BTreeMap<Rule, RuleSetting>,
}

impl Default for LintSettings {
    fn default() -> Self {
        let rules = Rule::ALL
            .into_iter()
            .map(|r| (r, RuleSetting { severity: r.default_severity(), options: Mapping::new() }))
            .collect();
        Self { rules }
    }
}

impl LintSettings {
    /// Settings with every rule off.
    pub fn empty() -> Self {
        let rules = Rule::ALL
            .into_iter()
            .map(|r| (r, RuleSetting { severity: Severity::Off, options: Mapping::new() }))
            .collect();
        Self { rules }
    }

    /// Load a rule file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, TaskError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no lint rule file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(TaskError::io(path, e)),
        };
        Self::parse(&text)
            .map_err(|message| TaskError::LintConfig { path: path.to_path_buf(), message })
    }

    /// Parse rule file contents.
    pub fn parse(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml::from_str(text).map_err(|e| e.to_string())?;

        let mut settings = if raw.options.merge_default_rules { Self::default() } else { Self::empty() };
        for (name, value) in raw.rules {
            let Some(rule) = Rule::from_name(&name) else {
                tracing::debug!(rule = %name, "ignoring unknown lint rule");
                continue;
            };
            settings.rules.insert(rule, parse_rule(&name, value)?);
        }
        Ok(settings)
    }

    /// Setting of one rule.
    pub fn get(&self, rule: Rule) -> Option<&RuleSetting> {
        self.rules.get(&rule)
    }

    /// Rules that are not off.
    pub fn enabled(&self) -> impl Iterator<Item = (Rule, &RuleSetting)> {
        self.rules.iter().filter(|(_, s)| s.severity != Severity::Off).map(|(r, s)| (*r, s))
    }

    /// Override one rule.
    pub fn set(&mut self, rule: Rule, severity: Severity) {
        let options = self.rules.get(&rule).map(|s| s.options.clone()).unwrap_or_default();
        self.rules.insert(rule, RuleSetting { severity, options });
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    options: RawOptions,
    #[serde(default)]
    rules: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawOptions {
    #[serde(rename = "merge-default-rules", default = "default_merge")]
    merge_default_rules: bool,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self { merge_default_rules: default_merge() }
    }
}

fn default_merge() -> bool {
    true
}

fn parse_rule(name: &str, value: Value) -> Result<RuleSetting, String> {
    let severity_of = |v: &Value| {
        v.as_u64()
            .and_then(Severity::from_level)
            .ok_or_else(|| format!("rule '{}': severity must be 0, 1 or 2", name))
    };

    match value {
        Value::Sequence(items) => {
            let mut items = items.into_iter();
            let severity = severity_of(&items.next().unwrap_or(Value::Null))?;
            let options = match items.next() {
                None => Mapping::new(),
                Some(Value::Mapping(options)) => options,
                Some(_) => return Err(format!("rule '{}': options must be a mapping", name)),
            };
            Ok(RuleSetting { severity, options })
        }
        other => Ok(RuleSetting { severity: severity_of(&other)?, options: Mapping::new() }),
    }
}
