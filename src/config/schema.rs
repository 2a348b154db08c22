//! Configuration schema types for `assetflow.toml`
//!
//! Defines the structure and validation rules for the pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::{Component, PathBuf};

/// Source, output and utility library locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Source root
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Output root (deleted on every build)
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
    /// General-purpose script library bundled first into the vendor script.
    /// A path relative to the project root, or an `http(s)://` URL.
    #[serde(default = "default_utility_lib")]
    pub utility_lib: String,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

fn default_utility_lib() -> String {
    "node_modules/jquery/dist/jquery.min.js".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { src: default_src(), dist: default_dist(), utility_lib: default_utility_lib() }
    }
}

/// Style compiler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Browserslist queries used for prefixing and minification
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Pixels per rem for the px-to-rem stage
    #[serde(default = "default_rem_base")]
    pub rem_base: u32,
    /// Treat Sass compile errors as task failures
    #[serde(default)]
    pub fail_on_error: bool,
}

fn default_browsers() -> Vec<String> {
    vec!["defaults".to_string()]
}

fn default_rem_base() -> u32 {
    16
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self { browsers: default_browsers(), rem_base: default_rem_base(), fail_on_error: false }
    }
}

/// Script bundler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Down-levelling command (argv); reads the bundle on stdin, writes to stdout.
    /// An empty list disables the stage.
    #[serde(default = "default_transpiler")]
    pub transpiler: Vec<String>,
}

fn default_transpiler() -> Vec<String> {
    vec!["npx".to_string(), "babel".to_string(), "--presets=@babel/preset-env".to_string()]
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self { transpiler: default_transpiler() }
    }
}

/// Style linter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    /// Rule file, relative to the project root
    #[serde(default = "default_lint_config_file")]
    pub config_file: PathBuf,
}

fn default_lint_config_file() -> PathBuf {
    PathBuf::from(".scss-config.yml")
}

impl Default for LintConfig {
    fn default() -> Self {
        Self { config_file: default_lint_config_file() }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

/// Complete assetflow.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Source/output/library locations
    #[serde(default)]
    pub paths: PathsConfig,
    /// Style compiler settings
    #[serde(default)]
    pub styles: StylesConfig,
    /// Script bundler settings
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Style linter settings
    #[serde(default)]
    pub lint: LintConfig,
    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "styles.rem_base")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assetflow.toml: '{}' {}", self.field, self.message)
    }
}

impl FlowConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.paths.src.as_os_str().is_empty() {
            push("paths.src", "must be a non-empty path");
        }
        if self.paths.dist.as_os_str().is_empty() {
            push("paths.dist", "must be a non-empty path");
        }
        if self.paths.utility_lib.trim().is_empty() {
            push("paths.utility_lib", "must be a non-empty path or URL");
        }
        if self.paths.src == self.paths.dist {
            push("paths.dist", "must differ from paths.src");
        }
        if self.paths.dist.components().any(|c| c == Component::ParentDir) {
            push("paths.dist", "must not contain '..'");
        }
        if self.styles.browsers.is_empty() {
            push("styles.browsers", "must contain at least one browserslist query");
        }
        if self.styles.rem_base == 0 {
            push("styles.rem_base", "must be a positive integer");
        }
        if self.server.port == 0 {
            push("server.port", "must be a positive integer");
        }
        if self.watch.debounce_ms == 0 {
            push("watch.debounce_ms", "must be a positive integer");
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
