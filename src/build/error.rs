//! Task and build errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single leaf task.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// A literal (non-glob) source path does not exist
    #[error("File not found: {}", .0.display())]
    MissingSource(PathBuf),
    /// I/O error on a specific path
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// Offending pattern
        pattern: String,
        /// Underlying error
        #[source]
        source: glob::PatternError,
    },
    /// Sass compilation error
    #[error("Style compilation failed: {0}")]
    Style(String),
    /// CSS processing error (parse, prefix, minify)
    #[error("CSS processing failed in {stage}: {message}")]
    Css {
        /// Stage that failed
        stage: &'static str,
        /// Error text from the CSS library
        message: String,
    },
    /// Template rendering error
    #[error("Template {name} failed: {source}")]
    Template {
        /// Template name
        name: String,
        /// Underlying error
        #[source]
        source: minijinja::Error,
    },
    /// External transpiler failure
    #[error("Transpiler '{command}' failed: {message}")]
    Transpile {
        /// Program name
        command: String,
        /// Failure description (exit status and stderr)
        message: String,
    },
    /// Remote utility library could not be fetched
    #[error("Failed to fetch {url}: {message}")]
    Fetch {
        /// Requested URL
        url: String,
        /// Failure description
        message: String,
    },
    /// Unreadable or malformed lint rule file
    #[error("Invalid lint rule file {}: {message}", path.display())]
    LintConfig {
        /// Rule file
        path: PathBuf,
        /// What is wrong with it
        message: String,
    },
    /// Lint violations at error severity
    #[error("Style lint failed: {errors} error(s), {warnings} warning(s)")]
    Lint {
        /// Error-severity violation count
        errors: usize,
        /// Warning-severity violation count
        warnings: usize,
    },
    /// The output directory would take the sources with it
    #[error("Refusing to delete {}: it contains the project sources", .0.display())]
    UnsafeClean(PathBuf),
    /// Anything raised by a long-running leaf (server, watcher)
    #[error("{0}")]
    Service(String),
}

impl TaskError {
    /// Build an I/O error tagged with the path it concerns.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        TaskError::Io { path: path.to_path_buf(), source }
    }
}

/// Failure of a task graph run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A leaf task failed
    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        /// Leaf task name
        task: String,
        /// Leaf error
        #[source]
        source: TaskError,
    },
}

impl BuildError {
    /// Name of the task that failed.
    pub fn task(&self) -> &str {
        match self {
            BuildError::TaskFailed { task, .. } => task,
        }
    }
}
