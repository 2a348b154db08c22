//! Source file resolution.
//!
//! A [`SourceSet`] is an ordered list of source entries, each either a
//! literal path or a glob, plus exclusion globs. Resolution keeps the
//! declared entry order, which matters for concatenated bundles: the
//! matches of one entry are sorted, but entries are never reordered.

use crate::build::TaskError;
use glob::{glob, MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Match options shared by source sets and watch bindings: `*` never
/// crosses a directory separator, `**` does.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A resolved source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the set's base directory, used for output placement
    pub relative: PathBuf,
}

/// Ordered set of source entries under a root directory.
#[derive(Debug, Clone)]
pub struct SourceSet {
    root: PathBuf,
    base: PathBuf,
    entries: Vec<String>,
    excludes: Vec<String>,
}

impl SourceSet {
    /// Create an empty set rooted at `root`. Relative output paths are
    /// computed against `root` until [`with_base`](Self::with_base) is used.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self { base: root.clone(), root, entries: vec![], excludes: vec![] }
    }

    /// Set the base directory (relative to the root) that output paths are
    /// computed against.
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = self.root.join(base);
        self
    }

    /// Append an entry (relative to the root). Entries containing glob
    /// metacharacters are globs; anything else is a literal path that
    /// must exist.
    pub fn include(mut self, entry: &str) -> Self {
        self.entries.push(entry.to_string());
        self
    }

    /// Exclude files matching a glob (relative to the root).
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.excludes.push(pattern.to_string());
        self
    }

    /// Declared entries, in order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Resolve the set to concrete files.
    ///
    /// - entries are processed in declared order
    /// - matches of a single glob entry are sorted
    /// - a file matched by several entries keeps its first position
    /// - a literal entry that does not exist is an error; a glob that
    ///   matches nothing is not
    pub fn resolve(&self) -> Result<Vec<SourceFile>, TaskError> {
        let excludes = self
            .excludes
            .iter()
            .flat_map(|p| expand_braces(p))
            .map(|p| self.compile(&p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for entry in &self.entries {
            let matched = if is_glob(entry) {
                self.expand(entry)?
            } else {
                let path = self.root.join(entry);
                if !path.is_file() {
                    return Err(TaskError::MissingSource(path));
                }
                vec![path]
            };

            for path in matched {
                if excludes.iter().any(|p| p.matches_path_with(&path, MATCH_OPTIONS)) {
                    continue;
                }
                if seen.insert(path.clone()) {
                    let relative = self.relative_to_base(&path);
                    files.push(SourceFile { path, relative });
                }
            }
        }

        Ok(files)
    }

    /// Resolve and return only the paths.
    pub fn paths(&self) -> Result<Vec<PathBuf>, TaskError> {
        Ok(self.resolve()?.into_iter().map(|f| f.path).collect())
    }

    fn expand(&self, entry: &str) -> Result<Vec<PathBuf>, TaskError> {
        let mut files = Vec::new();
        for alternative in expand_braces(entry) {
            let pattern = self.full_pattern(&alternative);
            let paths = glob(&pattern)
                .map_err(|source| TaskError::Pattern { pattern: alternative.clone(), source })?;
            for path in paths {
                let path = path.map_err(|e| {
                    let path = e.path().to_path_buf();
                    TaskError::io(&path, e.into())
                })?;
                if path.is_file() {
                    files.push(path);
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn compile(&self, pattern: &str) -> Result<Pattern, TaskError> {
        Pattern::new(&self.full_pattern(pattern))
            .map_err(|source| TaskError::Pattern { pattern: pattern.to_string(), source })
    }

    fn full_pattern(&self, pattern: &str) -> String {
        format!("{}/{}", Pattern::escape(&self.root.to_string_lossy()), pattern)
    }

    fn relative_to_base(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.base) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
        }
    }
}

/// Whether an entry contains glob metacharacters.
pub fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '[', '{'])
}

/// Expand `{a,b}` alternatives, which the glob crate does not support.
///
/// Groups are expanded left to right, so `*.{jpg,png}` yields
/// `*.jpg` then `*.png`. Nested groups are not supported.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{}{}{}", prefix, alt, suffix)))
        .collect()
}
