//! Sass compilation with glob imports.
//!
//! `@import "blocks/*";` is not part of the Sass language. [`GlobImportFs`]
//! sits between the compiler and the disk and rewrites such imports into
//! one plain import per matching file, in every file the compiler reads.
//! It also records each file read so the compiled sheet can list its
//! sources.

use crate::build::sources::MATCH_OPTIONS;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// File extensions a glob import may pull in.
const IMPORTABLE_EXTENSIONS: &[&str] = &["scss", "sass", "css"];

fn glob_import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@import\s+["']([^"']*[*?][^"']*)["']\s*;"#).expect("glob import regex")
    })
}

/// Output of a successful compilation.
#[derive(Debug, Clone)]
pub struct CompiledSheet {
    /// Compiled CSS
    pub css: String,
    /// Every file the compiler read, in read order, with its original text
    pub loaded: Vec<(PathBuf, String)>,
}

/// Compile a Sass entry file.
///
/// The error is the compiler's diagnostic text.
pub fn compile(entry: &Path) -> Result<CompiledSheet, String> {
    let fs = GlobImportFs::default();
    let options = grass::Options::default().style(grass::OutputStyle::Expanded).fs(&fs);
    let css = grass::from_path(entry, &options).map_err(|e| e.to_string())?;
    Ok(CompiledSheet { css, loaded: fs.into_loaded() })
}

/// File system adapter that expands glob imports.
#[derive(Debug, Default)]
pub struct GlobImportFs {
    loaded: Mutex<Vec<(PathBuf, String)>>,
}

impl GlobImportFs {
    /// Files read so far.
    pub fn into_loaded(self) -> Vec<(PathBuf, String)> {
        self.loaded.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl grass::Fs for GlobImportFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let text = std::fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or(Path::new("."));
        let expanded = expand_glob_imports(&text, dir, path);

        self.loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((path.to_path_buf(), text));
        Ok(expanded.into_bytes())
    }
}

/// Rewrite every glob import in `source` into plain imports.
///
/// Patterns resolve against `dir`. Matches are sorted, restricted to Sass
/// and CSS files, and never include `current` (the importing file).
/// A pattern that matches nothing is dropped.
pub fn expand_glob_imports(source: &str, dir: &Path, current: &Path) -> String {
    glob_import_regex()
        .replace_all(source, |caps: &regex::Captures| {
            let pattern = &caps[1];
            let imports: Vec<String> = matching_imports(pattern, dir, current)
                .into_iter()
                .map(|import| format!("@import \"{}\";", import))
                .collect();
            if imports.is_empty() {
                tracing::debug!(pattern, "glob import matched no files");
            }
            imports.join("\n")
        })
        .into_owned()
}

fn matching_imports(pattern: &str, dir: &Path, current: &Path) -> Vec<String> {
    let full = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), pattern);
    let Ok(paths) = glob::glob_with(&full, MATCH_OPTIONS) else {
        tracing::warn!(pattern, "invalid glob import");
        return vec![];
    };

    let mut matches: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file() && p != current)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMPORTABLE_EXTENSIONS.contains(&e))
        })
        .collect();
    matches.sort();

    matches
        .iter()
        .filter_map(|p| p.strip_prefix(dir).ok())
        .map(|rel| rel.with_extension("").to_string_lossy().replace('\\', "/"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_expand_glob_imports_sorted() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "blocks/_header.scss", "");
        write(temp.path(), "blocks/_footer.scss", "");
        write(temp.path(), "blocks/readme.md", "");
        let main = temp.path().join("main.scss");

        let out = expand_glob_imports("@import \"blocks/*\";\nbody { margin: 0; }", temp.path(), &main);
        assert_eq!(
            out,
            "@import \"blocks/_footer\";\n@import \"blocks/_header\";\nbody { margin: 0; }"
        );
    }

    #[test]
    fn test_expand_leaves_plain_imports() {
        let temp = TempDir::new().unwrap();
        let main = temp.path().join("main.scss");
        let source = "@import 'buttons';\n";
        assert_eq!(expand_glob_imports(source, temp.path(), &main), source);
    }

    #[test]
    fn test_expand_empty_match_is_dropped() {
        let temp = TempDir::new().unwrap();
        let main = temp.path().join("main.scss");
        assert_eq!(expand_glob_imports("@import \"none/*\";", temp.path(), &main), "");
    }

    #[test]
    fn test_compile_with_partial() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "_buttons.scss", ".btn { color: red; }\n");
        let main = write(temp.path(), "main.scss", "@import \"buttons\";\nbody { .x { margin: 0; } }\n");

        let sheet = compile(&main).unwrap();
        assert!(sheet.css.contains(".btn"));
        assert!(sheet.css.contains("body .x"));
        let loaded: Vec<_> = sheet.loaded.iter().map(|(p, _)| p.file_name().unwrap().to_owned()).collect();
        assert!(loaded.contains(&"main.scss".into()));
        assert!(loaded.contains(&"_buttons.scss".into()));
    }

    #[test]
    fn test_compile_expands_nested_glob_imports() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "blocks/_a.scss", "@import \"parts/*\";\n.a { color: red; }\n");
        write(temp.path(), "blocks/parts/_p.scss", ".p { color: blue; }\n");
        let main = write(temp.path(), "main.scss", "@import \"blocks/*\";\n");

        let css = compile(&main).unwrap().css;
        assert!(css.contains(".p"));
        assert!(css.contains(".a"));
        assert!(css.find(".p").unwrap() < css.find(".a").unwrap());
    }

    #[test]
    fn test_compile_syntax_error() {
        let temp = TempDir::new().unwrap();
        let main = write(temp.path(), "main.scss", "body { color: ; \n");
        assert!(compile(&main).is_err());
    }
}
