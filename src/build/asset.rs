//! In-flight output files.
//!
//! An [`Asset`] is what flows through a stage plan: the text being
//! transformed, the sources it came from, and an optional source map that
//! is written next to it.

use crate::build::TaskError;
use crate::transform::sourcemap::SourceMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A source file that contributed to an asset.
#[derive(Debug, Clone)]
pub struct Origin {
    /// Source path
    pub path: PathBuf,
    /// Source text
    pub content: String,
    /// First line (0-based) of this source inside the asset, when the asset
    /// is a plain concatenation
    pub first_line: Option<usize>,
}

/// Kind of text an asset holds; decides the source map comment syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Style sheet
    Css,
    /// Script
    Js,
}

/// An output file being built.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Output file name
    pub name: String,
    /// Kind of content
    pub kind: AssetKind,
    /// Current contents
    pub contents: String,
    /// Contributing sources
    pub origins: Vec<Origin>,
    /// Source map to write alongside, if any
    pub source_map: Option<SourceMap>,
}

impl Asset {
    /// Create an asset with no recorded origins.
    pub fn new(name: impl Into<String>, kind: AssetKind, contents: String) -> Self {
        Self { name: name.into(), kind, contents, origins: vec![], source_map: None }
    }

    /// Concatenate sources in order, joined by a newline.
    ///
    /// Each origin records the line it starts on so an exact line map can be
    /// produced later.
    pub fn concat(name: impl Into<String>, kind: AssetKind, sources: &[(PathBuf, String)]) -> Self {
        let mut contents = String::new();
        let mut origins = Vec::with_capacity(sources.len());
        let mut line = 0;

        for (i, (path, content)) in sources.iter().enumerate() {
            if i > 0 {
                contents.push('\n');
            }
            contents.push_str(content);
            origins.push(Origin { path: path.clone(), content: content.clone(), first_line: Some(line) });
            line += content.split('\n').count();
        }

        Self { name: name.into(), kind, contents, origins, source_map: None }
    }

    /// Read and concatenate files in order.
    pub fn concat_files(name: impl Into<String>, kind: AssetKind, paths: &[PathBuf]) -> Result<Self, TaskError> {
        let sources = paths
            .iter()
            .map(|p| fs::read_to_string(p).map(|c| (p.clone(), c)).map_err(|e| TaskError::io(p, e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::concat(name, kind, &sources))
    }

    /// Rename the output file.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name of the source map file written next to the asset.
    pub fn map_name(&self) -> String {
        format!("{}.map", self.name)
    }

    /// Comment that links the asset to its map file.
    pub fn map_comment(&self) -> String {
        match self.kind {
            AssetKind::Css => format!("/*# sourceMappingURL={} */", self.map_name()),
            AssetKind::Js => format!("//# sourceMappingURL={}", self.map_name()),
        }
    }

    /// Write the asset (and its map, if any) into `dir`, creating it.
    ///
    /// Returns the written paths.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, TaskError> {
        fs::create_dir_all(dir).map_err(|e| TaskError::io(dir, e))?;

        let mut written = Vec::new();
        let path = dir.join(&self.name);
        fs::write(&path, &self.contents).map_err(|e| TaskError::io(&path, e))?;
        written.push(path);

        if let Some(map) = &self.source_map {
            let map_path = dir.join(self.map_name());
            fs::write(&map_path, map.to_json()).map_err(|e| TaskError::io(&map_path, e))?;
            written.push(map_path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sources() -> Vec<(PathBuf, String)> {
        vec![
            (PathBuf::from("js/a.js"), "var a = 1;\n".to_string()),
            (PathBuf::from("js/b.js"), "var b = 2;".to_string()),
        ]
    }

    #[test]
    fn test_concat_joins_with_newline() {
        let asset = Asset::concat("main.js", AssetKind::Js, &sources());
        assert_eq!(asset.contents, "var a = 1;\n\nvar b = 2;");
        assert_eq!(asset.origins[0].first_line, Some(0));
        assert_eq!(asset.origins[1].first_line, Some(2));
    }

    #[test]
    fn test_rename_and_map_comment() {
        let asset = Asset::new("main.css", AssetKind::Css, String::new()).rename("main.min.css");
        assert_eq!(asset.name, "main.min.css");
        assert_eq!(asset.map_comment(), "/*# sourceMappingURL=main.min.css.map */");

        let js = Asset::new("main.min.js", AssetKind::Js, String::new());
        assert_eq!(js.map_comment(), "//# sourceMappingURL=main.min.js.map");
    }

    #[test]
    fn test_write_to_without_map() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("dist/js");
        let asset = Asset::concat("main.min.js", AssetKind::Js, &sources());

        let written = asset.write_to(&out).unwrap();
        assert_eq!(written, vec![out.join("main.min.js")]);
        assert_eq!(fs::read_to_string(out.join("main.min.js")).unwrap(), asset.contents);
        assert!(!out.join("main.min.js.map").exists());
    }

    #[test]
    fn test_concat_files_missing_file() {
        let result =
            Asset::concat_files("x.js", AssetKind::Js, &[PathBuf::from("/nonexistent/x.js")]);
        assert!(matches!(result, Err(TaskError::Io { .. })));
    }
}
