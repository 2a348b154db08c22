//! Source map (revision 3) generation.
//!
//! Concatenated bundles get an exact line-to-line map. Assets whose
//! contents were produced by a compiler list their sources and embed their
//! content, with no mappings.

use crate::build::Origin;
use serde::Serialize;
use std::path::Path;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Prefix browsers show in front of source paths.
pub const SOURCE_ROOT: &str = "/source/";

/// A source map document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    /// Always 3
    pub version: u8,
    /// Generated file name
    pub file: String,
    /// Prefix for `sources`
    pub source_root: String,
    /// Source paths, relative to the source root directory
    pub sources: Vec<String>,
    /// Embedded source text
    pub sources_content: Vec<String>,
    /// Symbol names (unused)
    pub names: Vec<String>,
    /// Base64 VLQ mappings
    pub mappings: String,
}

impl SourceMap {
    /// Build a map for `file` from the origins of an asset.
    ///
    /// `src_root` is stripped from source paths. Mappings are produced only
    /// when every origin knows its first line in the generated text.
    pub fn build(file: &str, contents: &str, origins: &[Origin], src_root: &Path) -> Self {
        let sources = origins
            .iter()
            .map(|o| {
                let relative = o.path.strip_prefix(src_root).unwrap_or(o.path.as_path());
                relative.to_string_lossy().replace('\\', "/")
            })
            .collect();
        let sources_content = origins.iter().map(|o| o.content.clone()).collect();
        let mappings = if origins.iter().all(|o| o.first_line.is_some()) {
            line_mappings(origins, contents.split('\n').count())
        } else {
            String::new()
        };

        Self {
            version: 3,
            file: file.to_string(),
            source_root: SOURCE_ROOT.to_string(),
            sources,
            sources_content,
            names: vec![],
            mappings,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> String {
        // Only strings and integers: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Map every generated line to the source line it was copied from.
///
/// Generated lines that fall outside every origin get an empty entry.
pub fn line_mappings(origins: &[Origin], total_lines: usize) -> String {
    let line_counts: Vec<usize> = origins.iter().map(|o| o.content.split('\n').count()).collect();
    let mut mappings = String::new();
    let mut prev_source: i64 = 0;
    let mut prev_line: i64 = 0;

    for line in 0..total_lines {
        if line > 0 {
            mappings.push(';');
        }

        let found = origins
            .iter()
            .enumerate()
            .rev()
            .find(|(_, o)| o.first_line.is_some_and(|first| first <= line));
        let Some((index, origin)) = found else { continue };
        let src_line = line - origin.first_line.unwrap_or(0);
        if src_line >= line_counts[index] {
            continue;
        }

        let (index, src_line) = (index as i64, src_line as i64);
        encode_vlq(0, &mut mappings);
        encode_vlq(index - prev_source, &mut mappings);
        encode_vlq(src_line - prev_line, &mut mappings);
        encode_vlq(0, &mut mappings);
        prev_source = index;
        prev_line = src_line;
    }

    mappings
}

/// Append the base64 VLQ encoding of `value`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut v = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (v & 0b11111) as usize;
        v >>= 5;
        if v > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if v == 0 {
            break;
        }
    }
}
