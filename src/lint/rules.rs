//! Rule checks and report formatting.
//!
//! Checks run over the raw text plus a "code" view of it in which comment
//! and string contents are blanked out, so a `#` or `!important` inside a
//! comment is never reported. Both views have the same byte offsets.

use crate::lint::config::{LintSettings, Rule, RuleSetting, Severity};
use regex::Regex;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::OnceLock;

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    /// Severity the rule was configured with
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Rule name
    pub rule: &'static str,
}

/// Violations found in one file.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Linted file (as shown in the report)
    pub path: PathBuf,
    /// Violations, sorted by position
    pub violations: Vec<Violation>,
}

impl FileReport {
    /// Number of error-severity violations.
    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.severity == Severity::Error).count()
    }

    /// Number of warning-severity violations.
    pub fn warning_count(&self) -> usize {
        self.violations.iter().filter(|v| v.severity == Severity::Warning).count()
    }
}

fn zero_unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[\s:,(])(0(?:\.0+)?(?:px|em|rem|ex|ch|vw|vh|vmin|vmax|cm|mm|in|pt|pc|q))\b")
            .expect("zero unit regex")
    })
}

/// Lint one file's text.
pub fn lint_source(source: &str, settings: &LintSettings) -> Vec<Violation> {
    let code = blank_comments_and_strings(source);
    let index = LineIndex::new(source);
    let mut violations = Vec::new();

    for (rule, setting) in settings.enabled() {
        let mut report = |offset: usize, message: String| {
            let (line, column) = index.position(offset);
            violations.push(Violation { line, column, severity: setting.severity, message, rule: rule.name() });
        };

        match rule {
            Rule::NoIds => check_no_ids(&code, &mut report),
            Rule::NoImportant => {
                for (offset, _) in code.match_indices("!important") {
                    report(offset, "!important not allowed".to_string());
                }
            }
            Rule::NoTrailingWhitespace => check_trailing_whitespace(source, &index, &mut report),
            Rule::FinalNewline => {
                if !source.is_empty() && !source.ends_with('\n') {
                    report(source.len(), "Files must end with a new line".to_string());
                }
            }
            Rule::Indentation => check_indentation(source, &code, &index, setting, &mut report),
            Rule::MaxLineLength => {
                let max = setting.usize_option("length", 80);
                for (n, line) in source.lines().enumerate() {
                    if line.chars().count() > max {
                        report(
                            index.line_start(n) + line.len(),
                            format!("line {} exceeds the maximum line length of {}", n + 1, max),
                        );
                    }
                }
            }
            Rule::NoCssComments => {
                for (offset, _) in comment_starts(source, &code) {
                    if !source[offset..].starts_with("/*!") {
                        report(offset, "Multiline style comments should not be used".to_string());
                    }
                }
            }
            Rule::NoEmptyRulesets => check_empty_rulesets(&code, &mut report),
            Rule::ZeroUnit => {
                for caps in zero_unit_regex().captures_iter(&code) {
                    if let Some(m) = caps.get(1) {
                        report(m.start(), "No unit allowed for values of 0".to_string());
                    }
                }
            }
        }
    }

    violations.sort_by(|a, b| (a.line, a.column, a.rule).cmp(&(b.line, b.column, b.rule)));
    violations
}

fn check_no_ids(code: &str, report: &mut impl FnMut(usize, String)) {
    let bytes = code.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => {
                // `#{` opens an interpolation, not a block
                if i > 0 && bytes[i - 1] == b'#' {
                    continue;
                }
                let prelude = &code[start..i];
                if !prelude.trim_start().starts_with('@') && !is_declaration_like(prelude) {
                    for (pos, _) in prelude.match_indices('#') {
                        let next = prelude.as_bytes().get(pos + 1).copied();
                        if next.is_some_and(|c| c.is_ascii_alphabetic() || c == b'_' || c == b'-') {
                            report(start + pos, "ID selectors not allowed".to_string());
                        }
                    }
                }
                start = i + 1;
            }
            b'}' | b';' => start = i + 1,
            _ => {}
        }
    }
}

/// `font: { family: x; }` style nested properties end in a colon.
fn is_declaration_like(prelude: &str) -> bool {
    prelude.trim_end().ends_with(':')
}

fn check_trailing_whitespace(source: &str, index: &LineIndex, report: &mut impl FnMut(usize, String)) {
    for (n, line) in source.lines().enumerate() {
        let trimmed = line.trim_end_matches([' ', '\t', '\r']);
        if trimmed.len() < line.trim_end_matches('\r').len() {
            report(index.line_start(n) + trimmed.len(), "Whitespace not allowed at end of line".to_string());
        }
    }
}

fn check_indentation(
    source: &str,
    code: &str,
    index: &LineIndex,
    setting: &RuleSetting,
    report: &mut impl FnMut(usize, String),
) {
    let size = setting.usize_option("size", 2);
    let mut depth: usize = 0;
    let mut continuation = false;

    for (n, code_line) in code.split('\n').enumerate() {
        let content = code_line.trim();
        if content.is_empty() {
            continue;
        }

        let line_depth = if content.starts_with('}') { depth.saturating_sub(1) } else { depth };
        if !continuation {
            let raw = source[index.line_start(n)..].split('\n').next().unwrap_or("");
            let indent: &str = &raw[..raw.len() - raw.trim_start().len()];
            let expected = line_depth * size;
            if indent.contains('\t') {
                report(index.line_start(n), "Mixed tabs and spaces".to_string());
            } else if indent.len() != expected {
                report(
                    index.line_start(n) + indent.len(),
                    format!("Expected indentation of {} spaces but found {}.", expected, indent.len()),
                );
            }
        }

        for b in content.bytes() {
            match b {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        continuation = !(content.ends_with('{') || content.ends_with('}') || content.ends_with(';'));
    }
}

fn check_empty_rulesets(code: &str, report: &mut impl FnMut(usize, String)) {
    let bytes = code.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'{' || (i > 0 && bytes[i - 1] == b'#') {
            continue;
        }
        let rest = &code[i + 1..];
        if rest.trim_start().starts_with('}') {
            let selector_start = code[..i].rfind(['{', '}', ';']).map_or(0, |p| p + 1);
            let leading = code[selector_start..i].len() - code[selector_start..i].trim_start().len();
            report(selector_start + leading, "No empty rulesets allowed".to_string());
        }
    }
}

/// Offsets of `/*` comment openings (and their lengths).
fn comment_starts<'a>(source: &'a str, code: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
    source.match_indices("/*").filter_map(move |(offset, _)| {
        // the opening itself survives blanking only where it is real code
        code[offset..].starts_with("/*").then_some((offset, 2))
    })
}

/// Replace comment bodies and string contents with spaces, keeping
/// newlines and byte offsets intact.
pub fn blank_comments_and_strings(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    let blank = |out: &mut Vec<u8>, from: usize, to: usize| {
        for b in &mut out[from..to] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                blank(&mut out, i + 2, end.saturating_sub(2).max(i + 2));
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = source[i..].find('\n').map_or(bytes.len(), |p| i + p);
                blank(&mut out, i, end);
                i = end;
            }
            quote @ (b'"' | b'\'') => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != quote && bytes[j] != b'\n' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
                let end = j.min(bytes.len());
                blank(&mut out, i + 1, end);
                i = end + 1;
            }
            _ => i += 1,
        }
    }

    // Whole characters were replaced, each byte with an ASCII space.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Maps byte offsets to line and column.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_start(&self, line: usize) -> usize {
        self.starts.get(line).copied().unwrap_or(0)
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        (line + 1, offset - self.starts[line] + 1)
    }
}

/// Format reports the way the stylish formatter does.
///
/// Files without violations are omitted; an empty string means a clean run.
pub fn format_stylish(reports: &[FileReport]) -> String {
    let mut out = String::new();
    let (mut errors, mut warnings) = (0, 0);

    for report in reports.iter().filter(|r| !r.violations.is_empty()) {
        let _ = writeln!(out, "\n{}", report.path.display());
        for v in &report.violations {
            let position = format!("{}:{}", v.line, v.column);
            let _ = writeln!(out, "  {:<7}  {:<7}  {}  {}", position, v.severity, v.message, v.rule);
        }
        errors += report.error_count();
        warnings += report.warning_count();
    }

    let total = errors + warnings;
    if total > 0 {
        let _ = writeln!(
            out,
            "\n\u{2716} {} problem{} ({} error{}, {} warning{})",
            total,
            if total == 1 { "" } else { "s" },
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
    }
    out
}
