//! CSS post-processing backed by lightningcss.
//!
//! Browser targets come from browserslist queries. Prefixing and
//! minification both run lightningcss's minify pass, which adds the vendor
//! prefixes the targets need; they differ only in how the result is printed.

use crate::build::TaskError;
use lightningcss::media_query::MediaList;
use lightningcss::rules::media::MediaRule;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;

/// Resolve browserslist queries into lightningcss targets.
pub fn targets(queries: &[String]) -> Result<Targets, TaskError> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| css_error("targets", e))?;
    Ok(Targets { browsers, ..Targets::default() })
}

/// Add the vendor prefixes `targets` need, keeping readable output.
pub fn autoprefix(css: &str, targets: Targets) -> Result<String, TaskError> {
    process(css, "autoprefix", targets, false)
}

/// Minify a style sheet for `targets`.
pub fn minify(css: &str, targets: Targets) -> Result<String, TaskError> {
    process(css, "minify", targets, true)
}

fn process(css: &str, stage: &'static str, targets: Targets, compact: bool) -> Result<String, TaskError> {
    let mut sheet = parse(css, stage)?;
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| css_error(stage, e))?;
    print(&sheet, stage, targets, compact)
}

/// Merge `@media` rules with identical queries and move them after all
/// other rules, in order of first appearance.
pub fn group_media(css: &str) -> Result<String, TaskError> {
    const STAGE: &str = "group-media";

    let mut sheet = parse(css, STAGE)?;
    let rules = std::mem::take(&mut sheet.rules.0);
    let mut plain = Vec::with_capacity(rules.len());
    let mut groups: Vec<(String, MediaRule<'_>)> = Vec::new();

    for rule in rules {
        let CssRule::Media(media) = rule else {
            plain.push(rule);
            continue;
        };
        let key = media_key(&media.query)?;
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.rules.0.extend(media.rules.0),
            None => groups.push((key, media)),
        }
    }

    plain.extend(groups.into_iter().map(|(_, media)| CssRule::Media(media)));
    sheet.rules.0 = plain;
    print(&sheet, STAGE, Targets::default(), false)
}

fn media_key(query: &MediaList<'_>) -> Result<String, TaskError> {
    query.to_css_string(PrinterOptions::default()).map_err(|e| css_error("group-media", e))
}

fn parse<'i>(css: &'i str, stage: &'static str) -> Result<StyleSheet<'i>, TaskError> {
    StyleSheet::parse(css, ParserOptions::default()).map_err(|e| css_error(stage, e))
}

fn print(
    sheet: &StyleSheet<'_>,
    stage: &'static str,
    targets: Targets,
    minify: bool,
) -> Result<String, TaskError> {
    let printed = sheet
        .to_css(PrinterOptions { minify, targets, ..PrinterOptions::default() })
        .map_err(|e| css_error(stage, e))?;
    Ok(printed.code)
}

fn css_error(stage: &'static str, e: impl std::fmt::Display) -> TaskError {
    TaskError::Css { stage, message: e.to_string() }
}
