//! Pixel to rem conversion.
//!
//! Rewrites `<number>px` in declaration values as rem. Selectors, at-rule
//! preludes, comments, quoted strings and `url(...)` are left alone.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Decimal places kept in converted values.
const PRECISION: i32 = 5;

fn value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i:url\([^)]*\))|"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|(?P<num>-?(?:\d+\.?\d*|\.\d+))px\b"#,
        )
        .expect("px value regex")
    })
}

/// Convert px to rem in every declaration of a style sheet.
pub fn px_to_rem(css: &str, base: f64) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut depth = 0usize;
    let mut parens = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = css[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 1);
            }
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b'{' if parens == 0 => {
                out.push_str(&css[start..=i]);
                start = i + 1;
                depth += 1;
            }
            delim @ (b';' | b'}') if parens == 0 => {
                let statement = &css[start..i];
                if depth > 0 {
                    out.push_str(&convert_declaration(statement, base));
                } else {
                    out.push_str(statement);
                }
                out.push(delim as char);
                start = i + 1;
                if delim == b'}' {
                    depth = depth.saturating_sub(1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    if start < css.len() {
        out.push_str(&css[start..]);
    }
    out
}

/// Convert the value part of one `property: value` statement.
fn convert_declaration(statement: &str, base: f64) -> String {
    if statement.trim_start().starts_with('@') {
        return statement.to_string();
    }
    let Some(colon) = statement.find(':') else {
        return statement.to_string();
    };
    let (property, value) = statement.split_at(colon + 1);
    format!("{}{}", property, convert_value(value, base))
}

/// Convert px lengths in a declaration value.
pub fn convert_value(value: &str, base: f64) -> String {
    value_regex()
        .replace_all(value, |caps: &Captures| {
            let whole = &caps[0];
            let Some(num) = caps.name("num") else {
                return whole.to_string();
            };
            let preceded_by_word = value[..num.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '#'));
            match num.as_str().parse::<f64>() {
                Ok(px) if !preceded_by_word => format_rem(px, base),
                _ => whole.to_string(),
            }
        })
        .into_owned()
}

/// Format `px / base` as a rem length; zero has no unit.
pub fn format_rem(px: f64, base: f64) -> String {
    let scale = 10f64.powi(PRECISION);
    let rem = (px / base * scale).round() / scale;
    if rem == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.*}", PRECISION as usize, rem);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{}rem", text)
}
