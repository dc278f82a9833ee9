//! Shortcode tag scanning.
//!
//! Document bodies embed template tags in the `{% name arg, arg %}` form:
//!
//! ```text
//! {% image "photos/harbor.jpg", "Harbor at dusk" %}
//! {% asset "diagram.png", "Build graph", "100vw" %}
//! {% callout "warn", "md" %}Back up **first**.{% endcallout %}
//! ```
//!
//! This module only finds tags and splits their arguments. What a tag expands
//! to is decided by the caller ([`crate::callout`] for paired callouts, the
//! build pipeline for images). Tags nobody handles are left in place.
//!
//! `{%-` and `-%}` strip the whitespace before or after the tag when it is
//! replaced.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%(-?)\s*([A-Za-z_][A-Za-z0-9_]*)\s*(.*?)\s*(-?)%\}")
        .expect("shortcode pattern is valid")
});

/// One `{% … %}` tag found in a document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcode {
    pub name: String,
    pub args: Vec<String>,
    /// Byte range to replace, widened over whitespace consumed by `{%-`/`-%}`.
    pub span: Range<usize>,
}

impl Shortcode {
    /// Positional argument `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// All tags in `source`, in document order.
pub fn scan(source: &str) -> Vec<Shortcode> {
    TAG.captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let mut start = whole.start();
            let mut end = whole.end();
            if !caps[1].is_empty() {
                start = source[..start].trim_end().len();
            }
            if !caps[4].is_empty() {
                end = source.len() - source[end..].trim_start().len();
            }
            Some(Shortcode {
                name: caps[2].to_string(),
                args: parse_args(&caps[3]),
                span: start..end,
            })
        })
        .collect()
}

/// Split a tag's argument list.
///
/// Arguments are separated by commas and/or whitespace. Quoted arguments
/// (`"…"` or `'…'`) may contain separators and `\`-escaped quotes; bare
/// arguments run to the next separator.
pub fn parse_args(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == ',' || c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut arg = String::new();
        if c == '"' || c == '\'' {
            chars.next();
            while let Some(ch) = chars.next() {
                match ch {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            arg.push(escaped);
                        }
                    }
                    _ if ch == c => break,
                    _ => arg.push(ch),
                }
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch == ',' || ch.is_whitespace() {
                    break;
                }
                arg.push(ch);
                chars.next();
            }
        }
        args.push(arg);
    }
    args
}

/// Apply replacements to `source`.
///
/// Ranges must be in ascending order and not overlap; overlapping entries
/// after the first are skipped.
pub fn replace(source: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, text) in replacements {
        if range.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..range.start]);
        out.push_str(text);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
