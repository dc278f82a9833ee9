//! Shared types used across pipeline stages.
//!
//! Documents come out of [`scan`](crate::scan), are read (never mutated) by
//! the renderer and the tag aggregator, and are serialized into the build
//! manifest.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One Markdown source file.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Path relative to the content root, with `/` separators. Stable
    /// identity of the document across builds.
    pub source: String,
    /// Markdown body with the front matter block removed.
    #[serde(skip)]
    pub body: String,
    /// Parsed front matter.
    pub data: FrontMatter,
}

/// Front matter block of a document.
///
/// `tags` accepts either a list or a single scalar; missing or malformed
/// tags are an empty list. Any other key is kept in `extra` for the template
/// renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "string_or_seq")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "opt_scalar")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "opt_scalar")]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Tags as written: a list or a single scalar. Numbers and booleans are
/// stringified. Any other shape is not a tag list and yields no tags.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => Vec::new(),
        Some(serde_yaml::Value::Sequence(items)) => items
            .into_iter()
            .filter_map(|item| {
                let tag = scalar_string(&item);
                if tag.is_none() {
                    warn!(field = "tags", "ignoring non-scalar tag entry");
                }
                tag
            })
            .collect(),
        Some(other) => match scalar_string(&other) {
            Some(tag) => vec![tag],
            None => {
                warn!(field = "tags", "expected a list or a string, ignoring");
                Vec::new()
            }
        },
    })
}

fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Dates are kept as written. YAML may parse `2024-01-05` as a string but
/// a bare year as a number, so any scalar is accepted and stringified.
fn opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(serde_yaml::to_string(&other).unwrap_or_default().trim().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> FrontMatter {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn tags_as_list() {
        assert_eq!(parse("tags: [posts, rust]").tags, vec!["posts", "rust"]);
    }

    #[test]
    fn tags_as_scalar() {
        assert_eq!(parse("tags: rust").tags, vec!["rust"]);
    }

    #[test]
    fn missing_and_null_tags_are_empty() {
        assert!(parse("title: Hi").tags.is_empty());
        assert!(parse("tags:").tags.is_empty());
    }

    #[test]
    fn numeric_tags_are_stringified() {
        assert_eq!(parse("tags: 2024").tags, vec!["2024"]);
        assert_eq!(parse("tags: [rust, 2024, true]").tags, vec!["rust", "2024", "true"]);
    }

    #[test]
    fn malformed_tags_are_empty() {
        let fm = parse("title: Hi\ntags: {a: b}");
        assert!(fm.tags.is_empty());
        assert_eq!(fm.title.as_deref(), Some("Hi"));
    }

    #[test]
    fn nested_tag_entries_are_skipped() {
        assert_eq!(parse("tags: [rust, [a, b], {c: d}]").tags, vec!["rust"]);
    }

    #[test]
    fn date_kept_as_written() {
        assert_eq!(parse("date: 2024-01-05").date.as_deref(), Some("2024-01-05"));
        assert_eq!(parse("date: 2024").date.as_deref(), Some("2024"));
    }

    #[test]
    fn unknown_keys_go_to_extra() {
        let fm = parse("title: Post\nlayout: post.njk\ndraft: true");
        assert_eq!(fm.title.as_deref(), Some("Post"));
        assert_eq!(
            fm.extra.get("layout"),
            Some(&serde_yaml::Value::String("post.njk".into()))
        );
        assert_eq!(fm.extra.get("draft"), Some(&serde_yaml::Value::Bool(true)));
    }
}
