//! Site-wide tag index.
//!
//! Some tags describe site structure instead of content: `all`, `nav` and
//! `posts` put documents into collections and menus. They are never shown as
//! topics, neither in a post's tag list nor in the site tag index, and both
//! places use [`is_reserved`] to decide.
//!
//! The index is rebuilt from the documents on every build; nothing carries
//! over between builds.

use crate::types::Document;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Structural tags excluded from every tag listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedTag {
    All,
    Nav,
    Posts,
}

impl ReservedTag {
    pub const ALL: [ReservedTag; 3] = [Self::All, Self::Nav, Self::Posts];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Nav => "nav",
            Self::Posts => "posts",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == tag)
    }
}

/// Whether `tag` is structural rather than a topic.
pub fn is_reserved(tag: &str) -> bool {
    ReservedTag::from_tag(tag).is_some()
}

/// A document's displayable tags: reserved tags and repeats removed, first
/// occurrence order kept.
pub fn filter(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter(|tag| !is_reserved(tag))
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

/// Every topic tag used anywhere on the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagIndex(BTreeSet<String>);

impl TagIndex {
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Build the tag index for a set of documents.
pub fn aggregate(documents: &[Document]) -> TagIndex {
    TagIndex(
        documents
            .iter()
            .flat_map(|doc| filter(&doc.data.tags))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::doc_with_tags;

    fn strings(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn reserved_set() {
        assert!(is_reserved("all"));
        assert!(is_reserved("nav"));
        assert!(is_reserved("posts"));
        assert!(!is_reserved("rust"));
        assert!(!is_reserved("Posts"));
        assert_eq!(ReservedTag::from_tag("nav"), Some(ReservedTag::Nav));
    }

    #[test]
    fn filter_document_tags() {
        assert_eq!(filter(&strings(&["posts", "rust", "nav", "rust"])), vec!["rust"]);
    }

    #[test]
    fn filter_keeps_first_occurrence_order() {
        assert_eq!(
            filter(&strings(&["web", "all", "go", "web", "rust"])),
            vec!["web", "go", "rust"]
        );
    }

    #[test]
    fn filter_is_idempotent() {
        let once = filter(&strings(&["all", "a", "b", "a", "nav", "posts", "c"]));
        assert_eq!(filter(&once), once);
    }

    #[test]
    fn filter_empty() {
        assert!(filter(&[]).is_empty());
    }

    #[test]
    fn aggregate_two_documents() {
        let index = aggregate(&[doc_with_tags("a.md", &["rust"]), doc_with_tags("b.md", &["go", "rust"])]);
        assert_eq!(index.len(), 2);
        assert!(index.contains("rust"));
        assert!(index.contains("go"));
    }

    #[test]
    fn aggregate_excludes_reserved() {
        let index = aggregate(&[
            doc_with_tags("a.md", &["all", "posts", "nav"]),
            doc_with_tags("b.md", &["nav", "rust"]),
        ]);
        for reserved in ReservedTag::ALL {
            assert!(!index.contains(reserved.as_str()));
        }
        assert_eq!(index.iter().collect::<Vec<_>>(), vec!["rust"]);
    }

    #[test]
    fn aggregate_is_order_independent() {
        let a = doc_with_tags("a.md", &["x", "y"]);
        let b = doc_with_tags("b.md", &["z", "x"]);
        assert_eq!(aggregate(&[a.clone(), b.clone()]), aggregate(&[b, a]));
    }

    #[test]
    fn aggregate_tolerates_untagged_documents() {
        let index = aggregate(&[doc_with_tags("a.md", &[]), doc_with_tags("b.md", &["go"])]);
        assert_eq!(index.iter().collect::<Vec<_>>(), vec!["go"]);
        assert!(aggregate(&[]).is_empty());
    }
}
