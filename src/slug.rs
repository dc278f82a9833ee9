//! Heading slug generation.
//!
//! Slugs are anchor targets, so they must be stable across builds: the same
//! visible heading text always produces the same slug. Only a small fixed set
//! of punctuation is removed; every other character (including non-Latin
//! letters and emoji) is kept as-is, lowercased. Whitespace runs collapse into
//! a single `-`.
//!
//! ```text
//! "Hello, World!"        → "hello-world"
//! "What's `new`: 2.0"    → "whats-new-2.0"
//! "Ünïcödé  Heading"     → "ünïcödé-heading"
//! ```
//!
//! Uniqueness within a document is handled by [`SlugRegistry`], which applies
//! the collision policy (`faq`, `faq-1`, `faq-2`, …).

use std::collections::HashSet;

/// Characters stripped from heading text before slugging.
const REMOVED_CHARS: &[char] = &[':', '\'', '\u{2018}', '\u{2019}', '`', ',', '!'];

/// Normalize heading text into a URL-safe anchor slug.
pub fn slugify(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !REMOVED_CHARS.contains(c)).collect();
    stripped
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Tracks slugs already handed out within one document.
///
/// The first occurrence of a slug keeps it unchanged. Later occurrences get
/// the lowest numeric suffix `-N` (starting at 1) that is not yet taken, so a
/// heading literally titled "FAQ 1" can't collide with a deduplicated "faq".
#[derive(Debug, Default)]
pub struct SlugRegistry {
    taken: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `base` and return the unique slug assigned to it.
    pub fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
