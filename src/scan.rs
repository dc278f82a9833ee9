//! Content directory scanning.
//!
//! Stage 1 of the build. Walks the content root for Markdown files and splits
//! each into its YAML front matter and body:
//!
//! ```text
//! content/
//! ├── about.md
//! ├── posts/
//! │   ├── 2024-01-05-hello.md
//! │   └── 2024-02-11-tags.md
//! └── .drafts/            # hidden: skipped
//!     └── wip.md
//! ```
//!
//! A front matter block is optional and must be the first thing in the file:
//!
//! ```text
//! ---
//! title: Hello
//! tags: [posts, rust]
//! ---
//! # Body starts here
//! ```
//!
//! Documents are returned sorted by path so builds are reproducible.

use crate::types::{Document, FrontMatter};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)(.*)\z")
        .expect("front matter pattern is valid")
});

/// Find and parse every Markdown document under `root`.
pub fn scan(root: &Path) -> Result<Vec<Document>, ScanError> {
    let mut documents = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }
        let path = entry.path();
        let raw = fs::read_to_string(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (data, body) = split_front_matter(&raw).map_err(|source| ScanError::FrontMatter {
            path: path.to_path_buf(),
            source,
        })?;
        documents.push(Document {
            source: relative_source(root, path),
            body,
            data,
        });
    }

    documents.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(documents)
}

/// Split a file into front matter and body.
///
/// Files without a leading `---` block get empty front matter and keep their
/// full content as body.
pub fn split_front_matter(content: &str) -> Result<(FrontMatter, String), serde_yaml::Error> {
    let Some(caps) = FRONT_MATTER.captures(content) else {
        return Ok((FrontMatter::default(), content.to_string()));
    };
    let yaml = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str());

    let data = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    Ok((data, body.to_string()))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

fn relative_source(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
