//! CLI output formatting for the build, check and tags commands.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Each document leads
//! with its positional index and title; the source path, topic tags and
//! outline size follow as indented context lines. Documents without a title
//! show their source path in parentheses instead, since the path is then
//! their only identity.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Documents
//! 001 Hello Tokio
//!     Source: posts/hello-tokio.md
//!     Tags: rust, async
//!     Outline: 3 headings
//! 002 (notes/scratch.md)
//!     Source: notes/scratch.md
//!
//! Tags (2)
//!     async
//!     rust
//!
//! Images: 6 cached, 3 encoded (9 total)
//! Manifest: _site/manifest.json
//! ```
//!
//! ## Check
//!
//! ```text
//! Documents
//! 001 Hello Tokio
//!     Source: posts/hello-tokio.md
//!     Tags: rust, async
//!
//! Checked 1 document
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::BuildReport;
use crate::tags::TagIndex;
use crate::types::Document;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Header line of a document: titled documents show the title, untitled
/// ones show their source path in parens.
///
/// ```text
/// 001 Hello Tokio
/// 002 (notes/scratch.md)
/// ```
fn document_header(index: usize, title: Option<&str>, source: &str) -> String {
    match title {
        Some(t) if !t.trim().is_empty() => format!("{} {}", format_index(index), t.trim()),
        _ => format!("{} ({})", format_index(index), source),
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Source and tag context lines shared by build and check output.
fn context_lines(source: &str, tags: &[String]) -> Vec<String> {
    let mut lines = vec![format!("{}Source: {}", indent(1), source)];
    if !tags.is_empty() {
        lines.push(format!("{}Tags: {}", indent(1), tags.join(", ")));
    }
    lines
}

// ============================================================================
// Build
// ============================================================================

/// Format the result of a build.
pub fn format_build_output(report: &BuildReport, manifest_path: Option<&Path>) -> Vec<String> {
    let mut lines = vec!["Documents".to_string()];

    for (i, doc) in report.documents.iter().enumerate() {
        lines.push(document_header(i + 1, doc.data.title.as_deref(), &doc.source));
        lines.extend(context_lines(&doc.source, &doc.tags));
        if !doc.toc.is_empty() {
            lines.push(format!(
                "{}Outline: {}",
                indent(1),
                plural(doc.toc.entries.len(), "heading")
            ));
        }
    }

    lines.push(String::new());
    lines.extend(format_tag_index(&report.tags));

    lines.push(String::new());
    if report.images.total() > 0 {
        lines.push(format!("Images: {}", report.images));
    } else {
        lines.push("Images: none".to_string());
    }
    if let Some(path) = manifest_path {
        lines.push(format!("Manifest: {}", path.display()));
    }
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport, manifest_path: Option<&Path>) {
    for line in format_build_output(report, manifest_path) {
        println!("{}", line);
    }
}

// ============================================================================
// Tags
// ============================================================================

/// Format the site-wide tag index, one tag per line.
pub fn format_tag_index(index: &TagIndex) -> Vec<String> {
    let mut lines = vec![format!("Tags ({})", index.len())];
    lines.extend(index.iter().map(|tag| format!("{}{}", indent(1), tag)));
    lines
}

/// Print the tag index to stdout.
pub fn print_tag_index(index: &TagIndex) {
    for line in format_tag_index(index) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the documents found by a content check.
pub fn format_check_output(documents: &[Document]) -> Vec<String> {
    let mut lines = vec!["Documents".to_string()];
    for (i, doc) in documents.iter().enumerate() {
        lines.push(document_header(i + 1, doc.data.title.as_deref(), &doc.source));
        lines.extend(context_lines(&doc.source, &crate::tags::filter(&doc.data.tags)));
    }
    lines.push(String::new());
    lines.push(format!("Checked {}", plural(documents.len(), "document")));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(documents: &[Document]) {
    for line in format_check_output(documents) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
