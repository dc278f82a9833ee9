//! Table-of-contents rendering.
//!
//! Headings arrive as a flat, document-ordered list. They are folded into a
//! tree (a heading nests under the closest preceding heading of a shallower
//! level) and rendered as nested `<ul>` lists:
//!
//! ```html
//! <div class="table-of-contents">
//!   <ul>
//!     <li><a href="#intro">Intro</a>
//!       <ul><li><a href="#setup">Setup</a></li></ul>
//!     </li>
//!   </ul>
//! </div>
//! ```

use super::Heading;
use maud::{Markup, html};

/// Heading levels listed in the table of contents.
pub const TOC_LEVELS: std::ops::RangeInclusive<u8> = 1..=3;

/// Ordered outline of a document's top-level headings.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableOfContents {
    pub entries: Vec<Heading>,
}

impl TableOfContents {
    /// Keep only the headings that belong in the outline, in document order.
    pub fn from_headings(headings: &[Heading]) -> Self {
        Self {
            entries: headings
                .iter()
                .filter(|h| TOC_LEVELS.contains(&h.level))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the outline as nested lists.
    pub fn to_html(&self) -> String {
        let tree = build_tree(&self.entries);
        html! {
            div.table-of-contents {
                (render_nodes(&tree))
            }
        }
        .into_string()
    }
}

struct TocNode<'a> {
    heading: &'a Heading,
    children: Vec<TocNode<'a>>,
}

fn build_tree(entries: &[Heading]) -> Vec<TocNode<'_>> {
    let mut roots = Vec::new();
    for heading in entries {
        insert(&mut roots, heading);
    }
    roots
}

fn insert<'a>(nodes: &mut Vec<TocNode<'a>>, heading: &'a Heading) {
    if let Some(last) = nodes.last_mut()
        && heading.level > last.heading.level
    {
        insert(&mut last.children, heading);
        return;
    }
    nodes.push(TocNode {
        heading,
        children: Vec::new(),
    });
}

fn render_nodes(nodes: &[TocNode<'_>]) -> Markup {
    html! {
        ul {
            @for node in nodes {
                li {
                    a href=(format!("#{}", node.heading.slug)) { (node.heading.text) }
                    @if !node.children.is_empty() {
                        (render_nodes(&node.children))
                    }
                }
            }
        }
    }
}
