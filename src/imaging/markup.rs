//! `<picture>` / `<img>` markup for a generated variant set.
//!
//! ```html
//! <picture>
//!   <source type="image/avif" srcset="/img/id-655.avif 655w, /img/id-1310.avif 1310w" sizes="…">
//!   <source type="image/webp" srcset="…" sizes="…">
//!   <img src="/img/id-655.jpeg" width="1310" height="873" srcset="…" sizes="…"
//!        alt="…" loading="lazy" decoding="async">
//! </picture>
//! ```
//!
//! The markup is emitted on a single line so it can sit inside a Markdown
//! paragraph without being split by the renderer. A request for one format
//! produces only the `<img>`.

use super::operations::{ImageVariant, VariantSet};
use super::params::OutputFormat;
use maud::{Markup, html};

/// Attributes supplied by the author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAttributes {
    pub alt: String,
    pub sizes: Option<String>,
}

/// Render the markup for `set`, or `None` when the set holds no variants.
pub fn picture_markup(set: &VariantSet, attrs: &ImageAttributes) -> Option<String> {
    let fallback = set.fallback_format()?;
    let fallback_variants: Vec<&ImageVariant> = set.of_format(fallback).collect();
    let (smallest, largest) = (fallback_variants.first()?, fallback_variants.last()?);
    let multiple_widths = fallback_variants.len() > 1;
    let img_srcset = multiple_widths.then(|| srcset(&fallback_variants));

    let img = html! {
        img src=(smallest.url)
            width=(largest.width)
            height=(largest.height)
            srcset=[img_srcset]
            sizes=[attrs.sizes.as_deref()]
            alt=(attrs.alt)
            loading="lazy"
            decoding="async";
    };

    let sources: Vec<(OutputFormat, String)> = set
        .formats()
        .into_iter()
        .filter(|f| *f != fallback)
        .map(|f| (f, srcset(&set.of_format(f).collect::<Vec<_>>())))
        .collect();
    if sources.is_empty() {
        return Some(img.into_string());
    }

    let markup: Markup = html! {
        picture {
            @for (format, source_srcset) in &sources {
                source type=(format.mime_type())
                    srcset=(source_srcset)
                    sizes=[attrs.sizes.as_deref()];
            }
            (img)
        }
    };
    Some(markup.into_string())
}

fn srcset(variants: &[&ImageVariant]) -> String {
    variants
        .iter()
        .map(|v| format!("{} {}w", v.url, v.width))
        .collect::<Vec<_>>()
        .join(", ")
}
