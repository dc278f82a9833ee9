//! # Postsmith
//!
//! The content half of a static blog: Markdown documents in, rendered HTML
//! fragments, responsive images and a tag index out. Page layout belongs to
//! an external template renderer, which reads the JSON manifest this crate
//! writes.
//!
//! # Architecture: Scan, Build, Manifest
//!
//! ```text
//! 1. Scan      content/**/*.md  →  [Document]         (front matter + body)
//! 2. Build     [Document]       →  BuildReport        (html, toc, tags, images)
//! 3. Manifest  BuildReport      →  _site/manifest.json
//! ```
//!
//! Within a build every document is rendered independently:
//!
//! ```text
//! {% image %} / {% asset %}  →  <picture> markup   (async, cached, bounded)
//! {% callout %}…{% endcallout %}  →  styled <div>   (pure)
//! Markdown  →  HTML with heading anchors + table of contents   (pure)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the content directory and splits YAML front matter from bodies |
//! | [`types`] | `Document` and `FrontMatter`, shared by every stage |
//! | [`slug`] | URL fragment slugs and per-document uniqueness |
//! | [`markdown`] | pulldown-cmark rendering: anchors, `[[toc]]`, inline mode |
//! | [`shortcode`] | Finds `{% name args %}` tags and splits their arguments |
//! | [`callout`] | Expands `{% callout %}` blocks into styled notices |
//! | [`imaging`] | Pure-Rust resize/encode backend and `<picture>` markup |
//! | [`cache`] | Content-addressed variant names and the in-process single-flight cache |
//! | [`variants`] | Async, concurrency-bounded image generation for shortcodes |
//! | [`tags`] | Reserved-tag filtering and the site-wide tag index |
//! | [`pipeline`] | Concurrent per-document build and manifest writing |
//! | [`config`] | `config.toml` loading, validation and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Image Files
//!
//! Variant files are named after a hash of the source bytes and encoding
//! settings. A file that exists under its name is current, so a rebuild only
//! encodes what changed, and a `git checkout` that resets modification times
//! does not trigger a full re-encode. See [`cache`].
//!
//! ## Async Only Where It Waits
//!
//! Markdown rendering, callouts and tag aggregation are plain synchronous
//! functions. Image generation is the one operation a document has to wait
//! for, so it is the only async API. CPU-heavy work runs on tokio's blocking
//! pool and fans out over rayon; a semaphore keeps the number of images
//! decoded at once within `processing.max_processes`.
//!
//! ## Maud Over String Templates
//!
//! Callouts, `<picture>` elements, heading anchors and the table of contents
//! are built with [Maud](https://maud.lambda.xyz/). Interpolated values such
//! as `alt` text are escaped by construction.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! resampling and AVIF/WebP/JPEG/PNG encoding. No system libraries, no
//! external processes.

pub mod cache;
pub mod callout;
pub mod config;
pub mod imaging;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod shortcode;
pub mod slug;
pub mod tags;
pub mod types;
pub mod variants;

#[cfg(test)]
pub(crate) mod test_helpers;
