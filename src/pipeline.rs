//! Build pipeline: scanned documents in, rendered documents and tag index out.
//!
//! Each document goes through the same stages:
//!
//! ```text
//! body ─→ {% image %} / {% asset %} ─→ {% callout %} ─→ Markdown ─→ html + toc
//!          (awaited, shared cache)      (pure)          (pure)
//! ```
//!
//! Documents render concurrently as tokio tasks. Image generation is the only
//! stage that suspends; the variant cache makes sure two documents embedding
//! the same image wait on one generation. Tags are aggregated once, after all
//! documents are done.
//!
//! Shortcodes other than `image`, `asset` and `callout` are left in place for
//! the template renderer.

use crate::cache::CacheStats;
use crate::callout;
use crate::markdown::{MarkdownRenderer, TableOfContents};
use crate::shortcode::{self, Shortcode};
use crate::tags::{self, TagIndex};
use crate::types::{Document, FrontMatter};
use crate::variants::{ImageError, VariantGenerator};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// File name of the manifest written by [`write_manifest`].
pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{path}: {source}")]
    Document {
        path: String,
        #[source]
        source: ImageError,
    },
    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One document after rendering.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedDocument {
    pub source: String,
    pub data: FrontMatter,
    pub html: String,
    pub toc: TableOfContents,
    /// Topic tags: reserved tags and duplicates removed.
    pub tags: Vec<String>,
}

/// Everything a build produced.
#[derive(Debug)]
pub struct BuildReport {
    /// Rendered documents, in the order they were given.
    pub documents: Vec<RenderedDocument>,
    pub tags: TagIndex,
    /// Image files encoded and reused during this build.
    pub images: CacheStats,
}

#[derive(Serialize)]
struct Manifest<'a> {
    documents: &'a [RenderedDocument],
    tags: &'a TagIndex,
}

/// Renders documents against a shared image generator.
#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<VariantGenerator>,
    renderer: Arc<MarkdownRenderer>,
}

impl Pipeline {
    pub fn new(generator: Arc<VariantGenerator>) -> Self {
        Self::with_renderer(generator, MarkdownRenderer::new())
    }

    pub fn with_renderer(generator: Arc<VariantGenerator>, renderer: MarkdownRenderer) -> Self {
        Self {
            generator,
            renderer: Arc::new(renderer),
        }
    }

    /// Render every document and aggregate the tag index.
    ///
    /// All documents run to completion; if any failed, the first failure in
    /// document order is returned.
    pub async fn build(&self, documents: Vec<Document>) -> Result<BuildReport, BuildError> {
        let tags = tags::aggregate(&documents);
        let count = documents.len();

        let mut tasks = JoinSet::new();
        for (index, document) in documents.into_iter().enumerate() {
            let pipeline = self.clone();
            tasks.spawn(async move { (index, pipeline.render_document(&document).await) });
        }

        let mut results: Vec<Option<Result<RenderedDocument, BuildError>>> =
            (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined?;
            results[index] = Some(result);
        }

        let documents = results
            .into_iter()
            .flatten()
            .collect::<Result<Vec<_>, _>>()?;
        let images = self.generator.stats();
        info!(documents = documents.len(), tags = tags.len(), %images, "build finished");

        Ok(BuildReport {
            documents,
            tags,
            images,
        })
    }

    /// Render one document.
    pub async fn render_document(&self, document: &Document) -> Result<RenderedDocument, BuildError> {
        debug!(source = %document.source, "rendering");
        let with_images = self
            .expand_images(&document.body)
            .await
            .map_err(|source| BuildError::Document {
                path: document.source.clone(),
                source,
            })?;
        let with_callouts = callout::expand_callouts(&with_images);
        let rendered = self.renderer.render(&with_callouts);

        Ok(RenderedDocument {
            source: document.source.clone(),
            data: document.data.clone(),
            toc: rendered.toc(),
            html: rendered.html,
            tags: tags::filter(&document.data.tags),
        })
    }

    async fn expand_images(&self, body: &str) -> Result<String, ImageError> {
        let mut replacements = Vec::new();
        for code in shortcode::scan(body) {
            let html = match code.name.as_str() {
                "image" => {
                    let (src, alt) = required_args(&code, "image", "src")?;
                    self.generator.image(src, alt, code.arg(2)).await?
                }
                "asset" => {
                    let (name, alt) = required_args(&code, "asset", "name")?;
                    self.generator.asset(name, alt, code.arg(2)).await?
                }
                _ => continue,
            };
            replacements.push((code.span, html));
        }
        Ok(shortcode::replace(body, &replacements))
    }
}

fn required_args<'a>(
    code: &'a Shortcode,
    shortcode: &'static str,
    first: &'static str,
) -> Result<(&'a str, &'a str), ImageError> {
    let missing = |name| ImageError::MissingArgument { shortcode, name };
    let path = code.arg(0).ok_or_else(|| missing(first))?;
    let alt = code.arg(1).ok_or_else(|| missing("alt"))?;
    Ok((path, alt))
}

/// Write the build manifest as pretty JSON into `output_dir`.
pub fn write_manifest(report: &BuildReport, output_dir: &Path) -> Result<PathBuf, BuildError> {
    std::fs::create_dir_all(output_dir)?;
    let manifest = Manifest {
        documents: &report.documents,
        tags: &report.tags,
    };
    let path = output_dir.join(MANIFEST_FILENAME);
    std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(path)
}
