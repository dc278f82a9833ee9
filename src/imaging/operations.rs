//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take a
//! source image and a [`VariantSpec`], decide which files should exist, and
//! ask the backend for the ones that don't.
//!
//! Output files are named `{id}-{width}.{ext}`, where `id` is derived from the
//! source contents and encoding settings (see [`crate::cache::variant_id`]).
//! A file already present under that name is up to date by construction.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{VariantSize, calculate_variant_sizes};
use super::params::{OutputFormat, Quality, ResizeParams};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// What to generate for one source image.
#[derive(Debug, Clone)]
pub struct VariantSpec {
    pub widths: Vec<u32>,
    /// Requested formats. Order and duplicates don't matter.
    pub formats: Vec<OutputFormat>,
    pub quality: Quality,
    pub output_dir: PathBuf,
    /// Public URL prefix of `output_dir`, e.g. `/img/`.
    pub url_path: String,
}

/// One generated (width, format) rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageVariant {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub path: PathBuf,
    pub url: String,
}

/// Every variant generated for one request.
///
/// Variants are grouped by format (most capable first) and ascending by width
/// within each format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSet {
    pub source: PathBuf,
    pub variants: Vec<ImageVariant>,
}

impl VariantSet {
    /// Formats present, most capable first.
    pub fn formats(&self) -> Vec<OutputFormat> {
        let mut formats: Vec<OutputFormat> = self.variants.iter().map(|v| v.format).collect();
        formats.dedup();
        formats
    }

    /// Variants of one format, ascending by width.
    pub fn of_format(&self, format: OutputFormat) -> impl Iterator<Item = &ImageVariant> {
        self.variants.iter().filter(move |v| v.format == format)
    }

    /// Least capable format: the `<img>` fallback.
    pub fn fallback_format(&self) -> Option<OutputFormat> {
        self.variants.iter().map(|v| v.format).max()
    }

    /// Number of distinct widths per format.
    pub fn width_count(&self) -> usize {
        self.fallback_format()
            .map_or(0, |format| self.of_format(format).count())
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Outcome of [`create_variants`].
#[derive(Debug)]
pub struct CreatedVariants {
    pub set: VariantSet,
    /// Variants encoded by this call.
    pub encoded: u32,
    /// Variants already on disk.
    pub reused: u32,
}

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &dyn ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// Plan the variant set for a source of known dimensions without touching disk.
pub fn plan_variants(source: &Path, dims: Dimensions, id: &str, spec: &VariantSpec) -> VariantSet {
    let mut formats = spec.formats.clone();
    formats.sort();
    formats.dedup();

    let sizes = calculate_variant_sizes((dims.width, dims.height), &spec.widths);
    let variants = formats
        .iter()
        .flat_map(|&format| {
            sizes.iter().map(move |&VariantSize { width, height }| {
                let file_name = format!("{}-{}.{}", id, width, format.extension());
                ImageVariant {
                    format,
                    width,
                    height,
                    path: spec.output_dir.join(&file_name),
                    url: join_url(&spec.url_path, &file_name),
                }
            })
        })
        .collect();

    VariantSet {
        source: source.to_path_buf(),
        variants,
    }
}

/// Create every variant of `source` that isn't already on disk.
///
/// Missing variants are encoded in a single backend call so the source is
/// decoded once.
pub fn create_variants(
    backend: &dyn ImageBackend,
    source: &Path,
    id: &str,
    spec: &VariantSpec,
) -> Result<CreatedVariants> {
    let dims = get_dimensions(backend, source)?;
    let set = plan_variants(source, dims, id, spec);

    let missing: Vec<ResizeParams> = set
        .variants
        .iter()
        .filter(|v| !v.path.exists())
        .map(|v| ResizeParams {
            output: v.path.clone(),
            width: v.width,
            height: v.height,
            format: v.format,
            quality: spec.quality,
        })
        .collect();

    let encoded = missing.len() as u32;
    let reused = set.len() as u32 - encoded;
    if !missing.is_empty() {
        std::fs::create_dir_all(&spec.output_dir)?;
        backend.resize(source, &missing)?;
    }

    Ok(CreatedVariants {
        set,
        encoded,
        reused,
    })
}

fn join_url(prefix: &str, file_name: &str) -> String {
    if prefix.ends_with('/') {
        format!("{prefix}{file_name}")
    } else {
        format!("{prefix}/{file_name}")
    }
}
