//! Async responsive image generation.
//!
//! [`VariantGenerator`] is the entry point the build pipeline awaits for every
//! `{% image %}` and `{% asset %}` shortcode. A request goes through three
//! gates before any pixel is touched:
//!
//! 1. the in-process [`VariantCache`], so a source referenced by several
//!    documents is generated once per build;
//! 2. a semaphore sized from `processing.max_processes`, bounding how many
//!    sources are decoded at the same time;
//! 3. the on-disk freshness check in [`create_variants`], so files from a
//!    previous build are reused.
//!
//! Decoding and encoding are CPU-bound and run on tokio's blocking pool; the
//! encodes of one source then fan out over rayon inside the backend.

use crate::cache::{CacheStats, VariantCache, VariantKey, hash_encoding_params, hash_file, variant_id};
use crate::config::ImagesConfig;
use crate::imaging::rust_backend::is_supported_source;
use crate::imaging::{
    BackendError, CreatedVariants, ImageAttributes, ImageBackend, OutputFormat, Quality, VariantSet, VariantSpec,
    create_variants, picture_markup,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("cannot process image {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("unsupported image type: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("image {} has several widths but no sizes attribute", path.display())]
    MissingSizes { path: PathBuf },
    #[error("image {} has no output formats", path.display())]
    NoFormats { path: PathBuf },
    #[error("{{% {shortcode} %}} is missing its {name} argument")]
    MissingArgument {
        shortcode: &'static str,
        name: &'static str,
    },
    #[error("image worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// Maps shortcode arguments to files on disk.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: PathBuf,
    asset_dir: PathBuf,
}

impl AssetResolver {
    pub fn new(root: impl Into<PathBuf>, asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            asset_dir: asset_dir.into(),
        }
    }

    /// Path of an `{% image %}` source. A leading `/` is relative to the
    /// project root, as are bare relative paths.
    pub fn image_path(&self, src: &str) -> PathBuf {
        self.root.join(src.trim_start_matches('/'))
    }

    /// Path of an `{% asset %}` name inside the asset directory.
    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.asset_dir.join(name.trim_start_matches('/'))
    }
}

/// Shared, concurrency-bounded image variant generator.
pub struct VariantGenerator {
    backend: Arc<dyn ImageBackend>,
    cache: VariantCache,
    limiter: Arc<Semaphore>,
    stats: Mutex<CacheStats>,
    resolver: AssetResolver,
    widths: Vec<u32>,
    formats: Vec<OutputFormat>,
    quality: Quality,
    output_dir: PathBuf,
    url_path: String,
    default_sizes: String,
}

impl VariantGenerator {
    /// `root` resolves `{% image %}` paths; `workers` bounds concurrent sources.
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        images: &ImagesConfig,
        root: &Path,
        workers: usize,
    ) -> Self {
        Self {
            backend,
            cache: VariantCache::new(),
            limiter: Arc::new(Semaphore::new(workers.max(1))),
            stats: Mutex::new(CacheStats::default()),
            resolver: AssetResolver::new(root, &images.asset_dir),
            widths: images.widths.clone(),
            formats: images.formats.clone(),
            quality: Quality::new(images.quality),
            output_dir: images.output_dir.clone(),
            url_path: images.url_path.clone(),
            default_sizes: images.default_sizes.clone(),
        }
    }

    /// Encoded and reused file counts so far.
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    /// Generate (or reuse) every variant of `source`.
    ///
    /// Identical concurrent requests share one generation. An empty
    /// `formats` list is an error.
    pub async fn variants(
        &self,
        source: &Path,
        widths: &[u32],
        formats: &[OutputFormat],
        output_dir: &Path,
    ) -> Result<Arc<VariantSet>> {
        if !is_supported_source(source) {
            return Err(ImageError::Unsupported(source.to_path_buf()));
        }
        if formats.is_empty() {
            return Err(ImageError::NoFormats {
                path: source.to_path_buf(),
            });
        }

        let key = VariantKey::new(source, widths, formats, output_dir);
        let limiter = Arc::clone(&self.limiter);
        let backend = Arc::clone(&self.backend);
        let stats = &self.stats;
        let source = source.to_path_buf();
        let spec = VariantSpec {
            widths: widths.to_vec(),
            formats: formats.to_vec(),
            quality: self.quality,
            output_dir: output_dir.to_path_buf(),
            url_path: self.url_path.clone(),
        };

        self.cache
            .get_or_try_init(key, || async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|e| ImageError::Worker(e.to_string()))?;

                let created = tokio::task::spawn_blocking(move || -> Result<CreatedVariants> {
                    let fail = |source_err: BackendError| ImageError::Source {
                        path: source.clone(),
                        source: source_err,
                    };
                    let source_hash = hash_file(&source).map_err(|e| fail(e.into()))?;
                    let id = variant_id(&source_hash, &hash_encoding_params(spec.quality));
                    create_variants(backend.as_ref(), &source, &id, &spec).map_err(fail)
                })
                .await
                .map_err(|e| ImageError::Worker(e.to_string()))??;

                debug!(
                    source = %created.set.source.display(),
                    encoded = created.encoded,
                    reused = created.reused,
                    "variants ready"
                );
                stats.lock().record(created.reused, created.encoded);
                Ok::<_, ImageError>(created.set)
            })
            .await
    }

    /// Generate variants of `source` and return their markup.
    ///
    /// `attrs.sizes` is required when more than one width survives validation.
    pub async fn generate_variants(
        &self,
        source: &Path,
        widths: &[u32],
        formats: &[OutputFormat],
        output_dir: &Path,
        attrs: &ImageAttributes,
    ) -> Result<String> {
        let set = self.variants(source, widths, formats, output_dir).await?;
        if set.width_count() > 1 && attrs.sizes.is_none() {
            return Err(ImageError::MissingSizes {
                path: source.to_path_buf(),
            });
        }
        picture_markup(&set, attrs).ok_or_else(|| ImageError::NoFormats {
            path: source.to_path_buf(),
        })
    }

    /// `{% image src, alt, sizes %}` with the configured widths and formats.
    pub async fn image(&self, src: &str, alt: &str, sizes: Option<&str>) -> Result<String> {
        let source = self.resolver.image_path(src);
        let attrs = ImageAttributes {
            alt: alt.to_string(),
            sizes: sizes.map(str::to_string),
        };
        self.generate_variants(&source, &self.widths, &self.formats, &self.output_dir, &attrs)
            .await
    }

    /// `{% asset name, alt, sizes %}`: looks `name` up in the asset directory
    /// and falls back to the configured default `sizes`.
    pub async fn asset(&self, name: &str, alt: &str, sizes: Option<&str>) -> Result<String> {
        let source = self.resolver.asset_path(name);
        let attrs = ImageAttributes {
            alt: alt.to_string(),
            sizes: Some(sizes.unwrap_or(&self.default_sizes).to_string()),
        };
        self.generate_variants(&source, &self.widths, &self.formats, &self.output_dir, &attrs)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        mock: Arc<MockBackend>,
        generator: VariantGenerator,
    }

    fn fixture(width: u32, height: u32) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("site/assets")).unwrap();
        fs::write(root.join("site/assets/harbor.jpg"), b"harbor").unwrap();
        fs::write(root.join("photo.jpg"), b"photo").unwrap();

        let images = ImagesConfig {
            output_dir: root.join("_site/img"),
            asset_dir: root.join("site/assets"),
            ..ImagesConfig::default()
        };
        let mock = Arc::new(MockBackend::with_dimensions(width, height));
        let backend: Arc<dyn ImageBackend> = mock.clone();
        let generator = VariantGenerator::new(backend, &images, &root, 2);
        Fixture {
            tmp,
            mock,
            generator,
        }
    }

    // =========================================================================
    // AssetResolver
    // =========================================================================

    #[test]
    fn resolver_paths() {
        let resolver = AssetResolver::new("/project", "/project/site/assets");
        assert_eq!(
            resolver.image_path("/img/a.jpg"),
            PathBuf::from("/project/img/a.jpg")
        );
        assert_eq!(
            resolver.image_path("img/a.jpg"),
            PathBuf::from("/project/img/a.jpg")
        );
        assert_eq!(
            resolver.asset_path("harbor.jpg"),
            PathBuf::from("/project/site/assets/harbor.jpg")
        );
    }

    // =========================================================================
    // Generation and caching
    // =========================================================================

    #[tokio::test]
    async fn asset_generates_nine_variants_and_picture() {
        let f = fixture(2000, 1333);
        let html = f.generator.asset("harbor.jpg", "Harbor", None).await.unwrap();

        assert_eq!(f.mock.encode_count(), 9);
        assert!(html.starts_with("<picture><source type=\"image/avif\""));
        assert!(html.contains("sizes=\"(min-width: 40ch) 90vw, (min-width: 65ch) 90vw, 100vw\""));
        assert!(html.contains(".jpeg 655w"));
        assert_eq!(f.generator.stats(), CacheStats { hits: 0, misses: 9 });
        assert_eq!(fs::read_dir(f.tmp.path().join("_site/img")).unwrap().count(), 9);
    }

    #[tokio::test]
    async fn repeated_request_reuses_in_process_result() {
        let f = fixture(2000, 1333);
        let first = f.generator.asset("harbor.jpg", "Harbor", None).await.unwrap();
        let second = f.generator.asset("harbor.jpg", "Harbor", None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.mock.encode_count(), 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_encode_once() {
        let f = fixture(2000, 1333);
        let (a, b) = tokio::join!(
            f.generator.asset("harbor.jpg", "Harbor", None),
            f.generator.asset("harbor.jpg", "Harbor", None),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(f.mock.encode_count(), 9);
    }

    #[tokio::test]
    async fn files_from_previous_build_are_reused() {
        let f = fixture(2000, 1333);
        f.generator.asset("harbor.jpg", "Harbor", None).await.unwrap();

        // A fresh generator has an empty in-process cache.
        let images = ImagesConfig {
            output_dir: f.tmp.path().join("_site/img"),
            asset_dir: f.tmp.path().join("site/assets"),
            ..ImagesConfig::default()
        };
        let mock = Arc::new(MockBackend::with_dimensions(2000, 1333));
        let backend: Arc<dyn ImageBackend> = mock.clone();
        let generator = VariantGenerator::new(backend, &images, f.tmp.path(), 2);
        generator.asset("harbor.jpg", "Harbor", None).await.unwrap();

        assert_eq!(mock.encode_count(), 0);
        assert_eq!(generator.stats(), CacheStats { hits: 9, misses: 0 });
    }

    #[tokio::test]
    async fn changed_source_gets_new_files() {
        let f = fixture(2000, 1333);
        f.generator.asset("harbor.jpg", "Harbor", None).await.unwrap();
        fs::write(f.tmp.path().join("site/assets/harbor.jpg"), b"edited").unwrap();

        let images = ImagesConfig {
            output_dir: f.tmp.path().join("_site/img"),
            asset_dir: f.tmp.path().join("site/assets"),
            ..ImagesConfig::default()
        };
        let mock = Arc::new(MockBackend::with_dimensions(2000, 1333));
        let backend: Arc<dyn ImageBackend> = mock.clone();
        let generator = VariantGenerator::new(backend, &images, f.tmp.path(), 2);
        generator.asset("harbor.jpg", "Harbor", None).await.unwrap();

        assert_eq!(mock.encode_count(), 9);
    }

    #[tokio::test]
    async fn small_source_is_never_upscaled() {
        let f = fixture(500, 400);
        let html = f.generator.image("/photo.jpg", "Small", None).await.unwrap();
        assert_eq!(f.mock.encode_count(), 3);
        assert!(html.contains("width=\"500\" height=\"400\""));
        assert!(html.contains("500w"));
        assert!(!html.contains("655w"));
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[tokio::test]
    async fn image_with_several_widths_requires_sizes() {
        let f = fixture(2000, 1333);
        let err = f.generator.image("/photo.jpg", "Photo", None).await.unwrap_err();
        assert!(matches!(err, ImageError::MissingSizes { .. }));
        assert!(err.to_string().contains("photo.jpg"));
    }

    #[tokio::test]
    async fn missing_source_names_the_path() {
        let f = fixture(2000, 1333);
        let err = f
            .generator
            .asset("missing.jpg", "Nope", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Source { .. }));
        assert!(err.to_string().contains("missing.jpg"));
        assert_eq!(f.mock.encode_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_extension_rejected() {
        let f = fixture(2000, 1333);
        let err = f.generator.asset("notes.txt", "", None).await.unwrap_err();
        assert!(matches!(err, ImageError::Unsupported(_)));
    }

    #[tokio::test]
    async fn empty_format_list_is_rejected() {
        let f = fixture(2000, 1333);
        let source = f.tmp.path().join("photo.jpg");
        let attrs = ImageAttributes {
            alt: "Photo".into(),
            sizes: None,
        };
        let err = f
            .generator
            .generate_variants(&source, &[655], &[], &f.tmp.path().join("_site/img"), &attrs)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::NoFormats { .. }));
        assert!(err.to_string().contains("photo.jpg"));
        assert_eq!(f.mock.encode_count(), 0);
    }

    #[tokio::test]
    async fn failed_generation_is_not_cached() {
        let f = fixture(2000, 1333);
        assert!(f.generator.asset("late.jpg", "", None).await.is_err());
        fs::write(f.tmp.path().join("site/assets/late.jpg"), b"late").unwrap();
        assert!(f.generator.asset("late.jpg", "", None).await.is_ok());
        assert_eq!(f.mock.encode_count(), 9);
    }
}
