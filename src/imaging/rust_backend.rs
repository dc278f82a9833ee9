//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Parallelism | `rayon` — one task per variant, source decoded once |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{OutputFormat, ResizeParams};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
///
/// AVIF is not an input format: the `image` crate's `"avif"` feature only
/// enables the encoder.
const SOURCE_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    SOURCE_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has an extension [`RustBackend`] can decode.
pub fn is_supported_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Temporary sibling path an encode is written to before being renamed.
fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output.with_file_name(name)
}

/// Encode `img` to `params.output` in the requested format.
///
/// The file is written under a temporary name and renamed into place, so a
/// crashed build never leaves a truncated file that later looks fresh.
fn save_image(img: &DynamicImage, params: &ResizeParams) -> Result<(), BackendError> {
    let partial = partial_path(&params.output);
    let result = encode_to(img, &partial, params.format, params.quality.value());
    if let Err(e) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }
    std::fs::rename(&partial, &params.output)?;
    Ok(())
}

fn encode_to(
    img: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: u32,
) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let quality = quality.min(100) as u8;
    let encoded = match format {
        // speed 6 for reasonable throughput
        OutputFormat::Avif => {
            to_rgb_or_rgba(img).write_with_encoder(AvifEncoder::new_with_speed_quality(writer, 6, quality))
        }
        // the pure Rust WebP encoder is lossless only
        OutputFormat::Webp => to_rgb_or_rgba(img).write_with_encoder(WebPEncoder::new_lossless(writer)),
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(writer, quality)),
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(writer)),
    };
    encoded.map_err(|e| {
        BackendError::ProcessingFailed(format!("{} encode failed: {}", format, e))
    })
}

/// Normalize to 8-bit RGB(A), the layouts every encoder here accepts.
fn to_rgb_or_rgba(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to read dimensions of {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, source: &Path, variants: &[ResizeParams]) -> Result<(), BackendError> {
        if variants.is_empty() {
            return Ok(());
        }
        let img = load_image(source)?;
        variants.par_iter().try_for_each(|params| {
            if params.width == img.width() && params.height == img.height() {
                save_image(&img, params)
            } else {
                let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
                save_image(&resized, params)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::create_test_jpeg;

    fn params(output: PathBuf, width: u32, height: u32, format: OutputFormat) -> ResizeParams {
        ResizeParams {
            output,
            width,
            height,
            format,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
        assert!(!exts.contains(&"avif"));
    }

    #[test]
    fn supported_source_check_ignores_case() {
        assert!(is_supported_source(Path::new("a/b.JPG")));
        assert!(!is_supported_source(Path::new("a/b.gif")));
        assert!(!is_supported_source(Path::new("a/b")));
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let backend = RustBackend::new();
        let dims = backend.identify(&path).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn resize_writes_every_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);

        let outputs = [
            (tmp.path().join("v-200.jpeg"), OutputFormat::Jpeg),
            (tmp.path().join("v-200.png"), OutputFormat::Png),
            (tmp.path().join("v-200.webp"), OutputFormat::Webp),
            (tmp.path().join("v-200.avif"), OutputFormat::Avif),
        ];
        let variants: Vec<ResizeParams> = outputs
            .iter()
            .map(|(path, format)| params(path.clone(), 200, 150, *format))
            .collect();

        RustBackend::new().resize(&source, &variants).unwrap();

        for (path, _) in &outputs {
            assert!(path.exists(), "missing {}", path.display());
            assert!(std::fs::metadata(path).unwrap().len() > 0);
            assert!(!partial_path(path).exists());
        }
        // AVIF can't be decoded back; check the others round-trip dimensions
        for (path, _) in &outputs[..3] {
            assert_eq!(image::image_dimensions(path).unwrap(), (200, 150));
        }
    }

    #[test]
    fn resize_at_source_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 120, 80);
        let output = tmp.path().join("full.png");

        RustBackend::new()
            .resize(&source, &[params(output.clone(), 120, 80, OutputFormat::Png)])
            .unwrap();
        assert_eq!(image::image_dimensions(&output).unwrap(), (120, 80));
    }

    #[test]
    fn resize_undecodable_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"not an image").unwrap();
        let output = tmp.path().join("out.png");

        let err = RustBackend::new()
            .resize(&source, &[params(output.clone(), 10, 10, OutputFormat::Png)])
            .unwrap_err();
        assert!(err.to_string().contains("broken.jpg"));
        assert!(!output.exists());
    }

    #[test]
    fn resize_with_no_variants_does_not_decode() {
        let backend = RustBackend::new();
        assert!(backend.resize(Path::new("/nonexistent.jpg"), &[]).is_ok());
    }
}
