//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and resize.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and
//! statically linked into the binary.

use super::params::ResizeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Backends are shared between blocking worker threads, hence `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode `source` once and write every requested variant.
    ///
    /// Each output must appear atomically: a file present at
    /// `ResizeParams::output` is a complete encode.
    fn resize(&self, source: &Path, variants: &[ResizeParams]) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{OutputFormat, Quality};
    use std::sync::Mutex;

    /// Mock backend that records operations without encoding anything.
    ///
    /// Resize writes an empty placeholder per output so on-disk freshness
    /// checks behave as they would after a real encode. Uses Mutex (not
    /// RefCell) so it is Sync and can be shared with worker threads.
    pub struct MockBackend {
        pub dimensions: Dimensions,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Resize {
            source: String,
            output: String,
            width: u32,
            height: u32,
            format: OutputFormat,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::with_dimensions(2000, 1333)
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: Dimensions { width, height },
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Number of variants encoded so far.
        pub fn encode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Resize { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            if !path.exists() {
                return Err(BackendError::ProcessingFailed(format!(
                    "No such image: {}",
                    path.display()
                )));
            }
            Ok(self.dimensions)
        }

        fn resize(&self, source: &Path, variants: &[ResizeParams]) -> Result<(), BackendError> {
            for params in variants {
                self.operations.lock().unwrap().push(RecordedOp::Resize {
                    source: source.to_string_lossy().to_string(),
                    output: params.output.to_string_lossy().to_string(),
                    width: params.width,
                    height: params.height,
                    format: params.format,
                    quality: params.quality.value(),
                });
                std::fs::write(&params.output, b"")?;
            }
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("image.jpg");
        std::fs::write(&path, b"x").unwrap();
        let backend = MockBackend::with_dimensions(800, 600);

        let result = backend.identify(&path).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p.ends_with("image.jpg")));
    }

    #[test]
    fn mock_identify_missing_file_errors() {
        let backend = MockBackend::new();
        assert!(backend.identify(Path::new("/nonexistent/a.jpg")).is_err());
    }

    #[test]
    fn mock_records_resize() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();

        backend
            .resize(
                Path::new("/source.jpg"),
                &[ResizeParams {
                    output: tmp.path().join("out-800.webp"),
                    width: 800,
                    height: 600,
                    format: OutputFormat::Webp,
                    quality: Quality::new(90),
                }],
            )
            .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Resize {
                width: 800,
                height: 600,
                format: OutputFormat::Webp,
                quality: 90,
                ..
            }
        ));
        assert!(tmp.path().join("out-800.webp").exists());
        assert_eq!(backend.encode_count(), 1);
    }
}
