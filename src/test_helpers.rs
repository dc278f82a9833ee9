//! Shared test utilities for the postsmith test suite.
//!
//! Provides small builders for documents and a synthetic JPEG writer for
//! tests that need a real decodable image.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let doc = doc_with_tags("posts/intro.md", &["rust", "nav"]);
//! assert_eq!(doc.data.tags, vec!["rust", "nav"]);
//!
//! create_test_jpeg(&tmp.path().join("photo.jpg"), 200, 150);
//! ```

use crate::types::{Document, FrontMatter};
use image::{ImageEncoder, RgbImage};
use std::path::Path;

/// A document with an empty body and the given front matter tags.
pub fn doc_with_tags(source: &str, tags: &[&str]) -> Document {
    Document {
        source: source.to_string(),
        body: String::new(),
        data: FrontMatter {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..FrontMatter::default()
        },
    }
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}
