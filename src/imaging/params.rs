//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`operations`](super::operations) module (which
//! decides which variants to create) and the [`backend`](super::backend)
//! (which does the pixel work), so tests can swap in a mock backend.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`] — Encoded file format of a variant.
//! - [`ResizeParams`] — One variant to write: output path, target dimensions, format, quality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Encoded file format of an image variant.
///
/// Variants are ordered by browser capability, most capable first. That is
/// the order `<source>` elements are listed in, and the last requested
/// format is the `<img>` fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Avif,
    Webp,
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl OutputFormat {
    /// Parse a format name as written in config or shortcodes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "avif" => Some(Self::Avif),
            "webp" => Some(Self::Webp),
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::Webp => "image/webp",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One variant to encode from an already-decoded source.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn format_names() {
        assert_eq!(OutputFormat::from_name("webp"), Some(OutputFormat::Webp));
        assert_eq!(OutputFormat::from_name("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_name("jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_name("gif"), None);
    }

    #[test]
    fn formats_order_by_capability() {
        let mut formats = vec![OutputFormat::Webp, OutputFormat::Jpeg, OutputFormat::Avif];
        formats.sort();
        assert_eq!(
            formats,
            vec![OutputFormat::Avif, OutputFormat::Webp, OutputFormat::Jpeg]
        );
    }

    #[test]
    fn format_deserializes_with_jpg_alias() {
        #[derive(Deserialize)]
        struct Wrapper {
            formats: Vec<OutputFormat>,
        }
        let w: Wrapper = toml::from_str(r#"formats = ["avif", "jpg", "png"]"#).unwrap();
        assert_eq!(
            w.formats,
            vec![OutputFormat::Avif, OutputFormat::Jpeg, OutputFormat::Png]
        );
        assert!(toml::from_str::<Wrapper>(r#"formats = ["gif"]"#).is_err());
    }
}
