//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// A single variant size to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSize {
    pub width: u32,
    pub height: u32,
}

/// Resolve the widths actually generated for a source image.
///
/// Widths larger than the source are dropped (images are never upscaled).
/// If that leaves nothing, the source width is used. The result is sorted
/// ascending without duplicates.
///
/// # Examples
/// ```
/// # use postsmith::imaging::valid_widths;
/// assert_eq!(valid_widths(2000, &[1965, 655, 1310]), vec![655, 1310, 1965]);
/// assert_eq!(valid_widths(1000, &[655, 1310, 1965]), vec![655]);
/// assert_eq!(valid_widths(400, &[655, 1310]), vec![400]);
/// ```
pub fn valid_widths(source_width: u32, requested: &[u32]) -> Vec<u32> {
    let mut widths: Vec<u32> = requested
        .iter()
        .copied()
        .filter(|&w| w > 0 && w <= source_width)
        .collect();
    if widths.is_empty() {
        widths.push(source_width);
    }
    widths.sort_unstable();
    widths.dedup();
    widths
}

/// Height of a variant scaled to `width`, preserving aspect ratio.
pub fn scaled_height(source: (u32, u32), width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h;
    }
    let h = (src_h as f64 * width as f64 / src_w as f64).round() as u32;
    h.max(1)
}

/// Calculate the variant sizes to generate for a source image.
///
/// Combines [`valid_widths`] with [`scaled_height`]. Sizes are ascending.
pub fn calculate_variant_sizes(source: (u32, u32), widths: &[u32]) -> Vec<VariantSize> {
    valid_widths(source.0, widths)
        .into_iter()
        .map(|width| VariantSize {
            width,
            height: scaled_height(source, width),
        })
        .collect()
}
