//! Image processing — pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3, one decode per source |
//! | **Encode** | AVIF (rav1e), WebP (lossless), JPEG, PNG |
//! | **Markup** | `maud` `<picture>` / `<img>` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for width and dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Plan a variant set and encode what's missing
//! - **Markup**: Responsive `<picture>` HTML for a variant set

pub mod backend;
mod calculations;
mod markup;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{VariantSize, calculate_variant_sizes, scaled_height, valid_widths};
pub use markup::{ImageAttributes, picture_markup};
pub use operations::{
    CreatedVariants, ImageVariant, VariantSet, VariantSpec, create_variants, get_dimensions,
    plan_variants,
};
pub use params::{OutputFormat, Quality, ResizeParams};
pub use rust_backend::RustBackend;
