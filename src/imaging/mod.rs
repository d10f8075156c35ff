//! Image processing in pure Rust, PNG in and PNG out.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (PNG only), converted to RGBA8 |
//! | **Placement** | [`calculate_placement`]: scale, floor, center |
//! | **Resize + pad** | `fast_image_resize` Catmull-Rom on premultiplied alpha, onto a transparent canvas |
//! | **Encode** | `image::codecs::png::PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for placement math (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The pixel work built on top of the calculations

pub mod backend;
mod calculations;
pub mod operations;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{Placement, calculate_placement};
pub use operations::{RESAMPLE_FILTER, ScaleError, resize_and_pad};
pub use rust_backend::{RustBackend, SUPPORTED_EXTENSION};
