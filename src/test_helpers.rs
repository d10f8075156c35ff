//! Shared test utilities for the sticker-scale test suite.
//!
//! Provides synthetic image builders and fixture writers so tests never
//! depend on binary files checked into the repository.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_test_png(&tmp.path().join("a.png"), 200, 50);
//! write_corrupt_png(&tmp.path().join("broken.png"));
//! ```

use image::{Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// In-memory images
// =========================================================================

/// Opaque RGBA image with a deterministic color gradient.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

// =========================================================================
// Fixture files
// =========================================================================

/// Write an opaque gradient PNG of the given size, creating parent directories.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient_rgba(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// Write a file with a `.png` name whose contents are not an image.
pub fn write_corrupt_png(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"definitely not a PNG file, just some text bytes").unwrap();
}

/// Names of all regular files directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().unwrap().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
