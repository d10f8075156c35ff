//! Pure Rust codec backend: PNG via the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode | `image::ImageReader` pinned to `ImageFormat::Png`, then `into_rgba8` |
//! | Encode | `image::codecs::png::PngEncoder` (RGBA8, adaptive filtering) |

use super::backend::{BackendError, ImageBackend};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageError, ImageFormat, ImageReader, RgbaImage};
use std::io::{BufWriter, Write};
use std::path::Path;

/// File extension (compared case-insensitively) of the one supported format.
pub const SUPPORTED_EXTENSION: &str = "png";

/// Returns true when `path` carries the supported extension, in any case.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SUPPORTED_EXTENSION))
}

/// Pure Rust backend using the `image` crate's PNG codec.
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

/// Split `image` errors into read failures and bad content.
///
/// A truncated PNG surfaces from the decoder as an I/O error of kind
/// `UnexpectedEof`/`InvalidData`; that is bad content, not a failed read.
fn classify_decode_error(path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(io)
            if !matches!(
                io.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
            ) =>
        {
            BackendError::Io(io)
        }
        other => BackendError::Undecodable(format!("{}: {}", path.display(), other)),
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<RgbaImage, BackendError> {
        let mut reader = ImageReader::open(path)?;
        reader.set_format(ImageFormat::Png);
        let img = reader
            .decode()
            .map_err(|e| classify_decode_error(path, e))?;
        Ok(img.into_rgba8())
    }

    fn encode(&self, image: &RgbaImage, path: &Path) -> Result<(), BackendError> {
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        PngEncoder::new_with_quality(&mut writer, CompressionType::Default, PngFilter::Adaptive)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| match e {
                ImageError::IoError(io) => BackendError::Io(io),
                other => BackendError::EncodeFailed(other.to_string()),
            })?;
        writer.flush()?;
        Ok(())
    }
}
