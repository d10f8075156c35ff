//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs
//! from a codec: decode a file into an RGBA buffer, and encode a buffer back
//! to a file.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's PNG codec.

use image::RgbaImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a decodable image: {0}")]
    Undecodable(String),
    #[error("Encoding failed: {0}")]
    EncodeFailed(String),
}

/// Trait for image codec backends.
///
/// Implementations must be `Sync`: a single backend instance is shared by
/// every concurrently running file job.
pub trait ImageBackend: Sync {
    /// Decode the image at `path` into an RGBA8 buffer.
    ///
    /// Content that is not a valid image must map to
    /// [`BackendError::Undecodable`]; failures to read the file map to
    /// [`BackendError::Io`].
    fn decode(&self, path: &Path) -> Result<RgbaImage, BackendError>;

    /// Encode `image` and write it to `path`, replacing any existing file.
    fn encode(&self, image: &RgbaImage, path: &Path) -> Result<(), BackendError>;
}
