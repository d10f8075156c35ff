//! High-level image operations.
//!
//! These functions combine the placement calculations with the actual pixel
//! work. They never touch the filesystem.

use super::calculations::calculate_placement;
use fast_image_resize as fir;
use fir::images::Image;
use fir::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::imageops;
use image::{Rgba, RgbaImage};
use thiserror::Error;

/// Resampling filter for the drawn region.
///
/// Catmull-Rom is the bicubic kernel; when downscaling, the convolution
/// widens its support by the scale ratio, which antialiases fine edges and
/// lettering. Nearest and triangle filters smear sticker outlines.
pub const RESAMPLE_FILTER: FilterType = FilterType::CatmullRom;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Error, Debug)]
pub enum ScaleError {
    #[error("invalid pixel buffer: {0}")]
    Buffer(#[from] fir::ImageBufferError),
    #[error("resize failed: {0}")]
    Resize(#[from] fir::ResizeError),
}

/// Scale `source` to fit a `target_width × target_height` canvas, centered,
/// with fully transparent padding.
///
/// The output is always exactly the target size. Pixels outside the placement
/// rectangle have alpha 0. Deterministic: identical input produces an
/// identical buffer.
pub fn resize_and_pad(
    source: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage, ScaleError> {
    let placement = calculate_placement(source.dimensions(), (target_width, target_height));
    let mut canvas = RgbaImage::from_pixel(target_width, target_height, TRANSPARENT);

    if placement.is_empty() {
        return Ok(canvas);
    }

    let drawn = if (placement.width, placement.height) == source.dimensions() {
        source.clone()
    } else {
        resample(source, placement.width, placement.height)?
    };

    // Straight copy: the canvas is transparent, so source-over and replace agree
    imageops::replace(
        &mut canvas,
        &drawn,
        i64::from(placement.x),
        i64::from(placement.y),
    );
    Ok(canvas)
}

/// Resample with alpha premultiplied, so fully transparent texels carry no
/// color into the edge of the drawn region.
fn resample(source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, ScaleError> {
    let src = Image::from_vec_u8(
        source.width(),
        source.height(),
        source.as_raw().clone(),
        PixelType::U8x4,
    )?;
    let mut dst = Image::new(width, height, PixelType::U8x4);

    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(RESAMPLE_FILTER))
        .use_alpha(true);
    Resizer::new().resize(&src, &mut dst, &options)?;

    RgbaImage::from_raw(width, height, dst.into_vec())
        .ok_or(ScaleError::Buffer(fir::ImageBufferError::InvalidBufferSize))
}
