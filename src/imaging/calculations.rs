//! Pure calculation functions for canvas placement.
//!
//! All functions here are pure and testable without any I/O or images.

/// Where a scaled source image lands on the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left offset of the drawn region.
    pub x: u32,
    /// Top offset of the drawn region.
    pub y: u32,
    /// Width of the drawn region.
    pub width: u32,
    /// Height of the drawn region.
    pub height: u32,
}

impl Placement {
    /// True when the scaled image collapsed to nothing on some axis.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether canvas pixel `(px, py)` lies inside the drawn region.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Calculate the largest aspect-preserving placement of `source` inside `target`.
///
/// The scale factor is `min(target_w / source_w, target_h / source_h)`, so the
/// image always fits on both axes. The constraining axis fills the canvas
/// exactly; the other axis is `floor(source * scale)`, computed with integer
/// cross-multiplication so no pixel is lost to float rounding. Offsets use
/// integer division, so an odd leftover pixel ends up on the right/bottom band.
///
/// # Arguments
/// * `source` - Source image dimensions (width, height), both non-zero
/// * `target` - Canvas dimensions (width, height), both non-zero
///
/// # Examples
/// ```
/// # use sticker_scale::imaging::calculate_placement;
/// // 200x50 banner on a 300x300 canvas → 300x75, centered vertically
/// let p = calculate_placement((200, 50), (300, 300));
/// assert_eq!((p.x, p.y, p.width, p.height), (0, 112, 300, 75));
/// ```
pub fn calculate_placement(source: (u32, u32), target: (u32, u32)) -> Placement {
    let (src_w, src_h) = (u64::from(source.0), u64::from(source.1));
    let (tgt_w, tgt_h) = (u64::from(target.0), u64::from(target.1));

    // tgt_w / src_w <= tgt_h / src_h, cross-multiplied
    let (width, height) = if src_w * tgt_h >= src_h * tgt_w {
        (tgt_w, (src_h * tgt_w / src_w).min(tgt_h))
    } else {
        ((src_w * tgt_h / src_h).min(tgt_w), tgt_h)
    };

    // Both are bounded by a u32 target dimension
    let (width, height) = (width as u32, height as u32);
    let (tgt_w, tgt_h) = target;

    Placement {
        x: (tgt_w - width) / 2,
        y: (tgt_h - height) / 2,
        width,
        height,
    }
}
