//! Square canvas compositing.
//!
//! The frame is `side x side` with `side = max(width, height)`. The bitmap is
//! placed centered in the frame and the whole square is then turned about its
//! center. Because the frame is square, quarter turns map it onto itself and
//! nothing is clipped or resampled.
//!
//! When `side - width` (or `side - height`) is odd the centering offset is
//! floored, which keeps every pixel on the integer grid.

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::Rotation;
use crate::decode::{DecodedImage, OrientationCode};

/// Errors that can occur while compositing.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Cannot composite an empty bitmap ({width}x{height})")]
    EmptyBitmap { width: u32, height: u32 },

    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    PixelBufferMismatch { expected: usize, actual: usize },
}

/// Axis-aligned rectangle in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Geometry of one composite, computed without touching pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    /// Frame width and height.
    pub side: u32,
    pub rotation: Rotation,
    /// Source bitmap size.
    pub width: u32,
    pub height: u32,
    /// Top-left of the unrotated bitmap inside the frame.
    pub offset_x: u32,
    pub offset_y: u32,
}

impl FrameLayout {
    pub fn compute(width: u32, height: u32, rotation: Rotation) -> Self {
        let side = width.max(height);
        Self {
            side,
            rotation,
            width,
            height,
            offset_x: (side - width) / 2,
            offset_y: (side - height) / 2,
        }
    }

    /// Where the bitmap's pixels land after rotation.
    pub fn content_bounds(&self) -> Rect {
        let (side, ox, oy) = (self.side, self.offset_x, self.offset_y);
        let (w, h) = (self.width, self.height);
        match self.rotation {
            Rotation::None => Rect { x: ox, y: oy, width: w, height: h },
            Rotation::Clockwise90 => Rect { x: side - oy - h, y: ox, width: h, height: w },
            Rotation::CounterClockwise90 => Rect { x: oy, y: side - ox - w, width: h, height: w },
            Rotation::HalfTurn => Rect { x: side - ox - w, y: side - oy - h, width: w, height: h },
        }
    }
}

/// A composited square frame, ready for display or serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasFrame {
    layout: FrameLayout,
    image: RgbImage,
}

impl CanvasFrame {
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn side(&self) -> u32 {
        self.layout.side
    }

    pub fn rotation(&self) -> Rotation {
        self.layout.rotation
    }

    /// RGB pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_rgb_image(&self) -> &RgbImage {
        &self.image
    }

    /// Opaque RGBA copy for `putImageData`.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.image
            .as_raw()
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect()
    }
}

/// Draw `bitmap` into a square frame rotated for `orientation`.
pub fn composite(
    bitmap: &DecodedImage,
    orientation: OrientationCode,
) -> Result<CanvasFrame, ComposeError> {
    composite_rotated(bitmap, Rotation::from(orientation))
}

/// Draw `bitmap` into a square frame with an explicit rotation.
pub fn composite_rotated(
    bitmap: &DecodedImage,
    rotation: Rotation,
) -> Result<CanvasFrame, ComposeError> {
    if bitmap.is_empty() {
        return Err(ComposeError::EmptyBitmap {
            width: bitmap.width,
            height: bitmap.height,
        });
    }
    let source = bitmap
        .to_rgb_image()
        .ok_or(ComposeError::PixelBufferMismatch {
            expected: (bitmap.width as usize) * (bitmap.height as usize) * 3,
            actual: bitmap.pixels.len(),
        })?;

    let layout = FrameLayout::compute(bitmap.width, bitmap.height, rotation);
    let mut frame = RgbImage::new(layout.side, layout.side);
    imageops::replace(
        &mut frame,
        &source,
        layout.offset_x as i64,
        layout.offset_y as i64,
    );

    let image = match rotation {
        Rotation::None => frame,
        Rotation::Clockwise90 => imageops::rotate90(&frame),
        Rotation::CounterClockwise90 => imageops::rotate270(&frame),
        Rotation::HalfTurn => imageops::rotate180(&frame),
    };
    debug!(
        side = layout.side,
        degrees = rotation.degrees(),
        "composited frame"
    );

    Ok(CanvasFrame { layout, image })
}
