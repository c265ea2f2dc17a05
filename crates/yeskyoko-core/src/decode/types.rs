//! Core types for image intake: decoded bitmaps and orientation codes.

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for bitmap decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file format is not recognized or supported.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// The decoding backend itself failed (browser API missing, canvas unavailable).
    #[error("Decoder backend failed: {0}")]
    Backend(String),
}

/// Filter type for image resizing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl Orientation {
    /// Parse a raw tag value, rejecting anything outside 1-8.
    pub fn from_tag(value: u16) -> Option<Self> {
        match value {
            1 => Some(Orientation::Normal),
            2 => Some(Orientation::FlipHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::FlipVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90CW),
            7 => Some(Orientation::Transverse),
            8 => Some(Orientation::Rotate270CW),
            _ => None,
        }
    }

    /// Undo this orientation's transform on a bitmap that was already
    /// displayed upright, giving back the pixels as stored in the file.
    pub fn revert(self, img: &RgbImage) -> RgbImage {
        match self {
            Orientation::Normal => img.clone(),
            Orientation::FlipHorizontal => imageops::flip_horizontal(img),
            Orientation::Rotate180 => imageops::rotate180(img),
            Orientation::FlipVertical => imageops::flip_vertical(img),
            // Transpose and transverse are their own inverses.
            Orientation::Transpose => imageops::flip_horizontal(&imageops::rotate90(img)),
            Orientation::Rotate90CW => imageops::rotate270(img),
            Orientation::Transverse => imageops::flip_horizontal(&imageops::rotate270(img)),
            Orientation::Rotate270CW => imageops::rotate90(img),
        }
    }
}

/// Result of orientation extraction for one input buffer.
///
/// Externally this is the integer code set {-2, -1, 1..8}: `NotJpeg` is -2,
/// `Undefined` is -1 and `Tagged` carries the EXIF value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrientationCode {
    /// The buffer does not start with a JPEG start-of-image marker.
    NotJpeg,
    /// No orientation tag was found, or the EXIF data was malformed.
    Undefined,
    /// A valid orientation tag (1-8).
    Tagged(Orientation),
}

impl OrientationCode {
    pub const NOT_JPEG: i32 = -2;
    pub const UNDEFINED: i32 = -1;

    /// The integer code exposed to callers.
    pub fn as_i32(self) -> i32 {
        match self {
            OrientationCode::NotJpeg => Self::NOT_JPEG,
            OrientationCode::Undefined => Self::UNDEFINED,
            OrientationCode::Tagged(o) => o as i32,
        }
    }

    /// Parse an integer code. Values outside the closed set yield `None`.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            Self::NOT_JPEG => Some(OrientationCode::NotJpeg),
            Self::UNDEFINED => Some(OrientationCode::Undefined),
            1..=8 => Orientation::from_tag(value as u16).map(OrientationCode::Tagged),
            _ => None,
        }
    }
}

/// A decoded image with RGB pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    /// Length should be width * height * 3.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width as usize) * (height as usize) * 3,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a DecodedImage from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Build an RGB image from interleaved RGBA bytes, dropping alpha.
    ///
    /// Browser canvases hand back RGBA; the rest of the pipeline is RGB.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, DecodeError> {
        let expected = (width as usize) * (height as usize) * 4;
        if rgba.len() != expected {
            return Err(DecodeError::CorruptedFile(format!(
                "expected {expected} RGBA bytes, got {}",
                rgba.len()
            )));
        }
        let pixels = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Ok(Self::new(width, height, pixels))
    }

    /// Convert to an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Reverse an orientation a decoder already applied.
    pub fn revert_orientation(self, orientation: Orientation) -> Result<Self, DecodeError> {
        if orientation == Orientation::Normal {
            return Ok(self);
        }
        let img = self.to_rgb_image().ok_or_else(|| {
            DecodeError::CorruptedFile("pixel buffer does not match dimensions".to_string())
        })?;
        Ok(Self::from_rgb_image(orientation.revert(&img)))
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}
