//! Downscaling of oversized bitmaps before they reach the canvas.
//!
//! Phone photos routinely exceed what the classification endpoint accepts
//! once base64 encoded, so the session can cap the longer side first.

use super::{DecodeError, DecodedImage, FilterType};

/// Shrink `image` so its longer side is at most `max_side`, keeping the
/// aspect ratio. Images that already fit are returned unchanged.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for a zero `max_side` and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the
/// declared dimensions.
pub fn resize_to_fit(
    image: DecodedImage,
    max_side: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if max_side == 0 {
        return Err(DecodeError::InvalidFormat);
    }
    if image.width <= max_side && image.height <= max_side {
        return Ok(image);
    }

    let (width, height) = fit_dimensions(image.width, image.height, max_side);
    let rgb = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("pixel buffer size mismatch".to_string()))?;
    let resized = image::imageops::resize(&rgb, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgb_image(resized))
}

/// Dimensions that fit within `max_side` while preserving aspect ratio.
fn fit_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let ratio = width as f64 / height as f64;
    if width >= height {
        let h = (max_side as f64 / ratio).round() as u32;
        (max_side, h.max(1))
    } else {
        let w = (max_side as f64 * ratio).round() as u32;
        (w.max(1), max_side)
    }
}
