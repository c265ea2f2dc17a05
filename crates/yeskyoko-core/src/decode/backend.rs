//! Bitmap decoding behind a swappable capability.
//!
//! The browser build picks a decoder at startup (native `createImageBitmap`
//! when present, the `image` crate otherwise); the rest of the pipeline only
//! sees [`ImageDecoder`].

use std::io::Cursor;

use image::ImageReader;
use tracing::debug;

use super::{DecodeError, DecodedImage};

/// Turns raw file bytes into an RGB bitmap.
///
/// Implementations must not apply EXIF orientation; the compositor does that.
#[allow(async_fn_in_trait)]
pub trait ImageDecoder {
    async fn decode_image(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}

/// Pure-Rust decoder built on the `image` crate.
///
/// The format is guessed from the content, so PNG input decodes as well
/// as JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageCrateDecoder {
    /// Synchronous decode used by the async trait method.
    pub fn decode_sync(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::InvalidFormat);
        }
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
        if reader.format().is_none() {
            return Err(DecodeError::InvalidFormat);
        }

        let img = reader
            .decode()
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
        debug!(width = img.width(), height = img.height(), "decoded bitmap");

        Ok(DecodedImage::from_rgb_image(img.into_rgb8()))
    }
}

impl ImageDecoder for ImageCrateDecoder {
    async fn decode_image(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        self.decode_sync(bytes)
    }
}
