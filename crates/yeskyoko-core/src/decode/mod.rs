//! Image intake for yeskyoko.
//!
//! This module provides functionality for:
//! - Reading a user-selected file asynchronously ([`ImageSource`])
//! - Extracting the EXIF orientation code from JPEG bytes without a full EXIF reader
//! - Decoding bitmaps behind the [`ImageDecoder`] capability
//! - Capping oversized bitmaps before compositing
//!
//! # Orientation codes
//!
//! Extraction always yields exactly one [`OrientationCode`]: -2 when the
//! buffer is not a JPEG, -1 when no usable orientation tag exists, and the
//! EXIF value 1-8 otherwise. Neither failure is fatal; both composite with
//! no rotation.
//!
//! # Examples
//!
//! ```ignore
//! use yeskyoko_core::decode::{extract_orientation, ImageCrateDecoder};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let code = extract_orientation(&bytes);
//! let bitmap = ImageCrateDecoder.decode_sync(&bytes).unwrap();
//! println!("{}x{} orientation {}", bitmap.width, bitmap.height, code.as_i32());
//! ```

mod backend;
mod exif;
mod resize;
mod source;
mod types;

#[cfg(test)]
pub(crate) use backend::tests::MINIMAL_JPEG;
#[cfg(test)]
pub(crate) use exif::fixtures;

pub use backend::{ImageCrateDecoder, ImageDecoder};
pub use exif::{
    extract_orientation, read_orientation, scan_orientation, ByteCursor, ByteOrder,
    OrientationScan, OutOfBounds,
};
pub use resize::resize_to_fit;
pub use source::{ImageSource, SourceError};
pub use types::{DecodeError, DecodedImage, FilterType, Orientation, OrientationCode};
