//! Frame serialization for upload.
//!
//! This module provides functionality for:
//! - Encoding RGB frames to JPEG (configurable quality) or PNG
//! - Wrapping the encoded bytes as a base64 `data:` URI, the body format the
//!   classification endpoint expects
//!
//! # Examples
//!
//! ```ignore
//! use yeskyoko_core::encode::{to_data_uri, OutputFormat};
//!
//! let uri = to_data_uri(&frame, OutputFormat::Jpeg, 100).unwrap();
//! assert!(uri.starts_with("data:image/jpeg;base64,"));
//! ```

mod data_uri;
mod raster;

pub use data_uri::{parse_data_uri, to_data_uri, OutputFormat};
pub use raster::{encode_jpeg, encode_png, EncodeError};
