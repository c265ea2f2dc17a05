//! Compositing and serialization WASM bindings.
//!
//! These run the synchronous half of the intake pipeline without the page
//! session, for callers that drive their own UI.
//!
//! # Functions
//!
//! - [`rotation_degrees`] - Map an orientation code to the drawn rotation
//! - [`composite_image`] - Decode encoded bytes and draw them into a square frame
//! - [`composite_pixels`] - Draw already-decoded RGB pixels into a square frame
//! - [`composite_to_data_uri`] - Full pipeline from file bytes to upload body
//!
//! # Example
//!
//! ```typescript
//! import { composite_image, composite_to_data_uri } from '@yeskyoko/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const frame = composite_image(bytes);
//! console.log(`${frame.side}px, rotated ${frame.rotation_degrees}`);
//!
//! const body = composite_to_data_uri(bytes, 100);
//! await fetch('/label', { method: 'POST', body });
//! ```

use wasm_bindgen::prelude::*;
use yeskyoko_core::compose::{self, ComposeError, Rotation};
use yeskyoko_core::decode::{self, DecodedImage, ImageCrateDecoder};
use yeskyoko_core::encode::{self as core_encode, OutputFormat};
use yeskyoko_core::CanvasFrame;

use crate::types::{to_js_error, JsCanvasFrame};

/// Rotation in degrees the compositor applies for an orientation code.
///
/// Total over all integers: 5 and 6 give 90, 7 and 8 give -90, 3 and 4
/// give -180, anything else gives 0.
#[wasm_bindgen]
pub fn rotation_degrees(code: i32) -> i32 {
    Rotation::from_code(code).degrees()
}

fn composite_bytes(bytes: &[u8]) -> Result<CanvasFrame, JsValue> {
    let orientation = decode::extract_orientation(bytes);
    let bitmap = ImageCrateDecoder.decode_sync(bytes).map_err(to_js_error)?;
    compose::composite(&bitmap, orientation).map_err(to_js_error)
}

/// Decode JPEG or PNG bytes and composite them upright into a square frame.
///
/// The orientation is read from the same bytes, so a portrait photo stored
/// sideways comes out upright.
///
/// # Errors
///
/// Returns an error if the bytes are not a decodable JPEG or PNG.
#[wasm_bindgen]
pub fn composite_image(bytes: &[u8]) -> Result<JsCanvasFrame, JsValue> {
    composite_bytes(bytes).map(JsCanvasFrame::new)
}

/// Composite RGB pixel data with an explicit orientation code.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Bitmap width in pixels
/// * `height` - Bitmap height in pixels
/// * `orientation` - Code as returned by `extract_orientation`
#[wasm_bindgen]
pub fn composite_pixels(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    orientation: i32,
) -> Result<JsCanvasFrame, JsValue> {
    composite_rgb(pixels, width, height, orientation)
        .map(JsCanvasFrame::new)
        .map_err(to_js_error)
}

/// Pixels come from JS unchecked; the compositor reports a length mismatch.
fn composite_rgb(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    orientation: i32,
) -> Result<CanvasFrame, ComposeError> {
    let bitmap = DecodedImage {
        width,
        height,
        pixels,
    };
    compose::composite_rotated(&bitmap, Rotation::from_code(orientation))
}

/// Decode, composite and serialize in one call.
///
/// Returns a `data:image/jpeg;base64,...` URI suitable as the body of the
/// classification request.
#[wasm_bindgen]
pub fn composite_to_data_uri(bytes: &[u8], quality: u8) -> Result<String, JsValue> {
    let frame = composite_bytes(bytes)?;
    core_encode::to_data_uri(&frame, OutputFormat::Jpeg, quality).map_err(to_js_error)
}
