//! Browser-side intake: file reading and bitmap decoding.
//!
//! This module provides the browser implementations of the core intake
//! capabilities:
//!
//! - [`FileSource`] - reads a picked `File` through `Blob.arrayBuffer()`
//! - [`BrowserDecoder`] - decodes with `createImageBitmap` and a scratch canvas
//! - [`AnyDecoder`] - picks one of the above or the pure-Rust decoder at startup
//!
//! and the JavaScript binding [`extract_orientation`].
//!
//! # Example
//!
//! ```typescript
//! import { extract_orientation } from '@yeskyoko/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const code = extract_orientation(bytes); // -2, -1 or 1..8
//! ```

use std::cell::Cell;

use js_sys::{Array, Reflect, Uint8Array};
use tracing::{debug, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, CanvasRenderingContext2d, Document, File, HtmlCanvasElement, ImageBitmap, Window};
use yeskyoko_core::decode::{
    self, DecodeError, DecodedImage, ImageCrateDecoder, ImageDecoder, ImageSource, Orientation,
    OrientationCode, SourceError,
};
use yeskyoko_core::encode::encode_jpeg;

use crate::types::describe_js_error;

/// Extract the EXIF orientation code from JPEG bytes.
///
/// Returns -2 for non-JPEG input, -1 when no usable orientation tag exists,
/// and the tag value 1-8 otherwise.
#[wasm_bindgen]
pub fn extract_orientation(bytes: &[u8]) -> i32 {
    decode::extract_orientation(bytes).as_i32()
}

/// A file chosen through the page's file input.
pub struct FileSource(File);

impl FileSource {
    pub fn new(file: File) -> Self {
        Self(file)
    }
}

impl ImageSource for FileSource {
    async fn read_bytes(&self) -> Result<Vec<u8>, SourceError> {
        let buffer = JsFuture::from(self.0.array_buffer())
            .await
            .map_err(|e| SourceError(describe_js_error(&e)))?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }

    fn name(&self) -> Option<String> {
        Some(self.0.name())
    }
}

/// Get the 2D context of a canvas.
pub(crate) fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d canvas context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

fn backend(err: JsValue) -> DecodeError {
    DecodeError::Backend(describe_js_error(&err))
}

/// Insert an EXIF APP1 segment carrying only an orientation entry right
/// after the SOI marker of `jpeg`.
pub(crate) fn tag_orientation(jpeg: &[u8], value: u16) -> Vec<u8> {
    let [hi, lo] = value.to_be_bytes();
    #[rustfmt::skip]
    let app1 = [
        0xFF, 0xE1, 0x00, 0x22,
        b'E', b'x', b'i', b'f', 0x00, 0x00,
        // Big-endian TIFF header, IFD0 at offset 8.
        b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08,
        0x00, 0x01,
        // Orientation, SHORT, count 1.
        0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, hi, lo, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ];
    let mut tagged = Vec::with_capacity(jpeg.len() + app1.len());
    tagged.extend_from_slice(&jpeg[..jpeg.len().min(2)]);
    tagged.extend_from_slice(&app1);
    tagged.extend_from_slice(jpeg.get(2..).unwrap_or_default());
    tagged
}

/// A 2x1 JPEG tagged 6. A browser that honours the tag decodes it as 1x2.
fn orientation_check_jpeg() -> Result<Vec<u8>, DecodeError> {
    let jpeg = encode_jpeg(&[128; 2 * 3], 2, 1, 90)
        .map_err(|e| DecodeError::Backend(e.to_string()))?;
    Ok(tag_orientation(&jpeg, 6))
}

/// Decoder built on the browser's native `createImageBitmap`.
///
/// Current browsers apply the EXIF orientation while decoding. The
/// compositor expects the pixels as stored, so when the browser has
/// rotated a tagged JPEG the rotation is undone here.
pub struct BrowserDecoder {
    window: Window,
    document: Document,
    applies_orientation: Cell<Option<bool>>,
}

impl BrowserDecoder {
    /// Returns `None` when the page has no `createImageBitmap`.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        let supported = Reflect::has(&window, &JsValue::from_str("createImageBitmap")).unwrap_or(false);
        supported.then_some(Self {
            window,
            document,
            applies_orientation: Cell::new(None),
        })
    }

    async fn bitmap(&self, bytes: &[u8]) -> Result<ImageBitmap, DecodeError> {
        let parts = Array::of1(&Uint8Array::from(bytes));
        let blob = Blob::new_with_u8_array_sequence(&parts).map_err(backend)?;
        let promise = self
            .window
            .create_image_bitmap_with_blob(&blob)
            .map_err(backend)?;
        JsFuture::from(promise)
            .await
            .map_err(|e| DecodeError::CorruptedFile(describe_js_error(&e)))?
            .dyn_into::<ImageBitmap>()
            .map_err(backend)
    }

    /// Whether this browser rotates tagged JPEGs. Checked once per page.
    async fn applies_orientation(&self) -> Result<bool, DecodeError> {
        if let Some(known) = self.applies_orientation.get() {
            return Ok(known);
        }
        let bitmap = self.bitmap(&orientation_check_jpeg()?).await?;
        let applies = (bitmap.width(), bitmap.height()) == (1, 2);
        bitmap.close();
        debug!(applies, "createImageBitmap orientation handling");
        self.applies_orientation.set(Some(applies));
        Ok(applies)
    }

    async fn rasterize(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let bitmap = self.bitmap(bytes).await?;
        let (width, height) = (bitmap.width(), bitmap.height());

        let canvas = self
            .document
            .create_element("canvas")
            .map_err(backend)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|v| backend(v.into()))?;
        canvas.set_width(width);
        canvas.set_height(height);

        let ctx = context_2d(&canvas).map_err(backend)?;
        ctx.draw_image_with_image_bitmap(&bitmap, 0.0, 0.0)
            .map_err(backend)?;
        bitmap.close();

        let rgba = ctx
            .get_image_data(0.0, 0.0, width as f64, height as f64)
            .map_err(backend)?
            .data();
        DecodedImage::from_rgba(width, height, &rgba)
    }
}

impl ImageDecoder for BrowserDecoder {
    async fn decode_image(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let image = self.rasterize(bytes).await?;
        let OrientationCode::Tagged(orientation) = decode::extract_orientation(bytes) else {
            return Ok(image);
        };
        if orientation == Orientation::Normal || !self.applies_orientation().await? {
            return Ok(image);
        }
        debug!(?orientation, "reverting browser-applied orientation");
        image.revert_orientation(orientation)
    }
}

/// The decoder selected for this page.
pub enum AnyDecoder {
    Browser(BrowserDecoder),
    Native(ImageCrateDecoder),
}

impl AnyDecoder {
    /// Prefer the browser decoder, fall back to the `image` crate.
    pub fn detect() -> Self {
        match BrowserDecoder::detect() {
            Some(decoder) => {
                info!("decoding with createImageBitmap");
                AnyDecoder::Browser(decoder)
            }
            None => {
                info!("createImageBitmap unavailable, decoding in WASM");
                AnyDecoder::Native(ImageCrateDecoder)
            }
        }
    }
}

impl ImageDecoder for AnyDecoder {
    async fn decode_image(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        match self {
            AnyDecoder::Browser(decoder) => decoder.decode_image(bytes).await,
            AnyDecoder::Native(decoder) => decoder.decode_image(bytes).await,
        }
    }
}


/// WASM-specific tests that need a browser.
///
/// Use `wasm-pack test --headless --chrome` to run these.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;
    use yeskyoko_core::encode::encode_png;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_browser_decoder_detected() {
        assert!(BrowserDecoder::detect().is_some());
        assert!(matches!(AnyDecoder::detect(), AnyDecoder::Browser(_)));
    }

    #[wasm_bindgen_test]
    async fn test_browser_decoder_decodes_png() {
        let png = encode_png(&[10u8, 20, 30].repeat(6), 3, 2).unwrap();
        let decoder = BrowserDecoder::detect().unwrap();
        let img = decoder.decode_image(&png).await.unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(&img.pixels[0..3], &[10, 20, 30]);
    }

    /// 8x4, left half red and right half blue.
    fn split_jpeg() -> Vec<u8> {
        let pixels: Vec<u8> = (0..8 * 4)
            .flat_map(|i| if i % 8 < 4 { [255, 0, 0] } else { [0, 0, 255] })
            .collect();
        encode_jpeg(&pixels, 8, 4, 100).unwrap()
    }

    #[wasm_bindgen_test]
    async fn test_browser_decoder_keeps_stored_orientation() {
        let decoder = BrowserDecoder::detect().unwrap();
        for value in [1u16, 3, 6, 8] {
            let img = decoder
                .decode_image(&tag_orientation(&split_jpeg(), value))
                .await
                .unwrap();
            assert_eq!((img.width, img.height), (8, 4), "tag {value}");
            // Top-left stays red whatever the tag.
            assert!(img.pixels[0] > 200 && img.pixels[2] < 60, "tag {value}");
        }
    }

    #[wasm_bindgen_test]
    async fn test_browser_and_native_decoders_agree_on_tagged_jpeg() {
        let jpeg = tag_orientation(&split_jpeg(), 6);
        let browser = BrowserDecoder::detect().unwrap().decode_image(&jpeg).await.unwrap();
        let native = ImageCrateDecoder.decode_sync(&jpeg).unwrap();
        assert_eq!((browser.width, browser.height), (native.width, native.height));
    }

    #[wasm_bindgen_test]
    async fn test_browser_decoder_rejects_garbage() {
        let decoder = BrowserDecoder::detect().unwrap();
        let result = decoder.decode_image(&[1, 2, 3, 4]).await;
        assert!(matches!(result, Err(DecodeError::CorruptedFile(_))));
    }
}
