//! WASM-compatible wrapper types and JS value conversions.
//!
//! This module provides the JavaScript-facing frame type and the helpers that
//! move configuration and errors across the JS boundary.

use std::fmt::Display;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use yeskyoko_core::encode::{self, OutputFormat};
use yeskyoko_core::{CanvasFrame, PipelineConfig};

/// A composited square frame for JavaScript.
///
/// The pixels stay in WASM memory until `rgba()` or one of the data URI
/// methods is called.
#[wasm_bindgen]
pub struct JsCanvasFrame {
    frame: CanvasFrame,
}

impl JsCanvasFrame {
    pub(crate) fn new(frame: CanvasFrame) -> Self {
        Self { frame }
    }

    pub(crate) fn frame(&self) -> &CanvasFrame {
        &self.frame
    }
}

#[wasm_bindgen]
impl JsCanvasFrame {
    /// Side length of the square frame in pixels
    #[wasm_bindgen(getter)]
    pub fn side(&self) -> u32 {
        self.frame.side()
    }

    /// Rotation applied to the bitmap: 0, 90, -90 or -180
    #[wasm_bindgen(getter)]
    pub fn rotation_degrees(&self) -> i32 {
        self.frame.rotation().degrees()
    }

    /// Returns opaque RGBA pixel data, ready for `new ImageData(...)`.
    pub fn rgba(&self) -> Vec<u8> {
        self.frame.to_rgba()
    }

    /// Serialize as a `data:image/jpeg;base64,...` URI.
    pub fn to_data_uri(&self, quality: u8) -> Result<String, JsValue> {
        encode::to_data_uri(&self.frame, OutputFormat::Jpeg, quality).map_err(to_js_error)
    }

    /// Serialize as a `data:image/png;base64,...` URI.
    pub fn to_png_data_uri(&self) -> Result<String, JsValue> {
        encode::to_data_uri(&self.frame, OutputFormat::Png, 100).map_err(to_js_error)
    }
}

/// Convert a Rust error into a JS string value.
pub(crate) fn to_js_error<E: Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Best-effort message for a thrown JS value.
pub(crate) fn describe_js_error(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

/// Read a `PipelineConfig` from a JS object.
///
/// `undefined` and `null` give the defaults; missing fields take their
/// default values.
pub(crate) fn config_from_js(value: JsValue) -> Result<PipelineConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(PipelineConfig::default());
    }
    let config: PipelineConfig = serde_wasm_bindgen::from_value(value)?;
    config.validate().map_err(to_js_error)?;
    Ok(config)
}
