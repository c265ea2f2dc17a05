//! Yeskyoko WASM - browser bindings for the photo intake pipeline
//!
//! This crate plugs the browser into yeskyoko-core: it reads picked files,
//! decodes them with `createImageBitmap`, posts frames with `fetch` and
//! renders the session state into the page.
//!
//! # Module Structure
//!
//! - `app` - `IntakeApp`, the page controller
//! - `classify` - `fetch`-based classification client
//! - `decode` - File reading, bitmap decoding, orientation extraction
//! - `encode` - Standalone compositing and data URI bindings
//! - `logging` - `tracing` output to the browser console
//! - `types` - WASM-compatible wrapper types and JS conversions
//!
//! # Usage
//!
//! ```typescript
//! import init, { IntakeApp, extract_orientation } from '@yeskyoko/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! // Take over the page
//! const app = new IntakeApp({ endpoint: '/label' });
//!
//! // Or use the pieces directly
//! const code = extract_orientation(new Uint8Array(await file.arrayBuffer()));
//! ```

use wasm_bindgen::prelude::*;

mod app;
mod classify;
mod decode;
mod encode;
mod logging;
mod types;

// Re-export public types
pub use app::{IntakeApp, PageView};
pub use classify::{classification_verdict, FetchClassifier};
pub use decode::{extract_orientation, AnyDecoder, BrowserDecoder, FileSource};
pub use encode::{composite_image, composite_pixels, composite_to_data_uri, rotation_degrees};
pub use logging::{init_logging, MakeConsoleWriter};
pub use types::JsCanvasFrame;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
