//! Yeskyoko Core - photo intake pipeline
//!
//! This crate provides everything between a user picking a photo and the page
//! showing a verdict: EXIF orientation extraction, square canvas compositing,
//! serialization for upload, classification response handling and the upload
//! session state machine. It has no browser dependencies; the WASM crate
//! plugs in the browser-specific decoder, file source and HTTP client.

pub mod classify;
pub mod compose;
pub mod config;
pub mod decode;
pub mod encode;
pub mod session;

pub use classify::{ClassificationResponse, Classifier, ClassifyError, LabelScores, Verdict};
pub use compose::{composite, CanvasFrame, FrameLayout, Rotation};
pub use config::{ConfigError, PipelineConfig};
pub use decode::{
    extract_orientation, DecodeError, DecodedImage, ImageCrateDecoder, ImageDecoder, ImageSource,
    Orientation, OrientationCode,
};
pub use encode::{to_data_uri, OutputFormat};
pub use session::{PipelineError, SessionView, UploadSession, UploadState};
