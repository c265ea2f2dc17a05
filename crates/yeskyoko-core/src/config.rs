//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object (or no configuration
//! at all) yields the stock behaviour of the page.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::FilterType;
use crate::encode::OutputFormat;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("threshold must be within [0, 1], got {0}")]
    Threshold(f64),

    #[error("jpeg_quality must be within 1-100, got {0}")]
    Quality(u8),

    #[error("max_side must be non-zero")]
    MaxSide,

    #[error("endpoint must not be empty")]
    Endpoint,
}

/// Settings for one intake page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Classification endpoint the frame is posted to.
    pub endpoint: String,
    /// Minimum score for a positive verdict.
    pub threshold: f64,
    /// Key of the decision score within each label record.
    pub score_label: String,
    /// Encoding of the uploaded frame.
    pub output_format: OutputFormat,
    /// JPEG quality (1-100); ignored for PNG.
    pub jpeg_quality: u8,
    /// Background image shown for a positive verdict.
    pub positive_asset: String,
    /// Background image shown for a negative verdict.
    pub negative_asset: String,
    /// Message shown when no face was detected.
    pub no_face_message: String,
    /// Cap on the bitmap's longer side before compositing. `None` keeps full size.
    pub max_side: Option<u32>,
    /// Filter used when `max_side` shrinks the bitmap.
    pub resize_filter: FilterType,
    /// `tracing` filter directive for the browser console.
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "/label".to_string(),
            threshold: 0.7,
            score_label: "yeskyoko".to_string(),
            output_format: OutputFormat::Jpeg,
            jpeg_quality: 100,
            positive_asset: "/yes.png".to_string(),
            negative_asset: "/not.png".to_string(),
            no_face_message: "顔がよく見えません。".to_string(),
            max_side: None,
            resize_filter: FilterType::Bilinear,
            log_level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Threshold(self.threshold));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Quality(self.jpeg_quality));
        }
        if self.max_side == Some(0) {
            return Err(ConfigError::MaxSide);
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Endpoint);
        }
        Ok(())
    }
}
