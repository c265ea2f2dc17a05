//! Remote classification of uploaded frames.
//!
//! The endpoint receives a `data:` URI in the request body and answers with
//! either `{"error": "..."}` or `{"labels": [...]}`, one label record per
//! detected face.

mod response;

use thiserror::Error;

pub use response::{ClassificationResponse, LabelScores, Verdict};

/// Errors from the classification round-trip.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The request never produced a response body.
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with an explicit error message.
    #[error("{0}")]
    Service(String),

    /// The body was not a valid classification response.
    #[error("Invalid classification response: {0}")]
    InvalidResponse(String),
}

/// Sends a serialized frame to the classification service.
#[allow(async_fn_in_trait)]
pub trait Classifier {
    async fn classify(&self, data_uri: String) -> Result<ClassificationResponse, ClassifyError>;
}
