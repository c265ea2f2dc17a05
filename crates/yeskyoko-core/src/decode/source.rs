//! Asynchronous input boundary for user-selected files.

use thiserror::Error;

/// Reading the selected file failed.
#[derive(Debug, Error)]
#[error("Failed to read image source: {0}")]
pub struct SourceError(pub String);

/// A user-selected image whose bytes are read asynchronously.
///
/// In the browser this is a `File` from the picker; natively any in-memory
/// buffer works.
#[allow(async_fn_in_trait)]
pub trait ImageSource {
    /// Read the full contents of the source.
    async fn read_bytes(&self) -> Result<Vec<u8>, SourceError>;

    /// Display name, if the source has one.
    fn name(&self) -> Option<String> {
        None
    }
}

impl ImageSource for Vec<u8> {
    async fn read_bytes(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.clone())
    }
}

impl ImageSource for &[u8] {
    async fn read_bytes(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.to_vec())
    }
}
