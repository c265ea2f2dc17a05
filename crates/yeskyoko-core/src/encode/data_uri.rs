//! `data:` URI serialization of composited frames.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::raster::{encode_jpeg, encode_png, EncodeError};
use crate::compose::CanvasFrame;

/// Encoding used for the uploaded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Encode `frame` and wrap it as `data:<mime>;base64,<payload>`.
///
/// `quality` only applies to JPEG.
pub fn to_data_uri(
    frame: &CanvasFrame,
    format: OutputFormat,
    quality: u8,
) -> Result<String, EncodeError> {
    let side = frame.side();
    let bytes = match format {
        OutputFormat::Jpeg => encode_jpeg(frame.pixels(), side, side, quality)?,
        OutputFormat::Png => encode_png(frame.pixels(), side, side)?,
    };
    debug!(format = format.mime_type(), encoded = bytes.len(), "serialized frame");

    let mut uri = format!("data:{};base64,", format.mime_type());
    STANDARD.encode_string(&bytes, &mut uri);
    Ok(uri)
}

/// Split a base64 `data:` URI into its MIME type and decoded payload.
///
/// Returns `None` for anything that is not a base64 data URI.
pub fn parse_data_uri(uri: &str) -> Option<(&str, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{composite, Rotation};
    use crate::decode::{DecodedImage, OrientationCode};

    fn frame() -> CanvasFrame {
        let bitmap = DecodedImage::new(4, 2, (0..24).map(|i| i * 10).collect());
        composite(&bitmap, OrientationCode::Undefined).unwrap()
    }

    #[test]
    fn test_jpeg_data_uri_prefix_and_payload() {
        let uri = to_data_uri(&frame(), OutputFormat::Jpeg, 100).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));

        let (mime, bytes) = parse_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_png_data_uri_is_lossless() {
        let frame = frame();
        let uri = to_data_uri(&frame, OutputFormat::Png, 0).unwrap();
        let (mime, bytes) = parse_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");

        let decoded = image::load_from_memory(&bytes).unwrap().into_rgb8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.as_raw(), frame.pixels());
        assert_eq!(frame.rotation(), Rotation::None);
    }

    #[test]
    fn test_parse_rejects_non_data_uris() {
        assert!(parse_data_uri("https://example.com/a.jpg").is_none());
        assert!(parse_data_uri("data:image/jpeg,rawtext").is_none());
        assert!(parse_data_uri("data:image/jpeg;base64,@@@").is_none());
    }

    #[test]
    fn test_format_serde_names() {
        assert_eq!(serde_json::to_string(&OutputFormat::Png).unwrap(), "\"png\"");
        let parsed: OutputFormat = serde_json::from_str("\"jpeg\"").unwrap();
        assert_eq!(parsed, OutputFormat::Jpeg);
    }
}
