//! JPEG segment walker that extracts the EXIF orientation tag.
//!
//! Only the orientation entry of IFD0 is read. Everything else in the
//! EXIF block is skipped.

use tracing::debug;

use super::source::{ImageSource, SourceError};
use super::{Orientation, OrientationCode};

const SOI: u16 = 0xFFD8;
const APP1: u16 = 0xFFE1;
/// ASCII "Exif", read as a big-endian u32.
const EXIF_SIGNATURE: u32 = 0x4578_6966;
/// ASCII "II".
const LITTLE_ENDIAN_FLAG: u16 = 0x4949;
const ORIENTATION_TAG: u16 = 0x0112;
const IFD_ENTRY_LEN: usize = 12;
/// Segment lengths at or below this stop the walk (truncated or bogus data).
const MIN_SEGMENT_LEN: u16 = 8;

/// Byte order used for multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// A read ran past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds;

/// Bounds-checked reader over an immutable byte buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N], OutOfBounds> {
        let end = offset.checked_add(N).ok_or(OutOfBounds)?;
        self.buf
            .get(offset..end)
            .and_then(|s| s.try_into().ok())
            .ok_or(OutOfBounds)
    }

    pub fn u16_at(&self, offset: usize, order: ByteOrder) -> Result<u16, OutOfBounds> {
        let bytes = self.array_at::<2>(offset)?;
        Ok(match order {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        })
    }

    pub fn u32_at(&self, offset: usize, order: ByteOrder) -> Result<u32, OutOfBounds> {
        let bytes = self.array_at::<4>(offset)?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        })
    }
}

/// Outcome of scanning a buffer for the orientation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationScan {
    /// No JPEG start-of-image marker.
    NotJpeg,
    /// Raw value of the orientation entry.
    Found(u16),
    /// Walked the segments without finding an orientation entry.
    NotFound,
    /// Structurally broken data (bad marker, bad signature, out-of-bounds read).
    Malformed,
}

impl From<OrientationScan> for OrientationCode {
    fn from(scan: OrientationScan) -> Self {
        match scan {
            OrientationScan::NotJpeg => OrientationCode::NotJpeg,
            OrientationScan::Found(value) => Orientation::from_tag(value)
                .map(OrientationCode::Tagged)
                .unwrap_or(OrientationCode::Undefined),
            OrientationScan::NotFound | OrientationScan::Malformed => OrientationCode::Undefined,
        }
    }
}

impl From<OutOfBounds> for OrientationScan {
    fn from(_: OutOfBounds) -> Self {
        OrientationScan::Malformed
    }
}

/// Walk the JPEG marker segments of `bytes` looking for the orientation tag.
pub fn scan_orientation(bytes: &[u8]) -> OrientationScan {
    let cursor = ByteCursor::new(bytes);
    match cursor.u16_at(0, ByteOrder::Big) {
        Ok(SOI) => {}
        _ => return OrientationScan::NotJpeg,
    }
    match walk_segments(&cursor) {
        Ok(scan) => scan,
        Err(scan) => scan,
    }
}

fn walk_segments(cursor: &ByteCursor<'_>) -> Result<OrientationScan, OrientationScan> {
    let mut offset = 2usize;
    while offset < cursor.len() {
        if cursor.u16_at(offset + 2, ByteOrder::Big)? <= MIN_SEGMENT_LEN {
            return Ok(OrientationScan::NotFound);
        }
        let marker = cursor.u16_at(offset, ByteOrder::Big)?;
        offset += 2;

        if marker == APP1 {
            return scan_exif_segment(cursor, offset + 2);
        }
        if marker & 0xFF00 != 0xFF00 {
            return Ok(OrientationScan::Malformed);
        }
        offset += cursor.u16_at(offset, ByteOrder::Big)? as usize;
    }
    Ok(OrientationScan::NotFound)
}

/// Scan an APP1 payload starting at the "Exif" signature.
fn scan_exif_segment(
    cursor: &ByteCursor<'_>,
    offset: usize,
) -> Result<OrientationScan, OrientationScan> {
    if cursor.u32_at(offset, ByteOrder::Big)? != EXIF_SIGNATURE {
        return Ok(OrientationScan::Malformed);
    }
    // Signature is "Exif\0\0"; the TIFF header follows.
    let tiff = offset + 6;
    let order = if cursor.u16_at(tiff, ByteOrder::Big)? == LITTLE_ENDIAN_FLAG {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };

    let ifd = tiff
        .checked_add(cursor.u32_at(tiff + 4, order)? as usize)
        .ok_or(OrientationScan::Malformed)?;
    let entries = cursor.u16_at(ifd, order)? as usize;
    let first_entry = ifd + 2;

    for i in 0..entries {
        let entry = first_entry + i * IFD_ENTRY_LEN;
        if cursor.u16_at(entry, order)? == ORIENTATION_TAG {
            return Ok(OrientationScan::Found(cursor.u16_at(entry + 8, order)?));
        }
    }
    Ok(OrientationScan::NotFound)
}

/// Extract the orientation code of a JPEG buffer.
pub fn extract_orientation(bytes: &[u8]) -> OrientationCode {
    let scan = scan_orientation(bytes);
    let code = OrientationCode::from(scan);
    debug!(?scan, code = code.as_i32(), len = bytes.len(), "orientation scan");
    code
}

/// Read `source` and extract its orientation code.
pub async fn read_orientation<S: ImageSource>(source: &S) -> Result<OrientationCode, SourceError> {
    let bytes = source.read_bytes().await?;
    Ok(extract_orientation(&bytes))
}
