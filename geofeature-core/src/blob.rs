//! Engine-native geometry blob format.
//!
//! A blob is a fixed header followed by a well-known binary body:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | magic `GFGB` |
//! | 4 | 2 | format version, little endian |
//! | 6 | 4 | SRID, little endian |
//! | 10 | … | WKB geometry |
//!
//! Keeping the SRID in the header lets a catalog carry geometries from more
//! than one reference system in the same column.

use geo::Geometry;

use crate::GeometryError;
use crate::codec::{parse_wkb, write_wkb};

/// File identifier for engine-native geometry blobs.
pub const BLOB_MAGIC: [u8; 4] = *b"GFGB";

/// Supported version of the blob format.
pub const BLOB_VERSION: u16 = 1;

/// SRID assumed when a caller does not supply one (WGS84).
pub const DEFAULT_SRID: i32 = 4326;

const HEADER_LEN: usize = 10;

/// Decoded blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    /// Format version.
    pub version: u16,
    /// Spatial reference identifier of the body.
    pub srid: i32,
}

/// Encode a geometry as an engine-native blob.
///
/// # Examples
/// ```
/// use geo::{Geometry, Point};
/// use geofeature_core::blob::{DEFAULT_SRID, decode_blob, encode_blob};
///
/// let point = Geometry::Point(Point::new(1.0, 2.0));
/// let blob = encode_blob(&point, DEFAULT_SRID).expect("encode blob");
/// let (header, decoded) = decode_blob(&blob).expect("decode blob");
/// assert_eq!(header.srid, DEFAULT_SRID);
/// assert_eq!(decoded, point);
/// ```
pub fn encode_blob(geometry: &Geometry<f64>, srid: i32) -> Result<Vec<u8>, GeometryError> {
    let body = write_wkb(geometry)?;
    let mut blob = Vec::with_capacity(HEADER_LEN + body.len());
    blob.extend_from_slice(&BLOB_MAGIC);
    blob.extend_from_slice(&BLOB_VERSION.to_le_bytes());
    blob.extend_from_slice(&srid.to_le_bytes());
    blob.extend_from_slice(&body);
    Ok(blob)
}

/// Validate and return the header of an engine-native blob.
pub fn read_header(blob: &[u8]) -> Result<BlobHeader, GeometryError> {
    let Some((header, _)) = split_blob(blob) else {
        return Err(GeometryError::TruncatedBlob {
            expected: HEADER_LEN,
            found: blob.len(),
        });
    };
    let (magic, rest) = header.split_at(4);
    let (version_bytes, srid_bytes) = rest.split_at(2);

    let mut found = [0_u8; 4];
    found.copy_from_slice(magic);
    if found != BLOB_MAGIC {
        return Err(GeometryError::InvalidBlobMagic {
            expected: BLOB_MAGIC,
            found,
        });
    }

    let mut version = [0_u8; 2];
    version.copy_from_slice(version_bytes);
    let version = u16::from_le_bytes(version);
    if version != BLOB_VERSION {
        return Err(GeometryError::UnsupportedBlobVersion {
            found: version,
            supported: BLOB_VERSION,
        });
    }

    let mut srid = [0_u8; 4];
    srid.copy_from_slice(srid_bytes);
    Ok(BlobHeader {
        version,
        srid: i32::from_le_bytes(srid),
    })
}

/// Decode an engine-native blob into its header and geometry.
pub fn decode_blob(blob: &[u8]) -> Result<(BlobHeader, Geometry<f64>), GeometryError> {
    let header = read_header(blob)?;
    let body = split_blob(blob).map_or(&[][..], |(_, body)| body);
    let geometry = parse_wkb(body)?;
    Ok((header, geometry))
}

fn split_blob(blob: &[u8]) -> Option<(&[u8], &[u8])> {
    (blob.len() >= HEADER_LEN).then(|| blob.split_at(HEADER_LEN))
}
