//! Error types produced by the geometry layer.

use thiserror::Error;

use crate::GeometryEncoding;

/// Errors raised when decoding or encoding feature geometry.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum GeometryError {
    /// The raw geometry payload was empty.
    #[error("{encoding} geometry payload is empty")]
    EmptyPayload {
        /// Encoding of the empty payload.
        encoding: GeometryEncoding,
    },
    /// Well-known text could not be parsed.
    #[error("invalid WKT geometry: {message}")]
    Wkt {
        /// Parser diagnostic.
        message: String,
    },
    /// Well-known binary could not be read or written.
    #[error("invalid WKB geometry: {message}")]
    Wkb {
        /// Reader or writer diagnostic.
        message: String,
    },
    /// The blob was shorter than its fixed header.
    #[error("geometry blob truncated: expected at least {expected} bytes, found {found}")]
    TruncatedBlob {
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes available.
        found: usize,
    },
    /// The blob did not start with the expected magic bytes.
    #[error("invalid geometry blob magic: expected {expected:?}, found {found:?}")]
    InvalidBlobMagic {
        /// Magic identifying an engine-native blob.
        expected: [u8; 4],
        /// Bytes read from the payload.
        found: [u8; 4],
    },
    /// The blob header carried an unknown format version.
    #[error("unsupported geometry blob version {found}; supported version is {supported}")]
    UnsupportedBlobVersion {
        /// Version present in the header.
        found: u16,
        /// Version understood by this build.
        supported: u16,
    },
    /// The requested conversion has no serialised form.
    #[error("geometry cannot be converted to {encoding}")]
    UnsupportedEncoding {
        /// Requested target encoding.
        encoding: GeometryEncoding,
    },
}

/// Errors raised by [`ResolutionRange::validate`](crate::ResolutionRange::validate).
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ResolutionError {
    /// A bound was negative.
    #[error("{bound} resolution must not be negative (got {value})")]
    Negative {
        /// Which bound failed.
        bound: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A bound was NaN or infinite.
    #[error("{bound} resolution must be finite (got {value})")]
    NotFinite {
        /// Which bound failed.
        bound: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Both bounds were set but the minimum was finer than the maximum.
    #[error(
        "minimum resolution {min} m/px must be coarser than or equal to maximum resolution {max} m/px"
    )]
    Inverted {
        /// Coarsest bound supplied.
        min: f64,
        /// Finest bound supplied.
        max: f64,
    },
}
