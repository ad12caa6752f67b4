//! Storage encodings for feature geometry.

use std::fmt;

/// Form in which a feature's geometry travels to and from storage.
///
/// The storage layer persists [`Wkt`](Self::Wkt) as text and both
/// [`Wkb`](Self::Wkb) and [`Blob`](Self::Blob) as bytes. The encoding is not
/// recorded per row; it is implied by the insert path and chosen again for
/// every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GeometryEncoding {
    /// Well-known text.
    Wkt,
    /// Well-known binary.
    Wkb,
    /// Engine-native blob; see [`crate::blob`].
    Blob,
    /// An already parsed [`geo::Geometry`] with no serialised form.
    Geometry,
}

impl GeometryEncoding {
    /// Whether rows can be written and read back in this encoding.
    ///
    /// # Examples
    /// ```
    /// use geofeature_core::GeometryEncoding;
    ///
    /// assert!(GeometryEncoding::Wkb.is_storable());
    /// assert!(!GeometryEncoding::Geometry.is_storable());
    /// ```
    pub const fn is_storable(self) -> bool {
        !matches!(self, Self::Geometry)
    }
}

impl fmt::Display for GeometryEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Wkt => "WKT",
            Self::Wkb => "WKB",
            Self::Blob => "blob",
            Self::Geometry => "geometry",
        };
        f.write_str(label)
    }
}
