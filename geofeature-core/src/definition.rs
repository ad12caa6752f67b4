//! Feature definitions: a name, a raw geometry payload and an optional style.

use geo::Geometry;

use crate::blob::{DEFAULT_SRID, decode_blob, encode_blob};
use crate::codec::{parse_wkb, parse_wkt, write_wkb, write_wkt};
use crate::{GeometryEncoding, GeometryError};

/// Geometry payload in the form it was supplied or read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// Well-known text.
    Wkt(String),
    /// Well-known binary.
    Wkb(Vec<u8>),
    /// Engine-native blob, see [`crate::blob`].
    Blob(Vec<u8>),
    /// Parsed geometry with no serialised form.
    Geometry(Geometry<f64>),
}

impl RawGeometry {
    /// Encoding implied by the payload variant.
    pub const fn encoding(&self) -> GeometryEncoding {
        match self {
            Self::Wkt(_) => GeometryEncoding::Wkt,
            Self::Wkb(_) => GeometryEncoding::Wkb,
            Self::Blob(_) => GeometryEncoding::Blob,
            Self::Geometry(_) => GeometryEncoding::Geometry,
        }
    }

    /// Whether the serialised payload carries no data.
    ///
    /// Parsed geometries are never considered empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Wkt(text) => text.trim().is_empty(),
            Self::Wkb(bytes) | Self::Blob(bytes) => bytes.is_empty(),
            Self::Geometry(_) => false,
        }
    }
}

/// A feature ready to be stored, or reconstructed from a query row.
///
/// The geometry stays in its raw encoding until [`FeatureDefinition::geometry`]
/// is called, so reading a row costs a copy of the payload and nothing more.
///
/// # Examples
/// ```
/// use geo::{Geometry, Point};
/// use geofeature_core::{FeatureDefinition, GeometryEncoding};
///
/// let definition = FeatureDefinition::from_wkt("summit", "POINT(7.5 46.0)")
///     .with_style("symbol: triangle");
/// assert_eq!(definition.encoding(), GeometryEncoding::Wkt);
/// assert_eq!(definition.style(), Some("symbol: triangle"));
/// assert_eq!(
///     definition.geometry().expect("valid WKT"),
///     Geometry::Point(Point::new(7.5, 46.0)),
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDefinition {
    name: String,
    geometry: RawGeometry,
    style: Option<String>,
}

impl FeatureDefinition {
    /// Build a definition from any raw payload.
    pub fn new(name: impl Into<String>, geometry: RawGeometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            style: None,
        }
    }

    /// Definition carrying well-known text.
    pub fn from_wkt(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, RawGeometry::Wkt(text.into()))
    }

    /// Definition carrying well-known binary.
    pub fn from_wkb(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, RawGeometry::Wkb(bytes.into()))
    }

    /// Definition carrying an engine-native blob.
    pub fn from_blob(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, RawGeometry::Blob(bytes.into()))
    }

    /// Definition carrying an already parsed geometry.
    pub fn from_geometry(name: impl Into<String>, geometry: Geometry<f64>) -> Self {
        Self::new(name, RawGeometry::Geometry(geometry))
    }

    /// Attach an opaque style representation.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Replace or clear the style representation.
    #[must_use]
    pub fn with_optional_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }

    /// Feature name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Style representation, if any.
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    /// Encoding of the raw payload.
    pub const fn encoding(&self) -> GeometryEncoding {
        self.geometry.encoding()
    }

    /// Raw geometry payload.
    pub const fn raw_geometry(&self) -> &RawGeometry {
        &self.geometry
    }

    /// Whether the raw payload carries no geometry.
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Consume the definition, returning name, payload and style.
    pub fn into_parts(self) -> (String, RawGeometry, Option<String>) {
        (self.name, self.geometry, self.style)
    }

    /// Parse the raw payload into a geometry.
    pub fn geometry(&self) -> Result<Geometry<f64>, GeometryError> {
        if self.geometry.is_empty() {
            return Err(GeometryError::EmptyPayload {
                encoding: self.encoding(),
            });
        }
        match &self.geometry {
            RawGeometry::Wkt(text) => parse_wkt(text),
            RawGeometry::Wkb(bytes) => parse_wkb(bytes),
            RawGeometry::Blob(bytes) => decode_blob(bytes).map(|(_, geometry)| geometry),
            RawGeometry::Geometry(geometry) => Ok(geometry.clone()),
        }
    }

    /// Re-encode the payload, keeping name and style.
    ///
    /// Blobs produced here carry [`DEFAULT_SRID`].
    pub fn to_encoding(&self, encoding: GeometryEncoding) -> Result<Self, GeometryError> {
        if self.encoding() == encoding {
            return Ok(self.clone());
        }
        let geometry = self.geometry()?;
        let raw = match encoding {
            GeometryEncoding::Wkt => RawGeometry::Wkt(write_wkt(&geometry)),
            GeometryEncoding::Wkb => RawGeometry::Wkb(write_wkb(&geometry)?),
            GeometryEncoding::Blob => RawGeometry::Blob(encode_blob(&geometry, DEFAULT_SRID)?),
            GeometryEncoding::Geometry => RawGeometry::Geometry(geometry),
        };
        Ok(Self {
            name: self.name.clone(),
            geometry: raw,
            style: self.style.clone(),
        })
    }
}
