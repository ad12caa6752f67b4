//! Geometry and feature-definition layer for the geofeature catalog.
//!
//! Responsibilities:
//! - Describe features as a name, a raw geometry payload and an optional
//!   style representation.
//! - Parse and write the supported payload encodings (WKT, WKB and the
//!   engine-native blob).
//! - Validate display resolution ranges before they reach storage.
//!
//! Boundaries:
//! - No storage concerns; `geofeature-store` owns the SQLite schema.
//! - No geometry algorithms beyond encoding conversion.
#![forbid(unsafe_code)]

pub mod blob;
mod codec;
mod definition;
mod encoding;
mod error;
mod ids;
mod resolution;

pub use definition::{FeatureDefinition, RawGeometry};
pub use encoding::GeometryEncoding;
pub use error::{GeometryError, ResolutionError};
pub use ids::{CatalogId, FeatureId, GroupId, StyleId};
pub use resolution::ResolutionRange;

pub use geo::Geometry;
