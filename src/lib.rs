//! Facade crate for the geofeature catalog.
//!
//! This crate re-exports the geometry and feature-definition types and, behind
//! the `store-sqlite` feature, the SQLite-backed feature store.

#![forbid(unsafe_code)]

pub use geofeature_core::{
    CatalogId, FeatureDefinition, FeatureId, Geometry, GeometryEncoding, GeometryError, GroupId,
    RawGeometry, ResolutionError, ResolutionRange, StyleId, blob,
};

#[cfg(feature = "store-sqlite")]
pub use geofeature_store::{
    CursorReadError, ErrorKind, FeatureCursor, FeatureQuery, FeatureStore, FeatureStoreConfig,
    FeatureStoreError, InvalidArgumentError, SchemaError, SpatialIndexVersion,
    SpatialIndexVersionError, Transaction, TransactionEngine, TransactionMisuse,
    TransactionScope, schema, spatial_index_version,
};
