//! SQLite storage for the geofeature catalog.
//!
//! Responsibilities:
//! - Install and check the group, style and feature tables.
//! - Insert and delete catalog rows, validating arguments before any
//!   statement runs.
//! - Bracket multi-step mutations in nested, thread-affine transaction scopes
//!   that share one SQLite transaction.
//! - Read features back through cursors bound to a single geometry encoding.
//!
//! Boundaries:
//! - Geometry parsing lives in `geofeature-core`.
//! - No logger is installed; records go through the `log` facade.
#![forbid(unsafe_code)]

mod config;
mod cursor;
mod error;
mod guard;
pub mod schema;
mod store;
mod transaction;
mod version;

pub use config::FeatureStoreConfig;
pub use cursor::{COLUMN_STYLE, FeatureCursor, FeatureQuery};
pub use error::{
    CursorReadError, ErrorKind, FeatureStoreError, InvalidArgumentError, TransactionMisuse,
};
pub use guard::Transaction;
pub use schema::SchemaError;
pub use store::FeatureStore;
pub use transaction::{TransactionEngine, TransactionScope};
pub use version::{SpatialIndexVersion, SpatialIndexVersionError, spatial_index_version};

pub use geofeature_core::{
    CatalogId, FeatureDefinition, FeatureId, GeometryEncoding, GroupId, RawGeometry,
    ResolutionRange, StyleId,
};
