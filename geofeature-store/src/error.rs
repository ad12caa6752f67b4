//! Error types emitted by the feature store.
//!
//! Every failure maps onto one of four [`ErrorKind`]s so callers can branch on
//! the category without matching each variant.

use camino::Utf8PathBuf;
use geofeature_core::{GeometryEncoding, GeometryError, ResolutionError};
use rusqlite::Error as SqliteError;
use thiserror::Error;

use crate::schema::SchemaError;

/// Broad category of a [`FeatureStoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A caller-supplied value violated a precondition.
    InvalidArgument,
    /// The nested transaction protocol was violated.
    TransactionMisuse,
    /// A query row could not be read.
    CursorRead,
    /// SQLite or the filesystem reported a failure.
    StorageFailure,
}

/// Errors returned by [`FeatureStore`](crate::FeatureStore) and its cursors.
#[derive(Debug, Error)]
pub enum FeatureStoreError {
    /// A caller-supplied value violated a precondition; nothing was written.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgumentError),
    /// The nested transaction protocol was violated; state is unchanged.
    #[error("transaction misuse: {0}")]
    TransactionMisuse(#[from] TransactionMisuse),
    /// A query row could not be read or decoded.
    #[error("cursor read failed: {0}")]
    CursorRead(#[from] CursorReadError),
    /// A statement failed inside SQLite.
    #[error("failed to {operation}")]
    Storage {
        /// What the store was doing.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open feature database at {path}")]
    Open {
        /// Location of the database on disk.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the parent directory of the database failed.
    #[error("failed to create parent directory {path}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Installing or checking the schema failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl FeatureStoreError {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::TransactionMisuse(_) => ErrorKind::TransactionMisuse,
            Self::CursorRead(_) => ErrorKind::CursorRead,
            Self::Storage { .. }
            | Self::Open { .. }
            | Self::CreateDirectory { .. }
            | Self::Schema(_) => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn storage(operation: &'static str) -> impl Fn(SqliteError) -> Self {
        move |source| Self::Storage { operation, source }
    }
}

/// Precondition violations detected before any statement runs.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidArgumentError {
    /// The display resolution range was rejected.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// A required text field was empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The feature definition carried no geometry.
    #[error("feature '{name}' has an empty {encoding} geometry payload")]
    EmptyGeometry {
        /// Feature name.
        name: String,
        /// Encoding of the empty payload.
        encoding: GeometryEncoding,
    },
    /// The encoding has no insert path or cannot be materialised by a cursor.
    #[error("{encoding} encoding is not supported for {operation}")]
    UnsupportedEncoding {
        /// Rejected encoding.
        encoding: GeometryEncoding,
        /// Operation that rejected it.
        operation: &'static str,
    },
    /// An engine-native blob failed header validation.
    #[error("feature '{name}' carries an invalid geometry blob: {source}")]
    InvalidBlob {
        /// Feature name.
        name: String,
        /// Header validation failure.
        #[source]
        source: GeometryError,
    },
}

/// Violations of the nested transaction protocol.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMisuse {
    /// The call came from a thread other than the one that began the
    /// outermost transaction.
    #[error("transaction begun on a different thread")]
    WrongThread,
    /// No transaction is open.
    #[error("no transaction is in effect")]
    NoTransaction,
    /// The innermost open transaction was already marked successful.
    #[error("transaction already marked successful")]
    AlreadySuccessful,
}

/// Failures reading query rows.
#[derive(Debug, Error)]
pub enum CursorReadError {
    /// The cursor is not positioned on a row.
    #[error("no current row")]
    NoCurrentRow,
    /// The selection did not produce a required column.
    #[error("query result has no '{column}' column")]
    MissingColumn {
        /// Column name looked up.
        column: &'static str,
    },
    /// A required column held NULL.
    #[error("column '{column}' is NULL for feature {id}")]
    NullColumn {
        /// Column name.
        column: &'static str,
        /// Feature id of the row.
        id: i64,
    },
    /// The geometry column's storage type does not match the cursor's encoding.
    #[error("column '{column}' of feature {id} does not hold {encoding} data")]
    EncodingMismatch {
        /// Column name.
        column: &'static str,
        /// Feature id of the row.
        id: i64,
        /// Encoding fixed for the cursor.
        encoding: GeometryEncoding,
    },
    /// A column could not be converted to its Rust type.
    #[error("failed to read column '{column}'")]
    Column {
        /// Column name.
        column: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Stepping the underlying row cursor failed.
    #[error("failed to advance cursor")]
    Step {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The geometry payload could not be parsed.
    #[error("failed to decode geometry of feature {id}")]
    Decode {
        /// Feature id of the row.
        id: i64,
        /// Parser failure.
        #[source]
        source: GeometryError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn kinds_follow_variants() {
        let invalid = FeatureStoreError::from(InvalidArgumentError::EmptyField { field: "name" });
        assert_eq!(invalid.kind(), ErrorKind::InvalidArgument);

        let misuse = FeatureStoreError::from(TransactionMisuse::WrongThread);
        assert_eq!(misuse.kind(), ErrorKind::TransactionMisuse);
        assert_eq!(
            misuse.to_string(),
            "transaction misuse: transaction begun on a different thread"
        );

        let cursor = FeatureStoreError::from(CursorReadError::NoCurrentRow);
        assert_eq!(cursor.kind(), ErrorKind::CursorRead);

        let storage = FeatureStoreError::storage("insert group")(SqliteError::InvalidQuery);
        assert_eq!(storage.kind(), ErrorKind::StorageFailure);
    }
}
