//! Version introspection for the SpatiaLite extension.
//!
//! Diagnostic only: nothing in the store depends on SpatiaLite being loaded.

use std::fmt;

use rusqlite::{Connection, Error as SqliteError, ErrorCode};
use thiserror::Error;

/// Message SQLite reports when `spatialite_version()` is not registered.
const MISSING_VERSION_FUNCTION: &str = "no such function: spatialite_version";

/// `major.minor` version of the loaded SpatiaLite extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpatialIndexVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl fmt::Display for SpatialIndexVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Errors raised while probing the SpatiaLite version.
#[derive(Debug, Error)]
pub enum SpatialIndexVersionError {
    /// `spatialite_version()` is not registered on the connection.
    #[error("SpatiaLite is not loaded on this connection")]
    NotInstalled,
    /// The reported version does not start with `major.minor`.
    #[error("unrecognised SpatiaLite version string '{reported}'")]
    Malformed {
        /// Text returned by `spatialite_version()`.
        reported: String,
    },
    /// Running the version query failed for another reason.
    #[error("failed to query SpatiaLite version")]
    Database {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Report the SpatiaLite version loaded into `connection`.
///
/// # Examples
/// ```
/// use geofeature_store::{SpatialIndexVersionError, spatial_index_version};
/// use rusqlite::Connection;
///
/// let conn = Connection::open_in_memory().expect("open database");
/// assert!(matches!(
///     spatial_index_version(&conn),
///     Err(SpatialIndexVersionError::NotInstalled)
/// ));
/// ```
pub fn spatial_index_version(
    connection: &Connection,
) -> Result<SpatialIndexVersion, SpatialIndexVersionError> {
    let reported: String = connection
        .query_row("SELECT spatialite_version()", [], |row| row.get(0))
        .map_err(|source| {
            if is_missing_function(&source) {
                SpatialIndexVersionError::NotInstalled
            } else {
                SpatialIndexVersionError::Database { source }
            }
        })?;
    parse_version(&reported).ok_or(SpatialIndexVersionError::Malformed { reported })
}

fn is_missing_function(err: &SqliteError) -> bool {
    matches!(
        err,
        SqliteError::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::Unknown && message == MISSING_VERSION_FUNCTION
    )
}

fn parse_version(reported: &str) -> Option<SpatialIndexVersion> {
    let mut parts = reported.trim().split(|c: char| !c.is_ascii_digit());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some(SpatialIndexVersion { major, minor })
}
