//! SQLite layout for groups, styles and features.
//!
//! Table and column names are part of the on-disk contract shared with other
//! readers of the catalog and must not change.

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Version recorded in `geofeature_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Feature table.
pub const TABLE_GEO: &str = "geometry";
/// Group table.
pub const TABLE_GROUP: &str = "groups";
/// Style table.
pub const TABLE_STYLE: &str = "styles";

/// Feature identifier.
pub const COLUMN_GEO_ID: &str = "id";
/// Owning catalog entry of a feature.
pub const COLUMN_GEO_CATALOG_ID: &str = "catalog_id";
/// Group a feature belongs to.
pub const COLUMN_GEO_GROUP_ID: &str = "group_id";
/// Style of a feature, `0` for none.
pub const COLUMN_GEO_STYLE_ID: &str = "style_id";
/// Edit counter of a feature.
pub const COLUMN_GEO_VERSION: &str = "version";
/// Feature name.
pub const COLUMN_GEO_NAME: &str = "name";
/// Geometry payload (text for WKT, bytes otherwise).
pub const COLUMN_GEO_SPATIAL_GEOMETRY: &str = "spatial_geometry";
/// Finest display resolution of a feature.
pub const COLUMN_GEO_MAX_GSD: &str = "max_gsd";
/// Coarsest display resolution of a feature.
pub const COLUMN_GEO_MIN_GSD: &str = "min_gsd";
/// Feature visibility flag.
pub const COLUMN_GEO_VISIBILITY: &str = "visibility";
/// Visibility change counter of a feature.
pub const COLUMN_GEO_VISIBILITY_VERSION: &str = "visibility_version";

/// Group identifier.
pub const COLUMN_GROUP_ID: &str = "id";
/// Owning catalog entry of a group.
pub const COLUMN_GROUP_CATALOG_ID: &str = "catalog_id";
/// Edit counter of a group.
pub const COLUMN_GROUP_VERSION: &str = "version";
/// Group name.
pub const COLUMN_GROUP_NAME: &str = "name";
/// Provider that produced the group.
pub const COLUMN_GROUP_PROVIDER: &str = "provider";
/// Provider-specific type of the group.
pub const COLUMN_GROUP_TYPE: &str = "type";
/// Finest display resolution of a group.
pub const COLUMN_GROUP_MAX_GSD: &str = "max_gsd";
/// Coarsest display resolution of a group.
pub const COLUMN_GROUP_MIN_GSD: &str = "min_gsd";
/// Group visibility flag.
pub const COLUMN_GROUP_VISIBILITY: &str = "visibility";
/// Set when member features disagree with the group's visibility.
pub const COLUMN_GROUP_VISIBILITY_CHECK: &str = "visibility_check";
/// Visibility change counter of a group.
pub const COLUMN_GROUP_VISIBILITY_VERSION: &str = "visibility_version";

/// Style identifier.
pub const COLUMN_STYLE_ID: &str = "id";
/// Owning catalog entry of a style.
pub const COLUMN_STYLE_CATALOG_ID: &str = "catalog_id";
/// Optional style name.
pub const COLUMN_STYLE_NAME: &str = "name";
/// Opaque style representation.
pub const COLUMN_STYLE_REPRESENTATION: &str = "representation";

/// Errors raised when installing the catalog schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Enabling foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A migration statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Step that failed.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible release.
    #[error(
        "expected feature schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build writes.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}

/// Install the catalog schema inside an existing SQLite database.
///
/// Enables foreign keys so deleting a group cascades to its features, then
/// creates tables, indexes and visibility triggers in one transaction.
/// Existing databases must already carry [`SCHEMA_VERSION`].
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use geofeature_store::schema::{SCHEMA_VERSION, initialise_schema};
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("install schema");
/// let version: i64 = conn
///     .query_row("SELECT version FROM geofeature_schema_version", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, SCHEMA_VERSION);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SchemaError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    create_indexes(&transaction)?;
    create_triggers(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create groups",
        "CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalog_id INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1,
            name TEXT NOT NULL,
            provider TEXT NOT NULL,
            type TEXT NOT NULL,
            min_gsd REAL NOT NULL DEFAULT 0 CHECK (min_gsd >= 0),
            max_gsd REAL NOT NULL DEFAULT 0 CHECK (max_gsd >= 0),
            visibility INTEGER NOT NULL DEFAULT 1,
            visibility_check INTEGER NOT NULL DEFAULT 0,
            visibility_version INTEGER NOT NULL DEFAULT 0
        )",
    )?;
    run_migration_step(
        transaction,
        "create styles",
        "CREATE TABLE IF NOT EXISTS styles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalog_id INTEGER NOT NULL DEFAULT 0,
            name TEXT,
            representation TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create geometry",
        "CREATE TABLE IF NOT EXISTS geometry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalog_id INTEGER NOT NULL DEFAULT 0,
            group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            style_id INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1,
            name TEXT NOT NULL,
            spatial_geometry,
            max_gsd REAL NOT NULL DEFAULT 0 CHECK (max_gsd >= 0),
            min_gsd REAL NOT NULL DEFAULT 0 CHECK (min_gsd >= 0),
            visibility INTEGER NOT NULL DEFAULT 1,
            visibility_version INTEGER NOT NULL DEFAULT 0
        )",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index geometry by group",
        "CREATE INDEX IF NOT EXISTS idx_geometry_group ON geometry(group_id)",
    )?;
    run_migration_step(
        transaction,
        "index geometry by catalog",
        "CREATE INDEX IF NOT EXISTS idx_geometry_catalog ON geometry(catalog_id)",
    )?;
    run_migration_step(
        transaction,
        "index groups by catalog and name",
        "CREATE INDEX IF NOT EXISTS idx_groups_catalog_name ON groups(catalog_id, name)",
    )?;
    run_migration_step(
        transaction,
        "index styles by catalog",
        "CREATE INDEX IF NOT EXISTS idx_styles_catalog ON styles(catalog_id)",
    )
}

// Group visibility propagates to member features, which in turn must not flag
// the group as mixed; the group trigger therefore clears visibility_check last.
fn create_triggers(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create feature visibility trigger",
        "CREATE TRIGGER IF NOT EXISTS geometry_visibility_update
            AFTER UPDATE OF visibility ON geometry
            WHEN OLD.visibility != NEW.visibility
            BEGIN
                UPDATE geometry
                    SET visibility_version = OLD.visibility_version + 1
                    WHERE id = NEW.id;
                UPDATE groups
                    SET visibility_check = 1
                    WHERE id = NEW.group_id AND visibility != NEW.visibility;
            END",
    )?;
    run_migration_step(
        transaction,
        "create group visibility trigger",
        "CREATE TRIGGER IF NOT EXISTS groups_visibility_update
            AFTER UPDATE OF visibility ON groups
            WHEN OLD.visibility != NEW.visibility
            BEGIN
                UPDATE geometry
                    SET visibility = NEW.visibility
                    WHERE group_id = NEW.id AND visibility != NEW.visibility;
                UPDATE groups
                    SET visibility_version = OLD.visibility_version + 1,
                        visibility_check = 0
                    WHERE id = NEW.id;
            END",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS geofeature_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM geofeature_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(SchemaError::VersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            });
        }
        None => {
            transaction
                .execute(
                    "INSERT INTO geofeature_schema_version (version) VALUES (?1)",
                    [SCHEMA_VERSION],
                )
                .map_err(|source| SchemaError::Migration {
                    step: "record schema version",
                    source,
                })?;
        }
    }

    Ok(())
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn connection() -> Connection {
        let mut connection = Connection::open_in_memory().expect("open in-memory database");
        initialise_schema(&mut connection).expect("install schema");
        connection
    }

    fn columns(connection: &Connection, table: &str) -> Vec<String> {
        let mut statement = connection
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        statement
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info")
            .collect::<Result<_, _>>()
            .expect("collect columns")
    }

    #[rstest]
    fn tables_match_column_contract(connection: Connection) {
        assert_eq!(
            columns(&connection, TABLE_GROUP),
            [
                COLUMN_GROUP_ID,
                COLUMN_GROUP_CATALOG_ID,
                COLUMN_GROUP_VERSION,
                COLUMN_GROUP_NAME,
                COLUMN_GROUP_PROVIDER,
                COLUMN_GROUP_TYPE,
                COLUMN_GROUP_MIN_GSD,
                COLUMN_GROUP_MAX_GSD,
                COLUMN_GROUP_VISIBILITY,
                COLUMN_GROUP_VISIBILITY_CHECK,
                COLUMN_GROUP_VISIBILITY_VERSION,
            ]
        );
        assert_eq!(
            columns(&connection, TABLE_STYLE),
            [
                COLUMN_STYLE_ID,
                COLUMN_STYLE_CATALOG_ID,
                COLUMN_STYLE_NAME,
                COLUMN_STYLE_REPRESENTATION,
            ]
        );
        assert_eq!(
            columns(&connection, TABLE_GEO),
            [
                COLUMN_GEO_ID,
                COLUMN_GEO_CATALOG_ID,
                COLUMN_GEO_GROUP_ID,
                COLUMN_GEO_STYLE_ID,
                COLUMN_GEO_VERSION,
                COLUMN_GEO_NAME,
                COLUMN_GEO_SPATIAL_GEOMETRY,
                COLUMN_GEO_MAX_GSD,
                COLUMN_GEO_MIN_GSD,
                COLUMN_GEO_VISIBILITY,
                COLUMN_GEO_VISIBILITY_VERSION,
            ]
        );
    }

    #[rstest]
    fn initialisation_is_idempotent(mut connection: Connection) {
        initialise_schema(&mut connection).expect("reinstall schema");
        let versions: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM geofeature_schema_version",
                [],
                |row| row.get(0),
            )
            .expect("count versions");
        assert_eq!(versions, 1);
    }

    #[rstest]
    fn rejects_foreign_schema_version(mut connection: Connection) {
        connection
            .execute(
                "UPDATE geofeature_schema_version SET version = ?1",
                [SCHEMA_VERSION + 1],
            )
            .expect("bump version");
        let err = initialise_schema(&mut connection).expect_err("mismatch should fail");
        assert!(matches!(
            err,
            SchemaError::VersionMismatch { expected, found }
                if expected == SCHEMA_VERSION && found == SCHEMA_VERSION + 1
        ));
    }

    #[rstest]
    fn group_visibility_propagates_to_features(connection: Connection) {
        connection
            .execute_batch(
                "INSERT INTO groups (name, provider, type) VALUES ('g', 'p', 't');
                 INSERT INTO geometry (group_id, name, spatial_geometry) VALUES (1, 'a', 'POINT(0 0)');
                 INSERT INTO geometry (group_id, name, spatial_geometry) VALUES (1, 'b', 'POINT(1 1)');
                 UPDATE geometry SET visibility = 0 WHERE name = 'a';",
            )
            .expect("seed rows");

        let check: i64 = connection
            .query_row("SELECT visibility_check FROM groups WHERE id = 1", [], |row| {
                row.get(0)
            })
            .expect("read check flag");
        assert_eq!(check, 1, "mixed visibility should flag the group");

        connection
            .execute("UPDATE groups SET visibility = 0 WHERE id = 1", [])
            .expect("hide group");

        let (check, version): (i64, i64) = connection
            .query_row(
                "SELECT visibility_check, visibility_version FROM groups WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("read group");
        assert_eq!((check, version), (0, 1));

        let hidden: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM geometry WHERE visibility = 0",
                [],
                |row| row.get(0),
            )
            .expect("count hidden");
        assert_eq!(hidden, 2);
    }

    #[rstest]
    fn deleting_group_cascades_to_features(connection: Connection) {
        connection
            .execute_batch(
                "INSERT INTO groups (name, provider, type) VALUES ('g', 'p', 't');
                 INSERT INTO geometry (group_id, name, spatial_geometry) VALUES (1, 'a', 'POINT(0 0)');
                 DELETE FROM groups WHERE id = 1;",
            )
            .expect("seed and delete");
        let remaining: i64 = connection
            .query_row("SELECT COUNT(*) FROM geometry", [], |row| row.get(0))
            .expect("count features");
        assert_eq!(remaining, 0);
    }
}
