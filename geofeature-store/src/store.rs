//! The feature catalog facade.
//!
//! [`FeatureStore`] owns one SQLite connection, keeps the insert statements
//! for the hot paths compiled in the connection's statement cache, and owns
//! the [`TransactionScope`] that brackets multi-step mutations.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use geofeature_core::{
    CatalogId, FeatureDefinition, FeatureId, GeometryEncoding, GroupId, RawGeometry,
    ResolutionRange, StyleId, blob,
};
use log::debug;
use rusqlite::types::ToSql;
use rusqlite::{Connection, params, params_from_iter};

use crate::config::{FeatureStoreConfig, STORE_STATEMENT_COUNT};
use crate::cursor::FeatureQuery;
use crate::error::{FeatureStoreError, InvalidArgumentError};
use crate::schema::initialise_schema;
use crate::transaction::TransactionScope;
use crate::version::{SpatialIndexVersion, SpatialIndexVersionError, spatial_index_version};

const INSERT_GROUP: &str = "INSERT INTO groups (catalog_id, provider, type, name, min_gsd, max_gsd) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const INSERT_STYLE: &str = "INSERT INTO styles (catalog_id, name, representation) VALUES (?1, NULL, ?2)";
const INSERT_FEATURE_BLOB: &str = "INSERT INTO geometry \
     (catalog_id, group_id, style_id, name, spatial_geometry, min_gsd, max_gsd) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
const INSERT_FEATURE_WKB: &str = "INSERT INTO geometry \
     (catalog_id, group_id, style_id, name, spatial_geometry, min_gsd, max_gsd) \
     VALUES (?1, ?2, ?3, ?4, CAST(?5 AS BLOB), ?6, ?7)";
const INSERT_FEATURE_WKT: &str = "INSERT INTO geometry \
     (catalog_id, group_id, style_id, name, spatial_geometry, min_gsd, max_gsd) \
     VALUES (?1, ?2, ?3, ?4, CAST(?5 AS TEXT), ?6, ?7)";

const STORE_STATEMENTS: [&str; STORE_STATEMENT_COUNT] = [
    INSERT_FEATURE_BLOB,
    INSERT_STYLE,
    INSERT_FEATURE_WKB,
    INSERT_FEATURE_WKT,
];

const SELECT_FEATURES: &str = "SELECT geometry.id AS id, geometry.name AS name, \
     geometry.spatial_geometry AS spatial_geometry, styles.representation AS style, \
     geometry.min_gsd AS min_gsd, geometry.max_gsd AS max_gsd \
     FROM geometry LEFT JOIN styles ON styles.id = geometry.style_id";

const IN_MEMORY_PATH: &str = ":memory:";

/// Transactional storage for groups, styles and features.
///
/// Every mutation runs on the store's connection and joins whatever
/// transaction scope is open; outside a scope each statement commits on its
/// own.
///
/// # Examples
/// ```
/// use geofeature_store::{FeatureDefinition, FeatureStore, ResolutionRange};
///
/// let mut store = FeatureStore::open_in_memory().expect("open store");
/// store.begin_transaction().expect("begin");
/// let group = store
///     .add_group("osm", "rivers", "rhine", ResolutionRange::new(500.0, 2.0))
///     .expect("add group");
/// let style = store.add_style("stroke: blue").expect("add style");
/// store
///     .add_feature(
///         group,
///         &FeatureDefinition::from_wkt("rhine", "LINESTRING(8.5 47.6, 7.6 47.5)"),
///         Some(style),
///         ResolutionRange::UNBOUNDED,
///     )
///     .expect("add feature");
/// store.set_transaction_successful().expect("mark");
/// store.end_transaction().expect("commit");
/// ```
#[derive(Debug)]
pub struct FeatureStore {
    connection: Connection,
    transactions: TransactionScope,
}

impl FeatureStore {
    /// Open or create a catalog database at `path` with default settings.
    ///
    /// # Errors
    /// Fails when the parent directory cannot be created, the file cannot be
    /// opened, or the schema cannot be installed.
    pub fn open(path: &Utf8Path) -> Result<Self, FeatureStoreError> {
        Self::open_with_config(path, &FeatureStoreConfig::default())
    }

    /// Open or create a catalog database at `path`.
    ///
    /// Missing parent directories are created first.
    pub fn open_with_config(
        path: &Utf8Path,
        config: &FeatureStoreConfig,
    ) -> Result<Self, FeatureStoreError> {
        ensure_parent_dir(path)?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| FeatureStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection, config)
    }

    /// Open a private in-memory catalog with default settings.
    pub fn open_in_memory() -> Result<Self, FeatureStoreError> {
        Self::open_in_memory_with_config(&FeatureStoreConfig::default())
    }

    /// Open a private in-memory catalog.
    pub fn open_in_memory_with_config(
        config: &FeatureStoreConfig,
    ) -> Result<Self, FeatureStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| FeatureStoreError::Open {
                path: Utf8PathBuf::from(IN_MEMORY_PATH),
                source,
            })?;
        Self::from_connection(connection, config)
    }

    fn from_connection(
        mut connection: Connection,
        config: &FeatureStoreConfig,
    ) -> Result<Self, FeatureStoreError> {
        connection
            .busy_timeout(config.busy_timeout())
            .map_err(FeatureStoreError::storage("set busy timeout"))?;
        initialise_schema(&mut connection)?;

        connection.set_prepared_statement_cache_capacity(config.effective_cache_capacity());
        for sql in STORE_STATEMENTS {
            connection
                .prepare_cached(sql)
                .map_err(FeatureStoreError::storage("compile insert statement"))?;
        }

        Ok(Self {
            connection,
            transactions: TransactionScope::new(),
        })
    }

    /// Borrow the underlying connection.
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Add a group outside any catalog.
    pub fn add_group(
        &self,
        provider: &str,
        kind: &str,
        name: &str,
        resolution: ResolutionRange,
    ) -> Result<GroupId, FeatureStoreError> {
        self.add_catalog_group(CatalogId::NONE, provider, kind, name, resolution)
    }

    /// Add a group scoped to `catalog`.
    ///
    /// # Errors
    /// [`InvalidArgumentError`] when any string is empty or the resolution
    /// range is invalid; nothing is written in that case.
    pub fn add_catalog_group(
        &self,
        catalog: CatalogId,
        provider: &str,
        kind: &str,
        name: &str,
        resolution: ResolutionRange,
    ) -> Result<GroupId, FeatureStoreError> {
        resolution.validate().map_err(InvalidArgumentError::from)?;
        require_text("provider", provider)?;
        require_text("type", kind)?;
        require_text("name", name)?;

        let id = self
            .connection
            .prepare_cached(INSERT_GROUP)
            .and_then(|mut statement| {
                statement.insert(params![
                    catalog.get(),
                    provider,
                    kind,
                    name,
                    resolution.min,
                    resolution.max
                ])
            })
            .map_err(FeatureStoreError::storage("insert group"))?;
        debug!("added group {id} '{name}' to catalog {catalog}");
        Ok(GroupId::new(id))
    }

    /// Add a style outside any catalog.
    pub fn add_style(&self, representation: &str) -> Result<StyleId, FeatureStoreError> {
        self.add_catalog_style(CatalogId::NONE, representation)
    }

    /// Add a style scoped to `catalog`.
    ///
    /// # Errors
    /// [`InvalidArgumentError::EmptyField`] when `representation` is empty.
    pub fn add_catalog_style(
        &self,
        catalog: CatalogId,
        representation: &str,
    ) -> Result<StyleId, FeatureStoreError> {
        require_text("style representation", representation)?;
        let id = self
            .connection
            .prepare_cached(INSERT_STYLE)
            .and_then(|mut statement| statement.insert(params![catalog.get(), representation]))
            .map_err(FeatureStoreError::storage("insert style"))?;
        debug!("added style {id} to catalog {catalog}");
        Ok(StyleId::new(id))
    }

    /// Add a feature outside any catalog.
    pub fn add_feature(
        &self,
        group: GroupId,
        definition: &FeatureDefinition,
        style: Option<StyleId>,
        resolution: ResolutionRange,
    ) -> Result<FeatureId, FeatureStoreError> {
        self.add_catalog_feature(CatalogId::NONE, group, definition, style, resolution)
    }

    /// Add a feature to `group`, scoped to `catalog`.
    ///
    /// The geometry is written with the insert path matching the definition's
    /// encoding: WKT as text, WKB and engine-native blobs as bytes.
    ///
    /// # Errors
    /// [`InvalidArgumentError`] for an invalid resolution range, an empty
    /// payload, a parsed geometry with no serialised form, or a blob whose
    /// header does not validate.
    pub fn add_catalog_feature(
        &self,
        catalog: CatalogId,
        group: GroupId,
        definition: &FeatureDefinition,
        style: Option<StyleId>,
        resolution: ResolutionRange,
    ) -> Result<FeatureId, FeatureStoreError> {
        resolution.validate().map_err(InvalidArgumentError::from)?;
        let name = definition.name();
        let raw = definition.raw_geometry();
        if raw.is_empty() {
            return Err(InvalidArgumentError::EmptyGeometry {
                name: name.to_owned(),
                encoding: raw.encoding(),
            }
            .into());
        }

        let (sql, payload): (&str, &dyn ToSql) = match raw {
            RawGeometry::Wkt(text) => (INSERT_FEATURE_WKT, text as &dyn ToSql),
            RawGeometry::Wkb(bytes) => (INSERT_FEATURE_WKB, bytes as &dyn ToSql),
            RawGeometry::Blob(bytes) => {
                blob::read_header(bytes).map_err(|source| InvalidArgumentError::InvalidBlob {
                    name: name.to_owned(),
                    source,
                })?;
                (INSERT_FEATURE_BLOB, bytes as &dyn ToSql)
            }
            RawGeometry::Geometry(_) => {
                return Err(InvalidArgumentError::UnsupportedEncoding {
                    encoding: GeometryEncoding::Geometry,
                    operation: "insert",
                }
                .into());
            }
        };

        let style = style.unwrap_or(StyleId::NONE);
        let id = self
            .connection
            .prepare_cached(sql)
            .and_then(|mut statement| {
                statement.insert(params![
                    catalog.get(),
                    group.get(),
                    style.get(),
                    name,
                    payload,
                    resolution.min,
                    resolution.max
                ])
            })
            .map_err(FeatureStoreError::storage("insert feature"))?;
        debug!(
            "added {} feature {id} '{name}' to group {group}",
            raw.encoding()
        );
        Ok(FeatureId::new(id))
    }

    /// Delete a group and, through the foreign key cascade, its features.
    ///
    /// Returns whether a group was removed.
    pub fn delete_group(&self, group: GroupId) -> Result<bool, FeatureStoreError> {
        let removed = self
            .connection
            .execute("DELETE FROM groups WHERE id = ?1", [group.get()])
            .map_err(FeatureStoreError::storage("delete group"))?;
        debug!("deleted group {group} ({removed} row(s))");
        Ok(removed > 0)
    }

    /// Delete every group called `name` in `catalog`, returning how many
    /// groups were removed.
    pub fn delete_catalog_group(
        &self,
        catalog: CatalogId,
        name: &str,
    ) -> Result<usize, FeatureStoreError> {
        require_text("name", name)?;
        let removed = self
            .connection
            .execute(
                "DELETE FROM groups WHERE catalog_id = ?1 AND name = ?2",
                params![catalog.get(), name],
            )
            .map_err(FeatureStoreError::storage("delete catalog group"))?;
        debug!("deleted {removed} group(s) '{name}' from catalog {catalog}");
        Ok(removed)
    }

    /// Delete one feature, returning whether it existed.
    pub fn delete_feature(&self, feature: FeatureId) -> Result<bool, FeatureStoreError> {
        let removed = self
            .connection
            .execute("DELETE FROM geometry WHERE id = ?1", [feature.get()])
            .map_err(FeatureStoreError::storage("delete feature"))?;
        debug!("deleted feature {feature} ({removed} row(s))");
        Ok(removed > 0)
    }

    /// Remove every feature, group and style scoped to `catalog` as one unit.
    ///
    /// Returns the number of rows removed across the three tables, not
    /// counting features removed by the group cascade.
    pub fn delete_catalog(&mut self, catalog: CatalogId) -> Result<usize, FeatureStoreError> {
        self.begin_transaction()?;
        let removed = self.delete_catalog_rows(catalog);
        let marked = match removed {
            Ok(_) => self.set_transaction_successful(),
            Err(_) => Ok(()),
        };
        let ended = self.end_transaction();
        let removed = removed?;
        marked?;
        ended?;
        debug!("deleted catalog {catalog} ({removed} row(s))");
        Ok(removed)
    }

    fn delete_catalog_rows(&self, catalog: CatalogId) -> Result<usize, FeatureStoreError> {
        let mut removed = 0;
        for (sql, operation) in [
            (
                "DELETE FROM geometry WHERE catalog_id = ?1",
                "delete catalog features",
            ),
            (
                "DELETE FROM groups WHERE catalog_id = ?1",
                "delete catalog groups",
            ),
            (
                "DELETE FROM styles WHERE catalog_id = ?1",
                "delete catalog styles",
            ),
        ] {
            removed += self
                .connection
                .execute(sql, [catalog.get()])
                .map_err(FeatureStoreError::storage(operation))?;
        }
        Ok(removed)
    }

    /// Show or hide a group; its features follow.
    ///
    /// Returns whether the group exists.
    pub fn set_group_visible(
        &self,
        group: GroupId,
        visible: bool,
    ) -> Result<bool, FeatureStoreError> {
        let updated = self
            .connection
            .execute(
                "UPDATE groups SET visibility = ?2 WHERE id = ?1",
                params![group.get(), visible],
            )
            .map_err(FeatureStoreError::storage("update group visibility"))?;
        debug!("set group {group} visibility to {visible}");
        Ok(updated > 0)
    }

    /// Show or hide a single feature.
    ///
    /// Returns whether the feature exists.
    pub fn set_feature_visible(
        &self,
        feature: FeatureId,
        visible: bool,
    ) -> Result<bool, FeatureStoreError> {
        let updated = self
            .connection
            .execute(
                "UPDATE geometry SET visibility = ?2 WHERE id = ?1",
                params![feature.get(), visible],
            )
            .map_err(FeatureStoreError::storage("update feature visibility"))?;
        debug!("set feature {feature} visibility to {visible}");
        Ok(updated > 0)
    }

    /// Select every feature, reading geometry with `encoding`.
    pub fn query_features(
        &self,
        encoding: GeometryEncoding,
    ) -> Result<FeatureQuery<'_>, FeatureStoreError> {
        self.query_features_filtered(encoding, "", &[])
    }

    /// Select the features of one group.
    pub fn query_group_features(
        &self,
        encoding: GeometryEncoding,
        group: GroupId,
    ) -> Result<FeatureQuery<'_>, FeatureStoreError> {
        let group = group.to_string();
        self.query_features_filtered(encoding, "geometry.group_id = ?1", &[group.as_str()])
    }

    /// Select features matching an SQL predicate with positional text
    /// arguments.
    ///
    /// Columns in `predicate` should be table-qualified since the selection
    /// joins `geometry` with `styles`. An empty predicate selects every row.
    ///
    /// # Errors
    /// [`InvalidArgumentError::UnsupportedEncoding`] for
    /// [`GeometryEncoding::Geometry`], raised before anything is compiled.
    pub fn query_features_filtered(
        &self,
        encoding: GeometryEncoding,
        predicate: &str,
        args: &[&str],
    ) -> Result<FeatureQuery<'_>, FeatureStoreError> {
        if !encoding.is_storable() {
            return Err(InvalidArgumentError::UnsupportedEncoding {
                encoding,
                operation: "query",
            }
            .into());
        }

        let mut sql = String::from(SELECT_FEATURES);
        if !predicate.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql.push_str(" ORDER BY geometry.id");

        let statement = self
            .connection
            .prepare(&sql)
            .map_err(FeatureStoreError::storage("compile feature query"))?;
        let args = args.iter().map(|arg| (*arg).to_owned()).collect();
        FeatureQuery::new(statement, encoding, args)
    }

    /// Open a transaction scope. See [`TransactionScope::begin`].
    pub fn begin_transaction(&mut self) -> Result<(), FeatureStoreError> {
        self.transactions.begin(&mut self.connection)
    }

    /// Mark the innermost scope successful. See
    /// [`TransactionScope::set_successful`].
    pub fn set_transaction_successful(&mut self) -> Result<(), FeatureStoreError> {
        self.transactions.set_successful()
    }

    /// Close the innermost scope. See [`TransactionScope::end`].
    pub fn end_transaction(&mut self) -> Result<(), FeatureStoreError> {
        self.transactions.end(&mut self.connection)
    }

    /// Number of open transaction scopes.
    pub const fn transaction_depth(&self) -> usize {
        self.transactions.depth()
    }

    /// Whether a transaction scope is open.
    pub const fn in_transaction(&self) -> bool {
        self.transactions.is_active()
    }

    /// Run raw SQL with positional text arguments, returning the number of
    /// rows changed.
    pub fn execute(&self, sql: &str, args: &[&str]) -> Result<usize, FeatureStoreError> {
        self.connection
            .execute(sql, params_from_iter(args.iter()))
            .map_err(FeatureStoreError::storage("execute statement"))
    }

    /// Version of the SpatiaLite extension loaded into this connection.
    pub fn spatial_index_version(&self) -> Result<SpatialIndexVersion, SpatialIndexVersionError> {
        spatial_index_version(&self.connection)
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), InvalidArgumentError> {
    if value.is_empty() {
        return Err(InvalidArgumentError::EmptyField { field });
    }
    Ok(())
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), FeatureStoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let create_error = |source| FeatureStoreError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    };
    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };
    let dir = fs_utf8::Dir::open_ambient_dir(base, ambient_authority()).map_err(create_error)?;
    dir.create_dir_all(relative).map_err(create_error)
}
