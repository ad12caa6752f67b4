//! Lazily materialised feature rows.
//!
//! A [`FeatureQuery`] owns a compiled selection over the feature table with
//! the geometry encoding fixed for every row. Running it yields a
//! [`FeatureCursor`] which steps through rows and rebuilds a
//! [`FeatureDefinition`] only when asked.

use geofeature_core::{
    FeatureDefinition, FeatureId, Geometry, GeometryEncoding, RawGeometry, ResolutionRange,
};
use rusqlite::types::Value;
use rusqlite::{Row, Rows, Statement, params_from_iter};

use crate::error::{CursorReadError, FeatureStoreError};
use crate::schema::{
    COLUMN_GEO_ID, COLUMN_GEO_MAX_GSD, COLUMN_GEO_MIN_GSD, COLUMN_GEO_NAME,
    COLUMN_GEO_SPATIAL_GEOMETRY,
};

/// Alias under which the joined style representation is selected.
pub const COLUMN_STYLE: &str = "style";

#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
    id: usize,
    name: usize,
    geometry: usize,
    style: usize,
    min_gsd: usize,
    max_gsd: usize,
}

impl ColumnIndices {
    fn resolve(statement: &Statement<'_>) -> Result<Self, CursorReadError> {
        let index = |column: &'static str| {
            statement
                .column_index(column)
                .map_err(|_| CursorReadError::MissingColumn { column })
        };
        Ok(Self {
            id: index(COLUMN_GEO_ID)?,
            name: index(COLUMN_GEO_NAME)?,
            geometry: index(COLUMN_GEO_SPATIAL_GEOMETRY)?,
            style: index(COLUMN_STYLE)?,
            min_gsd: index(COLUMN_GEO_MIN_GSD)?,
            max_gsd: index(COLUMN_GEO_MAX_GSD)?,
        })
    }
}

/// A compiled feature selection with a fixed geometry encoding.
///
/// Column positions are looked up once, when the query is built.
pub struct FeatureQuery<'conn> {
    statement: Statement<'conn>,
    encoding: GeometryEncoding,
    args: Vec<String>,
    columns: ColumnIndices,
}

impl<'conn> FeatureQuery<'conn> {
    pub(crate) fn new(
        statement: Statement<'conn>,
        encoding: GeometryEncoding,
        args: Vec<String>,
    ) -> Result<Self, FeatureStoreError> {
        let columns = ColumnIndices::resolve(&statement)?;
        Ok(Self {
            statement,
            encoding,
            args,
            columns,
        })
    }

    /// Encoding every row's geometry is read with.
    pub const fn encoding(&self) -> GeometryEncoding {
        self.encoding
    }

    /// Run the selection and return a cursor positioned before the first row.
    ///
    /// A query can be run again once the previous cursor is dropped.
    ///
    /// # Errors
    /// Returns a storage error when the arguments cannot be bound.
    pub fn cursor(&mut self) -> Result<FeatureCursor<'_>, FeatureStoreError> {
        let rows = self
            .statement
            .query(params_from_iter(self.args.iter()))
            .map_err(FeatureStoreError::storage("run feature query"))?;
        Ok(FeatureCursor {
            rows,
            encoding: self.encoding,
            columns: self.columns,
            state: CursorState::BeforeFirst,
        })
    }
}

#[derive(Debug)]
struct CurrentRow {
    id: i64,
    name: String,
    style: Option<String>,
    geometry: Value,
    min_gsd: f64,
    max_gsd: f64,
}

impl CurrentRow {
    fn read(row: &Row<'_>, columns: &ColumnIndices) -> Result<Self, CursorReadError> {
        fn column<T: rusqlite::types::FromSql>(
            row: &Row<'_>,
            index: usize,
            column: &'static str,
        ) -> Result<T, CursorReadError> {
            row.get(index)
                .map_err(|source| CursorReadError::Column { column, source })
        }

        Ok(Self {
            id: column(row, columns.id, COLUMN_GEO_ID)?,
            name: column(row, columns.name, COLUMN_GEO_NAME)?,
            style: column(row, columns.style, COLUMN_STYLE)?,
            geometry: column(row, columns.geometry, COLUMN_GEO_SPATIAL_GEOMETRY)?,
            min_gsd: column(row, columns.min_gsd, COLUMN_GEO_MIN_GSD)?,
            max_gsd: column(row, columns.max_gsd, COLUMN_GEO_MAX_GSD)?,
        })
    }
}

#[derive(Debug)]
enum CursorState {
    BeforeFirst,
    Positioned(CurrentRow),
    Exhausted,
}

/// Forward-only cursor over the rows of a [`FeatureQuery`].
///
/// The cursor starts before the first row. Each successful
/// [`advance`](Self::advance) copies the row's columns so accessors can be
/// called any number of times; they fail with
/// [`CursorReadError::NoCurrentRow`] before the first advance and after the
/// last row.
///
/// # Examples
/// ```
/// use geofeature_store::{FeatureDefinition, FeatureStore, GeometryEncoding, ResolutionRange};
///
/// let store = FeatureStore::open_in_memory().expect("open store");
/// let group = store
///     .add_group("survey", "peaks", "alps", ResolutionRange::UNBOUNDED)
///     .expect("add group");
/// store
///     .add_feature(
///         group,
///         &FeatureDefinition::from_wkt("summit", "POINT(7.5 46)"),
///         None,
///         ResolutionRange::UNBOUNDED,
///     )
///     .expect("add feature");
///
/// let mut query = store.query_features(GeometryEncoding::Wkt).expect("build query");
/// let mut cursor = query.cursor().expect("run query");
/// assert!(cursor.advance().expect("step"));
/// assert_eq!(cursor.name().expect("name"), "summit");
/// assert!(!cursor.advance().expect("step"));
/// ```
pub struct FeatureCursor<'stmt> {
    rows: Rows<'stmt>,
    encoding: GeometryEncoding,
    columns: ColumnIndices,
    state: CursorState,
}

impl FeatureCursor<'_> {
    /// Move to the next row, returning `false` once the rows are exhausted.
    ///
    /// # Errors
    /// [`CursorReadError::Step`] when SQLite fails to produce the row and
    /// [`CursorReadError::Column`] when a scalar column has the wrong type.
    /// Either way the cursor is left without a current row.
    pub fn advance(&mut self) -> Result<bool, FeatureStoreError> {
        if matches!(self.state, CursorState::Exhausted) {
            return Ok(false);
        }
        let next = match self.rows.next() {
            Ok(Some(row)) => CurrentRow::read(row, &self.columns).map(Some),
            Ok(None) => Ok(None),
            Err(source) => Err(CursorReadError::Step { source }),
        };
        match next {
            Ok(Some(row)) => {
                self.state = CursorState::Positioned(row);
                Ok(true)
            }
            Ok(None) => {
                self.state = CursorState::Exhausted;
                Ok(false)
            }
            Err(err) => {
                self.state = CursorState::BeforeFirst;
                Err(err.into())
            }
        }
    }

    /// Whether every row has been visited.
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.state, CursorState::Exhausted)
    }

    /// Encoding the geometry column is read with.
    pub const fn encoding(&self) -> GeometryEncoding {
        self.encoding
    }

    /// Identifier of the current feature.
    pub fn id(&self) -> Result<FeatureId, FeatureStoreError> {
        Ok(FeatureId::new(self.current()?.id))
    }

    /// Name of the current feature.
    pub fn name(&self) -> Result<&str, FeatureStoreError> {
        Ok(self.current()?.name.as_str())
    }

    /// Style representation of the current feature, if it has one.
    pub fn style(&self) -> Result<Option<&str>, FeatureStoreError> {
        Ok(self.current()?.style.as_deref())
    }

    /// Coarsest display resolution of the current feature.
    pub fn min_resolution(&self) -> Result<f64, FeatureStoreError> {
        Ok(self.current()?.min_gsd)
    }

    /// Finest display resolution of the current feature.
    pub fn max_resolution(&self) -> Result<f64, FeatureStoreError> {
        Ok(self.current()?.max_gsd)
    }

    /// Both display resolutions of the current feature.
    pub fn resolution(&self) -> Result<ResolutionRange, FeatureStoreError> {
        let row = self.current()?;
        Ok(ResolutionRange::new(row.min_gsd, row.max_gsd))
    }

    /// Rebuild the current feature's definition in the cursor's encoding.
    ///
    /// # Errors
    /// [`CursorReadError::NullColumn`] when the row has no geometry and
    /// [`CursorReadError::EncodingMismatch`] when the stored value is text
    /// where bytes were expected or the reverse.
    pub fn feature_definition(&self) -> Result<FeatureDefinition, FeatureStoreError> {
        let row = self.current()?;
        let mismatch = || CursorReadError::EncodingMismatch {
            column: COLUMN_GEO_SPATIAL_GEOMETRY,
            id: row.id,
            encoding: self.encoding,
        };
        let raw = match (&row.geometry, self.encoding) {
            (Value::Null, _) => {
                return Err(CursorReadError::NullColumn {
                    column: COLUMN_GEO_SPATIAL_GEOMETRY,
                    id: row.id,
                }
                .into());
            }
            (Value::Text(text), GeometryEncoding::Wkt) => RawGeometry::Wkt(text.clone()),
            (Value::Blob(bytes), GeometryEncoding::Wkb) => RawGeometry::Wkb(bytes.clone()),
            (Value::Blob(bytes), GeometryEncoding::Blob) => RawGeometry::Blob(bytes.clone()),
            _ => return Err(mismatch().into()),
        };
        Ok(FeatureDefinition::new(row.name.clone(), raw).with_optional_style(row.style.clone()))
    }

    /// Parse the current feature's geometry.
    ///
    /// # Errors
    /// Everything [`feature_definition`](Self::feature_definition) reports,
    /// plus [`CursorReadError::Decode`] when the payload does not parse.
    pub fn geometry(&self) -> Result<Geometry<f64>, FeatureStoreError> {
        let id = self.current()?.id;
        self.feature_definition()?
            .geometry()
            .map_err(|source| CursorReadError::Decode { id, source }.into())
    }

    fn current(&self) -> Result<&CurrentRow, CursorReadError> {
        match &self.state {
            CursorState::Positioned(row) => Ok(row),
            CursorState::BeforeFirst | CursorState::Exhausted => Err(CursorReadError::NoCurrentRow),
        }
    }
}
