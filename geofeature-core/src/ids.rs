//! Row identifiers used across the catalog tables.
//!
//! SQLite stores every identifier as a signed 64-bit integer, so the newtypes
//! wrap `i64` directly and convert without loss at the storage boundary.

use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw row identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Raw value as stored in SQLite.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

row_id! {
    /// Opaque reference to the catalog entry that owns a row.
    ///
    /// [`CatalogId::NONE`] marks rows that belong to no catalog entry.
    ///
    /// # Examples
    /// ```
    /// use geofeature_core::CatalogId;
    ///
    /// assert!(CatalogId::NONE.is_none());
    /// assert!(!CatalogId::new(12).is_none());
    /// ```
    CatalogId
}

row_id! {
    /// Identifier of a row in the `groups` table.
    GroupId
}

row_id! {
    /// Identifier of a row in the `styles` table.
    StyleId
}

row_id! {
    /// Identifier of a row in the feature (`geometry`) table.
    FeatureId
}

impl CatalogId {
    /// Sentinel for rows not scoped to any catalog entry.
    pub const NONE: Self = Self(0);

    /// Whether this is the "no catalog" sentinel.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for CatalogId {
    fn default() -> Self {
        Self::NONE
    }
}

impl StyleId {
    /// Value stored in `style_id` when a feature has no style.
    pub const NONE: Self = Self(0);
}
