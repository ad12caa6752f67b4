//! Display resolution bounds shared by groups and features.
//!
//! Resolutions are ground sample distances in meters per pixel. Zooming in
//! lowers the value, so the *minimum* resolution is the coarsest (largest)
//! bound and the *maximum* resolution the finest (smallest). `0.0` on either
//! side leaves that side unbounded.

use crate::ResolutionError;

/// Range of ground sample distances at which a row should be displayed.
///
/// Construction does not validate; stores call [`ResolutionRange::validate`]
/// before any write so a bad range never reaches the database.
///
/// # Examples
/// ```
/// use geofeature_core::ResolutionRange;
///
/// let range = ResolutionRange::new(156_543.0, 0.5);
/// assert!(range.validate().is_ok());
/// assert!(ResolutionRange::new(-1.0, 0.0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolutionRange {
    /// Coarsest ground sample distance (m/px); `0.0` means no minimum.
    pub min: f64,
    /// Finest ground sample distance (m/px); `0.0` means no maximum.
    pub max: f64,
}

impl ResolutionRange {
    /// Range with neither bound set.
    pub const UNBOUNDED: Self = Self { min: 0.0, max: 0.0 };

    /// Build a range from its coarsest and finest bounds.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check that both bounds are finite, non-negative and correctly ordered.
    ///
    /// Ordering is only enforced when both bounds are non-zero.
    pub fn validate(&self) -> Result<(), ResolutionError> {
        check_bound("minimum", self.min)?;
        check_bound("maximum", self.max)?;
        if self.min != 0.0 && self.max != 0.0 && self.min < self.max {
            return Err(ResolutionError::Inverted {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Whether neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.min == 0.0 && self.max == 0.0
    }
}

impl Default for ResolutionRange {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

fn check_bound(bound: &'static str, value: f64) -> Result<(), ResolutionError> {
    if !value.is_finite() {
        return Err(ResolutionError::NotFinite { bound, value });
    }
    if value < 0.0 {
        return Err(ResolutionError::Negative { bound, value });
    }
    Ok(())
}
