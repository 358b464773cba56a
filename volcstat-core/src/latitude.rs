//! Latitude axes, bands and area weights
//!
//! This module provides the [`LatitudeAxis`] describing the latitude coordinate of a gridded
//! field and the [`LatitudeBand`] selecting a contiguous part of it for area averaging.
//!
//! Grid cells shrink towards the poles, so a latitude φ is weighted by `cos(φ)` when
//! averaging over a band.
//!
//! # Examples
//!
//! ```rust
//! use volcstat_core::latitude::LatitudeAxis;
//!
//! let axis = LatitudeAxis::one_degree();
//! assert_eq!(axis.len(), 181);
//!
//! // 30-90°N on the 1° axis
//! let band = axis.band(30.0, 90.0).unwrap();
//! assert_eq!(band.range(), 120..181);
//! ```

use crate::errors::{VolcstatError, VolcstatResult};
use crate::field::FloatValue;
use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Tolerance used when comparing latitudes built from repeated steps
const LATITUDE_TOLERANCE: FloatValue = 1e-9;

/// Ordered latitude coordinate of a gridded field, in degrees north
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLatitudeAxis")]
pub struct LatitudeAxis {
    values: Vec<FloatValue>,
}

#[derive(Deserialize)]
struct RawLatitudeAxis {
    values: Vec<FloatValue>,
}

impl TryFrom<RawLatitudeAxis> for LatitudeAxis {
    type Error = VolcstatError;

    fn try_from(raw: RawLatitudeAxis) -> VolcstatResult<Self> {
        LatitudeAxis::from_values(raw.values)
    }
}

impl LatitudeAxis {
    /// Integer latitudes from 90°S to 90°N inclusive (181 points)
    ///
    /// This is the grid used by the observational and regridded model fields.
    pub fn one_degree() -> Self {
        Self {
            values: (-90..=90).map(FloatValue::from).collect(),
        }
    }

    /// Evenly spaced latitudes `start, start + step, ...` with `count` points
    ///
    /// For example the 1.25° HadGEM grid is `regular(-90.0, 1.25, 145)` and its
    /// cell-centred counterpart is `regular(-89.375, 1.25, 144)`.
    pub fn regular(start: FloatValue, step: FloatValue, count: usize) -> VolcstatResult<Self> {
        if count == 0 {
            return Err(VolcstatError::PreconditionViolation(
                "a latitude axis needs at least one point".to_string(),
            ));
        }
        if !(step > 0.0) {
            return Err(VolcstatError::PreconditionViolation(format!(
                "latitude step must be positive, got {}",
                step
            )));
        }
        Self::from_values(
            (0..count)
                .map(|i| start + step * i as FloatValue)
                .collect(),
        )
    }

    /// Axis from explicit values
    ///
    /// Values must be finite, strictly increasing and lie within [-90, 90].
    pub fn from_values(values: Vec<FloatValue>) -> VolcstatResult<Self> {
        if values.is_empty() {
            return Err(VolcstatError::PreconditionViolation(
                "a latitude axis needs at least one point".to_string(),
            ));
        }
        if let Some(bad) = values
            .iter()
            .find(|v| !v.is_finite() || v.abs() > 90.0 + LATITUDE_TOLERANCE)
        {
            return Err(VolcstatError::PreconditionViolation(format!(
                "latitude {} is outside [-90, 90]",
                bad
            )));
        }
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(VolcstatError::PreconditionViolation(
                "latitudes must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[FloatValue] {
        &self.values
    }

    /// Area weight of each latitude, `cos(φ)`
    pub fn weights(&self) -> Array1<FloatValue> {
        self.values.iter().map(|lat| lat.to_radians().cos()).collect()
    }

    /// Band covering every latitude φ with `south <= φ <= north`
    pub fn band(&self, south: FloatValue, north: FloatValue) -> VolcstatResult<LatitudeBand> {
        if south > north {
            return Err(VolcstatError::PreconditionViolation(format!(
                "band southern edge {} is north of its northern edge {}",
                south, north
            )));
        }
        let inside = |lat: &FloatValue| {
            *lat >= south - LATITUDE_TOLERANCE && *lat <= north + LATITUDE_TOLERANCE
        };
        let start = self.values.iter().position(inside);
        let end = self.values.iter().rposition(inside);
        match (start, end) {
            (Some(start), Some(end)) => LatitudeBand::from_indices(start, end + 1, self),
            _ => Err(VolcstatError::PreconditionViolation(format!(
                "no latitude of the axis lies within {}..={}",
                south, north
            ))),
        }
    }
}

impl Default for LatitudeAxis {
    fn default() -> Self {
        Self::one_degree()
    }
}

/// A contiguous index range `[start, end)` on a [`LatitudeAxis`]
///
/// A deserialised band is only checked for being non-empty; its end is checked
/// against an axis when it is used.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLatitudeBand")]
pub struct LatitudeBand {
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
struct RawLatitudeBand {
    start: usize,
    end: usize,
}

impl TryFrom<RawLatitudeBand> for LatitudeBand {
    type Error = VolcstatError;

    fn try_from(raw: RawLatitudeBand) -> VolcstatResult<Self> {
        if raw.start >= raw.end {
            return Err(VolcstatError::PreconditionViolation(format!(
                "latitude band {}..{} is empty",
                raw.start, raw.end
            )));
        }
        Ok(Self {
            start: raw.start,
            end: raw.end,
        })
    }
}

impl LatitudeBand {
    /// Band from exact indices
    ///
    /// The band must be non-empty and lie within the axis.
    pub fn from_indices(start: usize, end: usize, axis: &LatitudeAxis) -> VolcstatResult<Self> {
        if start >= end {
            return Err(VolcstatError::PreconditionViolation(format!(
                "latitude band {}..{} is empty",
                start, end
            )));
        }
        if end > axis.len() {
            return Err(VolcstatError::PreconditionViolation(format!(
                "latitude band {}..{} exceeds an axis of length {}",
                start,
                end,
                axis.len()
            )));
        }
        Ok(Self { start, end })
    }

    /// Band from indices, clipping them to the axis the way a numpy slice does
    ///
    /// An end past the axis is clipped to the axis length. The clipped band must
    /// still contain at least one latitude.
    pub fn clipped(start: usize, end: usize, axis: &LatitudeAxis) -> VolcstatResult<Self> {
        let clipped_end = end.min(axis.len());
        let clipped_start = start.min(clipped_end);
        if (clipped_start, clipped_end) != (start, end) {
            log::warn!(
                "Latitude band {}..{} clipped to {}..{} on an axis of length {}",
                start,
                end,
                clipped_start,
                clipped_end,
                axis.len()
            );
        }
        Self::from_indices(clipped_start, clipped_end, axis)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Area weights of the latitudes inside the band
    ///
    /// Fails if the band extends past the end of `axis`.
    pub fn weights(&self, axis: &LatitudeAxis) -> VolcstatResult<Array1<FloatValue>> {
        if self.end > axis.len() {
            return Err(VolcstatError::PreconditionViolation(format!(
                "latitude band {}..{} exceeds an axis of length {}",
                self.start,
                self.end,
                axis.len()
            )));
        }
        Ok(axis.weights().slice(s![self.start..self.end]).to_owned())
    }
}
