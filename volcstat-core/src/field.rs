//! Gridded fields with named dimensions
//!
//! A [`Field`] is an immutable n-dimensional array of a single physical quantity
//! (SO₂ column burden, optical depth, extinction coefficient, radiative forcing),
//! where every axis carries a [`Dimension`] label. Missing samples are stored as NaN.
//!
//! Operations never mutate the field they are called on; they return a new field.
//!
//! # Examples
//!
//! ```rust
//! use volcstat_core::field::{Dimension, Field};
//!
//! // Two latitudes, three days
//! let field = Field::from_shape_vec(
//!     &[2, 3],
//!     vec![Dimension::Latitude, Dimension::Time],
//!     vec![1.0, 2.0, f64::NAN, 3.0, 4.0, f64::NAN],
//! )
//! .unwrap();
//!
//! let daily = field.nanmean_over(&[Dimension::Latitude]).unwrap();
//! assert_eq!(daily.dims(), &[Dimension::Time]);
//! assert_eq!(daily.values()[[0]], 2.0);
//! assert!(daily.values()[[2]].is_nan());
//! ```

use crate::errors::{VolcstatError, VolcstatResult};
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayViewD, Axis, IxDyn, Slice};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Floating point type used for every field value
pub type FloatValue = f64;

/// Label for an axis of a [`Field`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Latitude,
    Longitude,
    Altitude,
    /// Day index, or the only time axis of a field
    Time,
    /// Calendar month, for fields holding days within months on a separate `Time` axis
    Month,
}

/// An n-dimensional array of a physical quantity with labelled axes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField")]
pub struct Field {
    values: ArrayD<FloatValue>,
    dims: Vec<Dimension>,
}

/// Unchecked serialised form of a [`Field`]
#[derive(Deserialize)]
struct RawField {
    values: ArrayD<FloatValue>,
    dims: Vec<Dimension>,
}

impl TryFrom<RawField> for Field {
    type Error = VolcstatError;

    fn try_from(raw: RawField) -> VolcstatResult<Self> {
        Field::new(raw.values, raw.dims)
    }
}

impl Field {
    /// Wrap an array, labelling each axis in order
    ///
    /// Fails if the number of labels does not match the number of axes,
    /// or if a label is repeated.
    pub fn new(values: ArrayD<FloatValue>, dims: Vec<Dimension>) -> VolcstatResult<Self> {
        if dims.len() != values.ndim() {
            return Err(VolcstatError::PreconditionViolation(format!(
                "{} dimension labels given for an array with {} axes",
                dims.len(),
                values.ndim()
            )));
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(VolcstatError::PreconditionViolation(format!(
                    "dimension {:?} is labelled more than once",
                    dim
                )));
            }
        }
        Ok(Self { values, dims })
    }

    /// Build a field from a flat row-major buffer
    pub fn from_shape_vec(
        shape: &[usize],
        dims: Vec<Dimension>,
        data: Vec<FloatValue>,
    ) -> VolcstatResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(VolcstatError::shape_mismatch(shape, &[data.len()]));
        }
        let values = ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| VolcstatError::PreconditionViolation(e.to_string()))?;
        Self::new(values, dims)
    }

    /// A one-dimensional daily time series
    pub fn series(values: Vec<FloatValue>) -> Self {
        Self {
            values: Array1::from(values).into_dyn(),
            dims: vec![Dimension::Time],
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    pub fn values(&self) -> ArrayViewD<'_, FloatValue> {
        self.values.view()
    }

    pub fn into_values(self) -> ArrayD<FloatValue> {
        self.values
    }

    /// Flatten to a vector in row-major order
    pub fn to_vec(&self) -> Vec<FloatValue> {
        self.values.iter().copied().collect()
    }

    /// Axis index of a labelled dimension
    pub fn axis_of(&self, dim: Dimension) -> VolcstatResult<Axis> {
        self.dims
            .iter()
            .position(|d| *d == dim)
            .map(Axis)
            .ok_or(VolcstatError::MissingDimension(dim))
    }

    /// Number of samples along a labelled dimension
    pub fn len_of(&self, dim: Dimension) -> VolcstatResult<usize> {
        Ok(self.values.len_of(self.axis_of(dim)?))
    }

    /// Number of NaN samples in the field
    pub fn count_nan(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Apply a function to every sample
    pub fn map<F>(&self, f: F) -> Field
    where
        F: Fn(FloatValue) -> FloatValue,
    {
        Field {
            values: self.values.mapv(f),
            dims: self.dims.clone(),
        }
    }

    /// Multiply every sample by a constant, e.g. for a unit conversion
    pub fn scaled(&self, factor: FloatValue) -> Field {
        self.map(|v| v * factor)
    }

    /// Contiguous sub-range along one dimension
    ///
    /// Unlike numpy slicing the range is not clipped: an end beyond the
    /// dimension length is an error.
    pub fn slice_dim(&self, dim: Dimension, range: Range<usize>) -> VolcstatResult<Field> {
        let axis = self.axis_of(dim)?;
        let len = self.values.len_of(axis);
        if range.start > range.end || range.end > len {
            return Err(VolcstatError::PreconditionViolation(format!(
                "range {:?} is outside the {:?} dimension of length {}",
                range, dim, len
            )));
        }
        let view = self
            .values
            .slice_axis(axis, Slice::from(range.start..range.end));
        Ok(Field {
            values: view.to_owned(),
            dims: self.dims.clone(),
        })
    }

    /// NaN-aware mean over one or more dimensions
    ///
    /// Samples are pooled across all reduced dimensions before averaging, so the
    /// result is the mean of every valid sample rather than a mean of means.
    /// An output cell with no valid samples is NaN.
    pub fn nanmean_over(&self, dims: &[Dimension]) -> VolcstatResult<Field> {
        self.reduce_over(dims, |lane| nanmean(lane.iter()))
    }

    /// NaN-aware population standard deviation over one or more dimensions
    pub fn nanstd_over(&self, dims: &[Dimension]) -> VolcstatResult<Field> {
        self.reduce_over(dims, |lane| nanstd(lane.iter()))
    }

    /// NaN-aware mean of every sample in the field
    pub fn nanmean_all(&self) -> FloatValue {
        nanmean(self.values.iter())
    }

    fn reduce_over<F>(&self, dims: &[Dimension], reducer: F) -> VolcstatResult<Field>
    where
        F: Fn(ArrayView1<'_, FloatValue>) -> FloatValue,
    {
        let mut reduced_axes: Vec<usize> = Vec::with_capacity(dims.len());
        for dim in dims {
            let axis = self.axis_of(*dim)?.index();
            if reduced_axes.contains(&axis) {
                return Err(VolcstatError::PreconditionViolation(format!(
                    "dimension {:?} is reduced more than once",
                    dim
                )));
            }
            reduced_axes.push(axis);
        }

        let shape = self.values.shape();
        let kept_axes: Vec<usize> = (0..self.ndim())
            .filter(|i| !reduced_axes.contains(i))
            .collect();
        let kept_shape: Vec<usize> = kept_axes.iter().map(|&i| shape[i]).collect();
        let n_kept: usize = kept_shape.iter().product();
        let n_reduced: usize = reduced_axes.iter().map(|&i| shape[i]).product();

        // Move the reduced axes to the back so each output cell is one row
        let order: Vec<usize> = kept_axes.iter().chain(reduced_axes.iter()).copied().collect();
        let permuted = self.values.view().permuted_axes(IxDyn(&order));
        let table = Array2::from_shape_vec((n_kept, n_reduced), permuted.iter().copied().collect())
            .map_err(|e| VolcstatError::PreconditionViolation(e.to_string()))?;

        let reduced: Vec<FloatValue> = table.rows().into_iter().map(&reducer).collect();
        let values = ArrayD::from_shape_vec(IxDyn(&kept_shape), reduced)
            .map_err(|e| VolcstatError::PreconditionViolation(e.to_string()))?;

        Ok(Field {
            values,
            dims: kept_axes.iter().map(|&i| self.dims[i]).collect(),
        })
    }
}

/// Mean of the non-NaN values, NaN if there are none
pub(crate) fn nanmean<'a>(values: impl Iterator<Item = &'a FloatValue>) -> FloatValue {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        FloatValue::NAN
    } else {
        sum / count as FloatValue
    }
}

/// Population standard deviation of the non-NaN values, NaN if there are none
pub(crate) fn nanstd<'a>(values: impl Iterator<Item = &'a FloatValue> + Clone) -> FloatValue {
    let mean = nanmean(values.clone());
    if mean.is_nan() {
        return FloatValue::NAN;
    }
    let (sum_sq, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + (v - mean).powi(2), n + 1));
    (sum_sq / count as FloatValue).sqrt()
}
