//! Latitude-weighted area averaging
//!
//! Reduces the latitude dimension of a [`Field`] over a [`LatitudeBand`] to a single
//! value per remaining index (per day, per altitude level, ...):
//!
//! $$ \bar{F} = \frac{\sum_i w_i F_i}{\sum_i w_i}, \quad w_i = \cos(\phi_i) $$
//!
//! where the sums run only over the latitudes in the band at which `F` is not NaN.
//! Exclusion happens per output index, so two days can be averaged over different
//! sets of latitudes. An output index with no valid latitude is NaN.

use crate::errors::{VolcstatError, VolcstatResult};
use crate::field::{Dimension, Field, FloatValue};
use crate::latitude::{LatitudeAxis, LatitudeBand};
use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis};

/// NaN-aware weighted mean along one axis
///
/// NaN samples are left out of both the numerator and the denominator. If no valid
/// sample (or only zero weights) remains for an output index the result there is NaN.
///
/// Weights must be non-negative and have the same length as `axis`.
pub fn weighted_nanmean(
    values: ArrayViewD<'_, FloatValue>,
    weights: ArrayView1<'_, FloatValue>,
    axis: Axis,
) -> VolcstatResult<ArrayD<FloatValue>> {
    if axis.index() >= values.ndim() {
        return Err(VolcstatError::PreconditionViolation(format!(
            "axis {} out of bounds for an array with {} axes",
            axis.index(),
            values.ndim()
        )));
    }
    let len = values.len_of(axis);
    if weights.len() != len {
        return Err(VolcstatError::shape_mismatch(&[len], &[weights.len()]));
    }
    if weights.iter().any(|w| !(*w >= 0.0)) {
        return Err(VolcstatError::PreconditionViolation(
            "weights must be non-negative".to_string(),
        ));
    }

    Ok(values.map_axis(axis, |lane| {
        let (weighted_sum, weight_sum) = lane
            .iter()
            .zip(weights.iter())
            .filter(|(v, _)| !v.is_nan())
            .fold((0.0, 0.0), |(num, den), (v, w)| (num + v * w, den + w));
        if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            FloatValue::NAN
        }
    }))
}

/// Cosine-latitude weighted mean of a field over a latitude band
///
/// The field's latitude dimension must have the same length as `axis`. The result has
/// the latitude dimension removed and keeps every other dimension in order.
pub fn latitude_weighted_average(
    field: &Field,
    axis: &LatitudeAxis,
    band: &LatitudeBand,
) -> VolcstatResult<Field> {
    let lat_axis = field.axis_of(Dimension::Latitude)?;
    let n_lat = field.len_of(Dimension::Latitude)?;
    if n_lat != axis.len() {
        return Err(VolcstatError::shape_mismatch(&[axis.len()], &[n_lat]));
    }
    let weights = band.weights(axis)?;
    let in_band = field.slice_dim(Dimension::Latitude, band.range())?;
    let averaged = weighted_nanmean(in_band.values(), weights.view(), lat_axis)?;

    let all_invalid = averaged.iter().filter(|v| v.is_nan()).count();
    if all_invalid > 0 {
        log::debug!(
            "{} of {} averaged values have no valid latitude in band {:?}",
            all_invalid,
            averaged.len(),
            band.range()
        );
    }

    let dims = field
        .dims()
        .iter()
        .copied()
        .filter(|d| *d != Dimension::Latitude)
        .collect();
    Field::new(averaged, dims)
}
