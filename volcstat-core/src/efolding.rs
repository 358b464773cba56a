//! E-folding decay time of an area-averaged perturbation
//!
//! After an eruption the area-averaged SO₂ burden or sAOD rises to a peak and then
//! decays. The e-folding time is the number of time steps from the peak until the
//! series is nearest to `peak / e`.
//!
//! The search is a *nearest value* search over everything after the peak, not a
//! first-crossing search: if the series never reaches `peak / e` the result is the
//! offset of its closest approach, which may be the end of the record.

use crate::errors::{VolcstatError, VolcstatResult};
use crate::field::{Dimension, Field, FloatValue};
use num::Float;

/// Index of the first element nearest to `target`
///
/// Returns `None` for an empty slice. NaN elements are never nearest.
pub fn find_nearest<T: Float>(values: &[T], target: T) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, T)>, (i, v)| {
            let distance = (*v - target).abs();
            match best {
                Some((_, best_distance)) if best_distance <= distance => best,
                _ => Some((i, distance)),
            }
        })
        .map(|(i, _)| i)
}

/// Post-onset segment of an area-averaged time series
///
/// Indices are time steps from the start of the segment, not calendar days.
/// NaN samples are stored as zero.
#[derive(Clone, Debug, PartialEq)]
pub struct DecayCurve {
    values: Vec<FloatValue>,
}

impl DecayCurve {
    /// Curve from a segment that already starts at the onset
    ///
    /// NaN samples are replaced with zero. This can bias the peak search on gappy
    /// records but matches the published decay times.
    pub fn new(values: Vec<FloatValue>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|v| if v.is_nan() { 0.0 } else { v })
                .collect(),
        }
    }

    /// Curve from a full series, discarding the first `onset_offset` samples
    ///
    /// The daily records start 20 days before the eruption, so the default
    /// offset used throughout is 20.
    pub fn after_onset(series: &[FloatValue], onset_offset: usize) -> VolcstatResult<Self> {
        if onset_offset > series.len() {
            return Err(VolcstatError::PreconditionViolation(format!(
                "onset offset {} is beyond a series of length {}",
                onset_offset,
                series.len()
            )));
        }
        Ok(Self::new(series[onset_offset..].to_vec()))
    }

    /// Curve from a one-dimensional time field, discarding the first `onset_offset` days
    pub fn from_field(field: &Field, onset_offset: usize) -> VolcstatResult<Self> {
        if field.dims() != [Dimension::Time] {
            return Err(VolcstatError::PreconditionViolation(format!(
                "a decay curve needs a field with only a time dimension, got {:?}",
                field.dims()
            )));
        }
        Self::after_onset(&field.to_vec(), onset_offset)
    }

    pub fn values(&self) -> &[FloatValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index and value of the peak (first occurrence of the maximum)
    pub fn peak(&self) -> Option<(usize, FloatValue)> {
        let max = self.values.iter().copied().fold(FloatValue::NAN, FloatValue::max);
        self.values.iter().position(|v| *v == max).map(|i| (i, max))
    }

    /// Time steps from the peak to the value nearest `peak / e`
    ///
    /// Fails if the curve has fewer than two samples.
    pub fn e_folding_time(&self) -> VolcstatResult<usize> {
        if self.values.len() < 2 {
            return Err(VolcstatError::PreconditionViolation(format!(
                "e-folding time needs at least two samples, got {}",
                self.values.len()
            )));
        }
        let (x_max, max) = self.peak().ok_or_else(|| {
            VolcstatError::PreconditionViolation("decay curve has no finite peak".to_string())
        })?;
        let threshold = max / std::f64::consts::E;
        let offset = find_nearest(&self.values[x_max..], threshold).ok_or_else(|| {
            VolcstatError::PreconditionViolation("decay curve has no samples after its peak".to_string())
        })?;

        log::debug!(
            "Decay curve peaks at step {} ({}), nearest to peak/e at step {}",
            x_max,
            max,
            x_max + offset
        );
        Ok(offset)
    }
}

/// E-folding time of a series after discarding its first `onset_offset` samples
pub fn e_folding_time(series: &[FloatValue], onset_offset: usize) -> VolcstatResult<usize> {
    DecayCurve::after_onset(series, onset_offset)?.e_folding_time()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(amplitude: FloatValue, tau: FloatValue, n: usize) -> Vec<FloatValue> {
        (0..n)
            .map(|t| amplitude * (-(t as FloatValue) / tau).exp())
            .collect()
    }

    #[test]
    fn find_nearest_first_occurrence() {
        assert_eq!(find_nearest(&[3.0, 1.0, 5.0, 1.0], 1.2), Some(1));
        assert_eq!(find_nearest(&[0.0, 2.0], 1.0), Some(0));
        assert_eq!(find_nearest::<f64>(&[], 1.0), None);
        assert_eq!(find_nearest(&[f64::NAN, 4.0], 0.0), Some(1));
    }

    #[test]
    fn pure_exponential_decay() {
        let curve = DecayCurve::new(exponential(10.0, 5.0, 51));
        assert_eq!(curve.peak().map(|(i, _)| i), Some(0));
        assert_eq!(curve.e_folding_time().unwrap(), 5);
    }

    #[test]
    fn offset_measured_from_peak() {
        // Rise for three steps, then decay with tau = 8
        let mut values = vec![1.0, 4.0, 7.0];
        values.extend(exponential(10.0, 8.0, 60));
        let curve = DecayCurve::new(values);
        assert_eq!(curve.peak(), Some((3, 10.0)));
        assert_eq!(curve.e_folding_time().unwrap(), 8);
    }

    #[test]
    fn peak_is_first_maximum() {
        let curve = DecayCurve::new(vec![1.0, FloatValue::INFINITY, 2.0, 0.5]);
        assert_eq!(curve.peak(), Some((1, FloatValue::INFINITY)));

        let tied = DecayCurve::new(vec![0.5, 3.0, 1.0, 3.0]);
        assert_eq!(tied.peak(), Some((1, 3.0)));
        assert_eq!(DecayCurve::new(vec![]).peak(), None);
    }

    #[test]
    fn onset_offset_discards_leading_samples() {
        // Twenty pre-eruption days carrying a larger spurious value
        let mut series = vec![0.0; 20];
        series[5] = 100.0;
        series.extend(exponential(10.0, 5.0, 51));
        assert_eq!(e_folding_time(&series, 20).unwrap(), 5);
    }

    #[test]
    fn nearest_value_not_first_crossing() {
        // Never falls below peak / e (~3.68); closest approach is the last sample
        let curve = DecayCurve::new(vec![10.0, 8.0, 6.0, 5.0, 4.5]);
        assert_eq!(curve.e_folding_time().unwrap(), 4);
    }

    #[test]
    fn nan_samples_become_zero() {
        let curve = DecayCurve::new(vec![f64::NAN, 10.0, f64::NAN, 3.7, 1.0]);
        assert_eq!(curve.values()[0], 0.0);
        assert_eq!(curve.values()[2], 0.0);
        assert_eq!(curve.e_folding_time().unwrap(), 2);
    }

    #[test]
    fn all_zero_curve() {
        let curve = DecayCurve::new(vec![0.0; 30]);
        assert_eq!(curve.e_folding_time().unwrap(), 0);

        let all_nan = DecayCurve::new(vec![f64::NAN; 5]);
        assert_eq!(all_nan.e_folding_time().unwrap(), 0);
    }

    #[test]
    fn degenerate_segments_rejected() {
        assert!(matches!(
            DecayCurve::new(vec![]).e_folding_time(),
            Err(VolcstatError::PreconditionViolation(_))
        ));
        assert!(matches!(
            DecayCurve::new(vec![1.0]).e_folding_time(),
            Err(VolcstatError::PreconditionViolation(_))
        ));
        assert!(e_folding_time(&[1.0, 2.0, 3.0], 2).is_err());
        assert!(e_folding_time(&[1.0, 2.0], 3).is_err());
    }

    #[test]
    fn from_field_requires_time_series() {
        let series = Field::series(exponential(10.0, 5.0, 30));
        assert_eq!(DecayCurve::from_field(&series, 0).unwrap().e_folding_time().unwrap(), 5);

        let grid = Field::from_shape_vec(
            &[2, 2],
            vec![Dimension::Latitude, Dimension::Time],
            vec![1.0; 4],
        )
        .unwrap();
        assert!(DecayCurve::from_field(&grid, 0).is_err());
    }
}
