//! Cross-grid masking
//!
//! Model fields are compared against observations only where the observations exist.
//! A [`Mask`] is built once from the reference (observational) field, holding `1` where
//! the reference is finite and NaN elsewhere, and is then multiplied into the model
//! fields. Both fields must already be on the same grid; regridding happens upstream.
//!
//! # Examples
//!
//! ```rust
//! use volcstat_core::field::Field;
//! use volcstat_core::masking::mask_to_reference;
//!
//! let model = Field::series(vec![1.0, 2.0, 3.0]);
//! let observed = Field::series(vec![0.5, f64::NAN, 0.7]);
//!
//! let masked = mask_to_reference(&model, &observed).unwrap();
//! assert_eq!(masked.to_vec()[0], 1.0);
//! assert!(masked.to_vec()[1].is_nan());
//! ```

use crate::errors::{VolcstatError, VolcstatResult};
use crate::field::{Dimension, Field, FloatValue};
use ndarray::Slice;

/// Array of `1` / NaN marking where a reference field is valid
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    field: Field,
}

impl Mask {
    /// Mask that is `1` where `reference` is finite and NaN elsewhere
    pub fn from_reference(reference: &Field) -> Self {
        Self {
            field: reference.map(|v| if v.is_finite() { 1.0 } else { FloatValue::NAN }),
        }
    }

    /// Mask from a reference reduced over `dims` first
    ///
    /// A cell of the reduced grid is valid if any reference sample along the
    /// reduced dimensions is valid. Used to mask monthly model profiles against
    /// daily observations.
    pub fn from_reduced_reference(reference: &Field, dims: &[Dimension]) -> VolcstatResult<Self> {
        Ok(Self::from_reference(&reference.nanmean_over(dims)?))
    }

    pub fn dims(&self) -> &[Dimension] {
        self.field.dims()
    }

    pub fn shape(&self) -> &[usize] {
        self.field.shape()
    }

    /// Number of cells where the reference is valid
    pub fn valid_count(&self) -> usize {
        self.field.values().iter().filter(|v| !v.is_nan()).count()
    }

    pub fn as_field(&self) -> &Field {
        &self.field
    }

    /// Null out `target` wherever the mask is NaN
    ///
    /// `target` must have exactly the mask's shape and dimensions.
    pub fn apply(&self, target: &Field) -> VolcstatResult<Field> {
        if target.shape() != self.shape() {
            return Err(VolcstatError::shape_mismatch(self.shape(), target.shape()));
        }
        if target.dims() != self.dims() {
            return Err(VolcstatError::PreconditionViolation(format!(
                "mask dimensions {:?} do not match target dimensions {:?}",
                self.dims(),
                target.dims()
            )));
        }
        let mut masked = target.values().to_owned();
        masked.zip_mut_with(&self.field.values(), |t, m| *t *= *m);
        Field::new(masked, target.dims().to_vec())
    }

    /// Null out `target` wherever the mask is NaN, repeating the mask over every
    /// dimension of `target` the mask does not have
    ///
    /// Each mask dimension must be present in `target` with the same length.
    pub fn apply_broadcast(&self, target: &Field) -> VolcstatResult<Field> {
        if let Some(missing) = self.dims().iter().find(|d| !target.dims().contains(d)) {
            return Err(VolcstatError::MissingDimension(*missing));
        }

        let mut order = Vec::with_capacity(self.dims().len());
        let mut broadcast_shape = Vec::with_capacity(target.ndim());
        for (target_axis, dim) in target.dims().iter().enumerate() {
            match self.dims().iter().position(|d| d == dim) {
                Some(mask_axis) => {
                    if self.shape()[mask_axis] != target.shape()[target_axis] {
                        return Err(VolcstatError::shape_mismatch(self.shape(), target.shape()));
                    }
                    order.push(mask_axis);
                    broadcast_shape.push(self.shape()[mask_axis]);
                }
                None => broadcast_shape.push(1),
            }
        }

        // Reorder the mask to the target's axis order, then insert unit axes to broadcast over
        let aligned = self
            .field
            .values()
            .permuted_axes(order)
            .as_standard_layout()
            .into_owned()
            .into_shape(broadcast_shape)
            .map_err(|e| VolcstatError::PreconditionViolation(e.to_string()))?;

        let mut masked = target.values().to_owned();
        masked.zip_mut_with(&aligned, |t, m| *t *= *m);
        Field::new(masked, target.dims().to_vec())
    }
}

/// Restrict `target` to the cells where `reference` is valid
///
/// Fails with [`VolcstatError::ShapeMismatch`] unless both fields have the same shape.
pub fn mask_to_reference(target: &Field, reference: &Field) -> VolcstatResult<Field> {
    if target.shape() != reference.shape() {
        return Err(VolcstatError::shape_mismatch(reference.shape(), target.shape()));
    }
    Mask::from_reference(reference).apply(target)
}

/// A model field together with the observations it is compared against
#[derive(Copy, Clone, Debug)]
pub struct MaskPair<'a> {
    pub target: &'a Field,
    pub reference: &'a Field,
}

impl<'a> MaskPair<'a> {
    pub fn new(target: &'a Field, reference: &'a Field) -> Self {
        Self { target, reference }
    }
}

/// Splice two masked fields along `dim`
///
/// All four fields must have the same shape and dimension labels.
/// Indices before `split` come from `early.target` masked against `early.reference`;
/// indices from `split` on come from `late.target` masked against `late.reference`.
/// This combines a model run sampled like one instrument for the first part of the
/// record with the same run sampled like another for the rest.
pub fn stitch_masked(
    early: MaskPair<'_>,
    late: MaskPair<'_>,
    dim: Dimension,
    split: usize,
) -> VolcstatResult<Field> {
    let shape = early.target.shape();
    let dims = early.target.dims();
    for other in [early.reference, late.target, late.reference] {
        if other.shape() != shape {
            return Err(VolcstatError::shape_mismatch(shape, other.shape()));
        }
        if other.dims() != dims {
            return Err(VolcstatError::PreconditionViolation(format!(
                "cannot stitch fields with dimensions {:?} and {:?}",
                dims,
                other.dims()
            )));
        }
    }
    let len = early.target.len_of(dim)?;
    if split > len {
        return Err(VolcstatError::PreconditionViolation(format!(
            "split index {} is beyond the {:?} dimension of length {}",
            split, dim, len
        )));
    }

    let early_masked = mask_to_reference(early.target, early.reference)?;
    let late_masked = mask_to_reference(late.target, late.reference)?;

    let axis = early_masked.axis_of(dim)?;
    let mut stitched = early_masked.values().to_owned();
    stitched
        .slice_axis_mut(axis, Slice::from(split..))
        .assign(&late_masked.values().slice_axis(axis, Slice::from(split..)));

    Field::new(stitched, early.target.dims().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: FloatValue = FloatValue::NAN;

    fn lat_time(shape: [usize; 2], data: Vec<FloatValue>) -> Field {
        Field::from_shape_vec(&shape, vec![Dimension::Latitude, Dimension::Time], data).unwrap()
    }

    fn same(a: &Field, b: &Field) -> bool {
        a.shape() == b.shape()
            && a.values()
                .iter()
                .zip(b.values().iter())
                .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
    }

    #[test]
    fn mask_marks_valid_reference_cells() {
        let reference = lat_time([2, 2], vec![0.1, NAN, FloatValue::INFINITY, -3.0]);
        let mask = Mask::from_reference(&reference);
        let values = mask.as_field().to_vec();
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert!(values[2].is_nan());
        assert_eq!(values[3], 1.0);
        assert_eq!(mask.valid_count(), 2);
    }

    #[test]
    fn masking_nulls_invalid_cells_only() {
        let target = lat_time([2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let reference = lat_time([2, 2], vec![0.0, NAN, 5.0, NAN]);
        let masked = mask_to_reference(&target, &reference).unwrap();
        assert!(same(&masked, &lat_time([2, 2], vec![1.0, NAN, 3.0, NAN])));
    }

    #[test]
    fn fully_valid_reference_leaves_target_unchanged() {
        let target = lat_time([2, 3], vec![1.0, NAN, 3.0, 4.0, 5.0, 6.0]);
        let reference = lat_time([2, 3], vec![0.0; 6]);
        let masked = mask_to_reference(&target, &reference).unwrap();
        assert!(same(&masked, &target));
    }

    #[test]
    fn masking_is_idempotent() {
        let target = lat_time([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, NAN]);
        let reference = lat_time([2, 3], vec![NAN, 1.0, 1.0, NAN, 1.0, 1.0]);
        let once = mask_to_reference(&target, &reference).unwrap();
        let twice = mask_to_reference(&once, &reference).unwrap();
        assert!(same(&once, &twice));
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let target = lat_time([2, 3], vec![1.0; 6]);
        let reference = lat_time([3, 2], vec![1.0; 6]);
        assert_eq!(
            mask_to_reference(&target, &reference),
            Err(VolcstatError::ShapeMismatch {
                expected: vec![3, 2],
                found: vec![2, 3]
            })
        );
    }

    #[test]
    fn broadcast_over_altitude() {
        // Mask over latitude x month, target latitude x altitude x month
        let mask = Mask::from_reference(&lat_time([2, 2], vec![1.0, NAN, NAN, 1.0]));
        let target = Field::from_shape_vec(
            &[2, 3, 2],
            vec![Dimension::Latitude, Dimension::Altitude, Dimension::Time],
            (0..12).map(FloatValue::from).collect(),
        )
        .unwrap();

        let masked = mask.apply_broadcast(&target).unwrap();
        assert_eq!(masked.dims(), target.dims());
        let values = masked.values();
        for alt in 0..3 {
            assert!(!values[[0, alt, 0]].is_nan());
            assert!(values[[0, alt, 1]].is_nan());
            assert!(values[[1, alt, 0]].is_nan());
            assert!(!values[[1, alt, 1]].is_nan());
        }
        assert_eq!(values[[1, 2, 1]], 11.0);
    }

    #[test]
    fn broadcast_reorders_mask_axes() {
        // Mask stored as time x latitude
        let mask = Mask::from_reference(
            &Field::from_shape_vec(
                &[2, 3],
                vec![Dimension::Time, Dimension::Latitude],
                vec![1.0, 1.0, NAN, 1.0, NAN, 1.0],
            )
            .unwrap(),
        );
        let target = lat_time([3, 2], vec![1.0; 6]);
        let masked = mask.apply_broadcast(&target).unwrap();
        let values = masked.values();
        assert!(values[[2, 0]].is_nan());
        assert!(values[[1, 1]].is_nan());
        assert_eq!(values[[0, 0]], 1.0);
        assert_eq!(values[[2, 1]], 1.0);
    }

    #[test]
    fn broadcast_requires_mask_dimensions() {
        let mask = Mask::from_reference(&lat_time([2, 2], vec![1.0; 4]));
        let target = Field::from_shape_vec(
            &[2, 2],
            vec![Dimension::Latitude, Dimension::Altitude],
            vec![1.0; 4],
        )
        .unwrap();
        assert_eq!(
            mask.apply_broadcast(&target),
            Err(VolcstatError::MissingDimension(Dimension::Time))
        );

        let profile_mask = Mask::from_reference(
            &Field::from_shape_vec(
                &[2, 2],
                vec![Dimension::Altitude, Dimension::Time],
                vec![1.0; 4],
            )
            .unwrap(),
        );
        assert_eq!(
            profile_mask.apply_broadcast(&lat_time([2, 2], vec![1.0; 4])),
            Err(VolcstatError::MissingDimension(Dimension::Altitude))
        );

        let longer = lat_time([2, 5], vec![1.0; 10]);
        assert!(matches!(
            mask.apply_broadcast(&longer),
            Err(VolcstatError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn reduced_reference_mask() {
        // latitude x day x altitude level
        let reference = Field::from_shape_vec(
            &[2, 2, 2],
            vec![Dimension::Latitude, Dimension::Time, Dimension::Altitude],
            vec![1.0, NAN, NAN, NAN, NAN, NAN, NAN, 2.0],
        )
        .unwrap();
        let mask = Mask::from_reduced_reference(&reference, &[Dimension::Time]).unwrap();
        assert_eq!(mask.dims(), &[Dimension::Latitude, Dimension::Altitude]);
        let values = mask.as_field().values();
        assert_eq!(values[[0, 0]], 1.0);
        assert!(values[[0, 1]].is_nan());
        assert!(values[[1, 0]].is_nan());
        assert_eq!(values[[1, 1]], 1.0);
    }

    #[test]
    fn stitching_switches_reference_at_split() {
        let caliop_model = lat_time([1, 4], vec![1.0, 2.0, 3.0, 4.0]);
        let omps_model = lat_time([1, 4], vec![10.0, 20.0, 30.0, 40.0]);
        let caliop = lat_time([1, 4], vec![1.0, NAN, NAN, NAN]);
        let omps = lat_time([1, 4], vec![NAN, NAN, 1.0, NAN]);

        let stitched = stitch_masked(
            MaskPair::new(&caliop_model, &caliop),
            MaskPair::new(&omps_model, &omps),
            Dimension::Time,
            2,
        )
        .unwrap();
        assert!(same(&stitched, &lat_time([1, 4], vec![1.0, NAN, 30.0, NAN])));
    }

    #[test]
    fn stitching_rejects_split_past_end() {
        let field = lat_time([1, 4], vec![1.0; 4]);
        let pair = MaskPair::new(&field, &field);
        assert!(matches!(
            stitch_masked(pair, pair, Dimension::Time, 5),
            Err(VolcstatError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn stitching_rejects_transposed_late_field() {
        let early = lat_time([2, 2], vec![1.0; 4]);
        let late = Field::from_shape_vec(
            &[2, 2],
            vec![Dimension::Time, Dimension::Latitude],
            vec![2.0; 4],
        )
        .unwrap();
        assert!(matches!(
            stitch_masked(
                MaskPair::new(&early, &early),
                MaskPair::new(&late, &late),
                Dimension::Time,
                1,
            ),
            Err(VolcstatError::PreconditionViolation(_))
        ));
    }
}
