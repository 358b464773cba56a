//! Spectral dependence of aerosol optical depth
//!
//! The Ångström exponent α describes how optical depth varies with wavelength,
//! `AOD ∝ λ^(-α)`. From two wavelengths:
//!
//! $$ \alpha = -\frac{\ln(\tau_1 / \tau_2)}{\ln(\lambda_1 / \lambda_2)} $$
//!
//! It is also used to move an optical depth from the wavelength an instrument or model
//! reports to a common one (532 nm for the CALIOP comparison).

use crate::errors::{VolcstatError, VolcstatResult};
use crate::field::{Field, FloatValue};

fn check_wavelength(wavelength_nm: FloatValue) -> VolcstatResult<()> {
    if wavelength_nm > 0.0 && wavelength_nm.is_finite() {
        Ok(())
    } else {
        Err(VolcstatError::PreconditionViolation(format!(
            "wavelength must be positive, got {} nm",
            wavelength_nm
        )))
    }
}

/// Ångström exponent of a pair of optical depths
///
/// Returns NaN when either optical depth is NaN or not positive.
pub fn angstrom_exponent_value(
    aod_1: FloatValue,
    aod_2: FloatValue,
    wavelength_1_nm: FloatValue,
    wavelength_2_nm: FloatValue,
) -> FloatValue {
    if !(aod_1 > 0.0 && aod_2 > 0.0) {
        return FloatValue::NAN;
    }
    -(aod_1 / aod_2).ln() / (wavelength_1_nm / wavelength_2_nm).ln()
}

/// Elementwise Ångström exponent of two optical-depth fields
///
/// Both fields must have the same shape and the wavelengths must differ.
pub fn angstrom_exponent(
    aod_1: &Field,
    aod_2: &Field,
    wavelength_1_nm: FloatValue,
    wavelength_2_nm: FloatValue,
) -> VolcstatResult<Field> {
    check_wavelength(wavelength_1_nm)?;
    check_wavelength(wavelength_2_nm)?;
    if wavelength_1_nm == wavelength_2_nm {
        return Err(VolcstatError::PreconditionViolation(
            "the two wavelengths must differ".to_string(),
        ));
    }
    if aod_1.shape() != aod_2.shape() {
        return Err(VolcstatError::shape_mismatch(aod_1.shape(), aod_2.shape()));
    }

    let mut exponent = aod_1.values().to_owned();
    exponent.zip_mut_with(&aod_2.values(), |a, b| {
        *a = angstrom_exponent_value(*a, *b, wavelength_1_nm, wavelength_2_nm)
    });
    Field::new(exponent, aod_1.dims().to_vec())
}

/// Rescale optical depth from one wavelength to another with a given Ångström exponent
pub fn scale_to_wavelength(
    aod: &Field,
    from_nm: FloatValue,
    to_nm: FloatValue,
    exponent: FloatValue,
) -> VolcstatResult<Field> {
    check_wavelength(from_nm)?;
    check_wavelength(to_nm)?;
    let factor = (to_nm / from_nm).powf(-exponent);
    Ok(aod.scaled(factor))
}
