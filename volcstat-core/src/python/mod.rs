//! Python bindings for the reductions
//!
//! numpy arrays carry no axis labels, so callers say which axis is latitude and the
//! remaining axes are labelled in order. Errors are raised as `ValueError`.

use crate::analysis::PerturbationAnalysis;
use crate::averaging::latitude_weighted_average as weighted_average;
use crate::config::AnalysisConfig;
use crate::efolding::e_folding_time as efold;
use crate::errors::VolcstatError;
use crate::field::{Dimension, Field, FloatValue};
use crate::latitude::LatitudeAxis;
use crate::masking::mask_to_reference as mask;
use crate::optics;
use numpy::{IntoPyArray, PyArray1, PyArrayDyn, PyReadonlyArray1, PyReadonlyArrayDyn};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

impl From<VolcstatError> for PyErr {
    fn from(err: VolcstatError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Labels for an unlabelled array with latitude on `latitude_axis`
fn label_axes(ndim: usize, latitude_axis: usize) -> PyResult<Vec<Dimension>> {
    if latitude_axis >= ndim {
        return Err(PyValueError::new_err(format!(
            "latitude axis {} out of bounds for an array with {} dimensions",
            latitude_axis, ndim
        )));
    }
    let mut others = [
        Dimension::Longitude,
        Dimension::Altitude,
        Dimension::Time,
        Dimension::Month,
    ]
    .into_iter();
    (0..ndim)
        .map(|i| {
            if i == latitude_axis {
                Ok(Dimension::Latitude)
            } else {
                others.next().ok_or_else(|| {
                    PyValueError::new_err(format!("at most 5 dimensions are supported, got {}", ndim))
                })
            }
        })
        .collect()
}

fn to_field(values: &PyReadonlyArrayDyn<'_, FloatValue>, latitude_axis: usize) -> PyResult<Field> {
    let values = values.as_array().to_owned();
    let dims = label_axes(values.ndim(), latitude_axis)?;
    Ok(Field::new(values, dims)?)
}

/// Python wrapper for LatitudeAxis
#[pyclass(name = "LatitudeAxis", module = "volcstat.core")]
#[derive(Clone)]
pub struct PyLatitudeAxis(pub LatitudeAxis);

#[pymethods]
impl PyLatitudeAxis {
    /// Integer latitudes from -90 to 90 inclusive
    #[staticmethod]
    fn one_degree() -> Self {
        Self(LatitudeAxis::one_degree())
    }

    /// Evenly spaced latitudes
    #[staticmethod]
    fn regular(start: FloatValue, step: FloatValue, count: usize) -> PyResult<Self> {
        Ok(Self(LatitudeAxis::regular(start, step, count)?))
    }

    #[staticmethod]
    fn from_values(values: Vec<FloatValue>) -> PyResult<Self> {
        Ok(Self(LatitudeAxis::from_values(values)?))
    }

    fn values<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.values().to_vec().into_pyarray_bound(py)
    }

    /// Cosine area weights
    fn weights<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.weights().into_pyarray_bound(py)
    }

    /// Index range `(start, end)` of the latitudes within `south..=north`
    fn band(&self, south: FloatValue, north: FloatValue) -> PyResult<(usize, usize)> {
        let band = self.0.band(south, north)?;
        Ok((band.start(), band.end()))
    }

    fn __len__(&self) -> usize {
        self.0.len()
    }

    fn __repr__(&self) -> String {
        format!("LatitudeAxis(len={})", self.0.len())
    }
}

/// Python wrapper for PerturbationAnalysis
///
/// Built from an optional configuration dict, e.g.
///     PerturbationAnalysis({"band": {"south": 45.0}})
#[pyclass(name = "PerturbationAnalysis", module = "volcstat.core")]
pub struct PyPerturbationAnalysis(pub PerturbationAnalysis);

#[pymethods]
impl PyPerturbationAnalysis {
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&Bound<'_, PyAny>>) -> PyResult<Self> {
        let config: AnalysisConfig = match config {
            Some(obj) => pythonize::depythonize_bound(obj.clone())?,
            None => AnalysisConfig::default(),
        };
        Ok(Self(PerturbationAnalysis::new(config)?))
    }

    /// Load the configuration from a TOML file
    #[staticmethod]
    fn from_toml(path: &str) -> PyResult<Self> {
        Ok(Self(PerturbationAnalysis::new(AnalysisConfig::from_path(
            path,
        )?)?))
    }

    #[pyo3(signature = (values, latitude_axis=0))]
    fn area_average<'py>(
        &self,
        py: Python<'py>,
        values: PyReadonlyArrayDyn<'py, FloatValue>,
        latitude_axis: usize,
    ) -> PyResult<Bound<'py, PyArrayDyn<FloatValue>>> {
        let field = to_field(&values, latitude_axis)?;
        Ok(self.0.area_average(&field)?.into_values().into_pyarray_bound(py))
    }

    fn e_folding_time(&self, series: PyReadonlyArray1<'_, FloatValue>) -> PyResult<usize> {
        Ok(self.0.e_folding_time(&series.as_array().to_vec())?)
    }
}

/// Cosine-latitude weighted NaN-aware mean over a latitude band
#[pyfunction]
#[pyo3(signature = (values, latitude_axis=0, south=30.0, north=90.0, latitudes=None))]
fn latitude_weighted_average<'py>(
    py: Python<'py>,
    values: PyReadonlyArrayDyn<'py, FloatValue>,
    latitude_axis: usize,
    south: FloatValue,
    north: FloatValue,
    latitudes: Option<PyRef<'_, PyLatitudeAxis>>,
) -> PyResult<Bound<'py, PyArrayDyn<FloatValue>>> {
    let axis = latitudes
        .map(|l| l.0.clone())
        .unwrap_or_else(LatitudeAxis::one_degree);
    let band = axis.band(south, north)?;
    let field = to_field(&values, latitude_axis)?;
    Ok(weighted_average(&field, &axis, &band)?
        .into_values()
        .into_pyarray_bound(py))
}

/// Null out `target` wherever `reference` is not finite
#[pyfunction]
fn mask_to_reference<'py>(
    py: Python<'py>,
    target: PyReadonlyArrayDyn<'py, FloatValue>,
    reference: PyReadonlyArrayDyn<'py, FloatValue>,
) -> PyResult<Bound<'py, PyArrayDyn<FloatValue>>> {
    let target = to_field(&target, 0)?;
    let reference = to_field(&reference, 0)?;
    Ok(mask(&target, &reference)?.into_values().into_pyarray_bound(py))
}

/// Steps from the peak to the value nearest peak / e, after dropping `onset_offset` samples
#[pyfunction]
#[pyo3(signature = (series, onset_offset=20))]
fn e_folding_time(series: PyReadonlyArray1<'_, FloatValue>, onset_offset: usize) -> PyResult<usize> {
    Ok(efold(&series.as_array().to_vec(), onset_offset)?)
}

#[pyfunction]
fn angstrom_exponent<'py>(
    py: Python<'py>,
    aod_1: PyReadonlyArrayDyn<'py, FloatValue>,
    aod_2: PyReadonlyArrayDyn<'py, FloatValue>,
    wavelength_1: FloatValue,
    wavelength_2: FloatValue,
) -> PyResult<Bound<'py, PyArrayDyn<FloatValue>>> {
    let aod_1 = to_field(&aod_1, 0)?;
    let aod_2 = to_field(&aod_2, 0)?;
    Ok(
        optics::angstrom_exponent(&aod_1, &aod_2, wavelength_1, wavelength_2)?
            .into_values()
            .into_pyarray_bound(py),
    )
}

#[pyfunction]
fn scale_to_wavelength<'py>(
    py: Python<'py>,
    aod: PyReadonlyArrayDyn<'py, FloatValue>,
    from_nm: FloatValue,
    to_nm: FloatValue,
    exponent: FloatValue,
) -> PyResult<Bound<'py, PyArrayDyn<FloatValue>>> {
    let aod = to_field(&aod, 0)?;
    Ok(optics::scale_to_wavelength(&aod, from_nm, to_nm, exponent)?
        .into_values()
        .into_pyarray_bound(py))
}

#[pymodule]
pub fn core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyLatitudeAxis>()?;
    m.add_class::<PyPerturbationAnalysis>()?;
    m.add_function(wrap_pyfunction!(latitude_weighted_average, m)?)?;
    m.add_function(wrap_pyfunction!(mask_to_reference, m)?)?;
    m.add_function(wrap_pyfunction!(e_folding_time, m)?)?;
    m.add_function(wrap_pyfunction!(angstrom_exponent, m)?)?;
    m.add_function(wrap_pyfunction!(scale_to_wavelength, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_latitude_axis() {
        let dims = label_axes(3, 1).unwrap();
        assert_eq!(
            dims,
            vec![Dimension::Longitude, Dimension::Latitude, Dimension::Altitude]
        );
    }
}
