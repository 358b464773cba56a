//! Configured perturbation analysis
//!
//! [`PerturbationAnalysis`] resolves an [`AnalysisConfig`] into a latitude axis and band
//! once, then applies the same reductions to every field of a figure.

use crate::averaging::latitude_weighted_average;
use crate::config::AnalysisConfig;
use crate::efolding::DecayCurve;
use crate::errors::{VolcstatError, VolcstatResult};
use crate::field::{Dimension, Field, FloatValue};
use crate::latitude::{LatitudeAxis, LatitudeBand};
use crate::masking::mask_to_reference;

#[derive(Debug, Clone)]
pub struct PerturbationAnalysis {
    config: AnalysisConfig,
    axis: LatitudeAxis,
    band: LatitudeBand,
}

impl PerturbationAnalysis {
    pub fn new(config: AnalysisConfig) -> VolcstatResult<Self> {
        config.validate()?;
        let axis = config.latitude.axis()?;
        let band = axis.band(config.band.south, config.band.north)?;
        log::debug!(
            "Averaging over latitudes {}..{} ({} of {} points)",
            config.band.south,
            config.band.north,
            band.len(),
            axis.len()
        );
        Ok(Self { config, axis, band })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn axis(&self) -> &LatitudeAxis {
        &self.axis
    }

    pub fn band(&self) -> &LatitudeBand {
        &self.band
    }

    /// Cosine-latitude weighted mean over the configured band
    pub fn area_average(&self, field: &Field) -> VolcstatResult<Field> {
        latitude_weighted_average(field, &self.axis, &self.band)
    }

    /// Area average of `target` restricted to the cells where `reference` is valid
    pub fn masked_area_average(&self, target: &Field, reference: &Field) -> VolcstatResult<Field> {
        self.area_average(&mask_to_reference(target, reference)?)
    }

    /// Area average of a latitude x longitude x time field, taking the zonal mean first
    pub fn zonal_area_average(&self, field: &Field) -> VolcstatResult<Field> {
        self.area_average(&field.nanmean_over(&[Dimension::Longitude])?)
    }

    /// E-folding time of a daily series, skipping the configured pre-onset days
    pub fn e_folding_time(&self, series: &[FloatValue]) -> VolcstatResult<usize> {
        DecayCurve::after_onset(series, self.config.onset_offset)?.e_folding_time()
    }

    /// E-folding time of the area average of a latitude x time field
    pub fn area_average_e_folding_time(&self, field: &Field) -> VolcstatResult<usize> {
        let averaged = self.area_average(field)?;
        if averaged.dims() != [Dimension::Time] {
            return Err(VolcstatError::PreconditionViolation(format!(
                "area average has dimensions {:?}, expected a time series",
                averaged.dims()
            )));
        }
        self.e_folding_time(&averaged.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandConfig;
    use is_close::is_close;

    fn default_analysis() -> PerturbationAnalysis {
        PerturbationAnalysis::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn default_config_is_northern_extratropics() {
        let analysis = default_analysis();
        assert_eq!(analysis.axis(), &LatitudeAxis::one_degree());
        assert_eq!(analysis.band().range(), 120..181);
    }

    #[test]
    fn band_outside_grid() {
        let config = AnalysisConfig {
            band: BandConfig {
                south: 91.0,
                north: 95.0,
            },
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            PerturbationAnalysis::new(config),
            Err(VolcstatError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn zonal_then_area_average() {
        let analysis = default_analysis();
        let field = Field::from_shape_vec(
            &[181, 2, 3],
            vec![Dimension::Latitude, Dimension::Longitude, Dimension::Time],
            (0..181 * 2 * 3)
                .map(|i| if i % 2 == 0 { 1.0 } else { FloatValue::NAN })
                .collect(),
        )
        .unwrap();
        let averaged = analysis.zonal_area_average(&field).unwrap();
        assert_eq!(averaged.dims(), &[Dimension::Time]);
        assert!(averaged.values().iter().all(|v| is_close!(*v, 1.0)));
    }

    #[test]
    fn e_folding_skips_onset() {
        let analysis = default_analysis();
        let mut series = vec![50.0; 20];
        series.extend((0..40).map(|t| 4.0 * (-(t as FloatValue) / 9.0).exp()));
        assert_eq!(analysis.e_folding_time(&series).unwrap(), 9);
    }

    #[test]
    fn e_folding_of_area_average() {
        let analysis = default_analysis();
        let field = Field::from_shape_vec(
            &[181, 60],
            vec![Dimension::Latitude, Dimension::Time],
            (0..181 * 60)
                .map(|i| {
                    let day = i % 60;
                    if day < 20 {
                        0.0
                    } else {
                        2.0 * (-((day - 20) as FloatValue) / 7.0).exp()
                    }
                })
                .collect(),
        )
        .unwrap();
        assert_eq!(analysis.area_average_e_folding_time(&field).unwrap(), 7);

        let profile = Field::from_shape_vec(
            &[181, 2, 3],
            vec![Dimension::Latitude, Dimension::Altitude, Dimension::Time],
            vec![1.0; 181 * 2 * 3],
        )
        .unwrap();
        assert!(matches!(
            analysis.area_average_e_folding_time(&profile),
            Err(VolcstatError::PreconditionViolation(_))
        ));
    }
}
