//! Analysis configuration
//!
//! Every setting has a default matching the daily 1° products, so an empty
//! TOML document is a valid configuration.
//!
//! ```toml
//! onset_offset = 20
//!
//! [latitude]
//! start = -90.0
//! step = 1.0
//! count = 181
//!
//! [band]
//! south = 30.0
//! north = 90.0
//! ```

use crate::errors::{VolcstatError, VolcstatResult};
use crate::field::FloatValue;
use crate::latitude::LatitudeAxis;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Regular latitude grid of the input fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatitudeConfig {
    /// Southernmost latitude
    /// unit: degrees north
    pub start: FloatValue,
    /// Grid spacing
    /// unit: degrees
    pub step: FloatValue,
    /// Number of latitudes
    pub count: usize,
}

impl Default for LatitudeConfig {
    fn default() -> Self {
        Self {
            start: -90.0,
            step: 1.0,
            count: 181,
        }
    }
}

impl LatitudeConfig {
    pub fn axis(&self) -> VolcstatResult<LatitudeAxis> {
        LatitudeAxis::regular(self.start, self.step, self.count)
    }
}

/// Latitude band averaged over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BandConfig {
    /// unit: degrees north
    pub south: FloatValue,
    /// unit: degrees north
    pub north: FloatValue,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            south: 30.0,
            north: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Number of leading samples before the eruption, dropped before estimating decay times
    pub onset_offset: usize,
    pub latitude: LatitudeConfig,
    pub band: BandConfig,
}

impl AnalysisConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> VolcstatResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| VolcstatError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> VolcstatResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| VolcstatError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("Loaded analysis configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> VolcstatResult<String> {
        toml::to_string(self).map_err(|e| VolcstatError::Config(e.to_string()))
    }

    pub fn validate(&self) -> VolcstatResult<()> {
        if self.latitude.count == 0 {
            return Err(VolcstatError::Config(
                "latitude.count must be at least 1".to_string(),
            ));
        }
        if !(self.latitude.step > 0.0) {
            return Err(VolcstatError::Config(format!(
                "latitude.step must be positive, got {}",
                self.latitude.step
            )));
        }
        if self.band.south > self.band.north {
            return Err(VolcstatError::Config(format!(
                "band.south ({}) is north of band.north ({})",
                self.band.south, self.band.north
            )));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            onset_offset: 20,
            latitude: LatitudeConfig::default(),
            band: BandConfig::default(),
        }
    }
}
