pub mod analysis;
pub mod averaging;
pub mod config;
pub mod efolding;
pub mod field;
pub mod latitude;
pub mod masking;
pub mod optics;
#[cfg(feature = "python")]
pub mod python;

pub mod errors;
