//! Spectral reflectance handling
//!
//! Everything here works on a fixed 380–780 nm grid at 10 nm steps with
//! the CIE 1931 2° observer. Curves with other sampling are resampled onto
//! the grid, and gaps are reported through [`DataQuality`] rather than
//! silently filled.

mod curve;
pub(crate) mod data;
mod error;
mod estimator;
mod illuminant;
mod integrate;
mod metamerism;

pub use curve::{Resampled, SpectralCurve, Spectrum};
pub use data::{wavelength, GRID_LEN, GRID_START, GRID_STEP};
pub use error::SpectralError;
pub use estimator::{
    dominant_wavelength, Estimate, GaussianEstimator, ReflectanceEstimator, SigmoidEstimator,
    POOR_FIT_RESIDUAL,
};
pub use illuminant::{IlluminantSpd, WeightTable};
pub use integrate::{integrate_curve, DataQuality, Integrated};
pub use metamerism::{
    default_illuminants, metamerism_index, IlluminantDifference, MetamerismReport,
    METAMERISM_THRESHOLD,
};
