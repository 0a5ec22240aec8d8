//! Errors for spectral data handling.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectralError {
    /// A reflectance or power sample is negative or not finite.
    #[error("invalid spectral sample at {wavelength} nm: {value}")]
    InvalidSample { wavelength: u32, value: f64 },

    /// A curve has no samples at all.
    #[error("spectral curve has no samples")]
    Empty,

    /// Only the CIE 1931 2° observer is tabulated.
    #[error("spectral integration supports only the 2° observer")]
    UnsupportedObserver,

    /// The illuminant contributes no luminance on the grid.
    #[error("illuminant '{0}' has zero luminance on the sampling grid")]
    ZeroLuminance(String),

    /// Color temperature outside the supported blackbody range.
    #[error("color temperature {0} K outside 1000..=25000 K")]
    InvalidTemperature(f64),
}
