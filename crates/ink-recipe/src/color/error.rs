//! Error types for color validation and conversion.

use thiserror::Error;

use super::xyz::WhitePoint;

/// Error returned when a color value is malformed or a conversion is
/// requested across incompatible reference whites.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    /// A component is NaN or infinite.
    #[error("{field} must be finite")]
    NotFinite {
        /// Component name (`L`, `a`, `b`, `X`, ...)
        field: &'static str,
    },

    /// A component lies outside its valid domain.
    #[error("{field} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Component name
        field: &'static str,
        /// Offending value
        value: f64,
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },

    /// A tristimulus value is negative.
    #[error("{field} = {value} must not be negative")]
    Negative { field: &'static str, value: f64 },

    /// The color is referenced to a different white than the conversion expects.
    #[error("white point mismatch: expected {expected}, found {found}")]
    WhitePointMismatch {
        expected: WhitePoint,
        found: WhitePoint,
    },

    /// A hex color string could not be parsed.
    #[error("invalid hex color '{0}' (expected #RGB or #RRGGBB)")]
    InvalidHex(String),

    /// An illuminant or observer name is not recognised.
    #[error("unknown illuminant '{0}'")]
    UnknownIlluminant(String),
}
