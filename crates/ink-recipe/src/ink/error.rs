//! Errors for ink definitions and catalogs.

use thiserror::Error;

use crate::color::ColorError;
use crate::spectral::SpectralError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("ink id must not be empty")]
    EmptyId,

    /// Every ink needs a full-strength measurement.
    #[error("ink '{0}' has no measurement at tier 100")]
    MissingFullStrength(String),

    #[error("concentration tier {0} outside 1..=100")]
    InvalidTier(u32),

    #[error("duplicate ink id '{0}'")]
    DuplicateId(String),

    #[error("unknown ink '{0}'")]
    UnknownInk(String),

    #[error("unknown ink type '{0}'")]
    UnknownType(String),

    #[error("ink '{id}': {source}")]
    Color {
        id: String,
        #[source]
        source: ColorError,
    },

    #[error("ink '{id}': {source}")]
    Spectral {
        id: String,
        #[source]
        source: SpectralError,
    },
}
