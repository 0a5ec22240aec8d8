//! Unified error type for the engine facade.

use thiserror::Error;

use crate::color::ColorError;
use crate::correction::CorrectionError;
use crate::ink::CatalogError;
use crate::mixing::MixError;
use crate::optimize::{ConstraintError, OptimizeError};
use crate::recipe::RecipeError;
use crate::spectral::SpectralError;

/// Every error a [`RecipeEngine`](super::RecipeEngine) operation can
/// return, so application code can use one `?` target.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Color(#[from] ColorError),

    #[error(transparent)]
    Spectral(#[from] SpectralError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    Mix(#[from] MixError),

    #[error(transparent)]
    Correction(#[from] CorrectionError),
}

impl From<OptimizeError> for EngineError {
    fn from(err: OptimizeError) -> Self {
        match err {
            OptimizeError::Target(e) => EngineError::Color(e),
            OptimizeError::Constraint(e) => EngineError::Constraint(e),
            OptimizeError::Mix(e) => EngineError::Mix(e),
        }
    }
}

impl EngineError {
    /// True when an ink id was not found in the catalog.
    pub fn is_unknown_ink(&self) -> bool {
        matches!(
            self,
            EngineError::Catalog(CatalogError::UnknownInk(_))
                | EngineError::Correction(CorrectionError::UnknownInk(_))
        )
    }

    /// True for engine faults as opposed to bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            EngineError::Correction(CorrectionError::InvalidTransition { .. })
        )
    }
}
