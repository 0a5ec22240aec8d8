//! Public facade: [`RecipeEngine`] and the unified [`EngineError`].

mod engine;
mod error;

pub use engine::RecipeEngine;
pub use error::EngineError;
