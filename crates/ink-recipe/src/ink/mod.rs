//! Inks, concentration tiers and catalogs.

mod catalog;
mod error;
#[allow(clippy::module_inception)]
mod ink;
mod region;
mod tier;

pub use catalog::{InkCatalog, InkSet};
pub use error::CatalogError;
pub use ink::{Ink, InkType, SUBSTRATE_WHITE, WHITE_MAX_CHROMA, WHITE_MIN_LIGHTNESS};
pub use region::{ColorRegion, RegionTable};
pub use tier::ConcentrationTier;
