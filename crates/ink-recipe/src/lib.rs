//! ink-recipe: ink recipe matching for print production
//!
//! Given a target color and a catalog of inks, find which inks, at which
//! concentration tiers and in which ratios, reproduce the target with the
//! smallest perceptible error. After a print is measured, propose
//! additions that close the remaining gap.
//!
//! # Quick Start
//!
//! The [`RecipeEngine`] builder is the primary entry point:
//!
//! ```
//! use ink_recipe::{Ink, InkSet, InkType, LabColor, OptimizationConstraints, RecipeEngine};
//!
//! let ink = |id: &str, l, a, b| {
//!     Ink::full_strength(id, id, InkType::Process, LabColor::new(l, a, b)).unwrap()
//! };
//! let catalog = InkSet::new(vec![
//!     ink("cyan", 55.0, -37.0, -50.0),
//!     ink("magenta", 48.0, 74.0, -3.0),
//!     ink("yellow", 89.0, -5.0, 93.0),
//! ])
//! .unwrap();
//!
//! let engine = RecipeEngine::new(catalog);
//! let outcome = engine
//!     .calculate_optimized_recipes(
//!         LabColor::new(60.0, -40.0, 30.0),
//!         &OptimizationConstraints::default(),
//!     )
//!     .unwrap();
//!
//! let best = outcome.best().unwrap();
//! let total: f64 = best.inks().iter().map(|r| r.ratio).sum();
//! assert!((total - 100.0).abs() < 1e-9);
//! ```
//!
//! # Modules
//!
//! Leaves first:
//!
//! - [`color`]: CIELAB, XYZ and sRGB conversions, Bradford adaptation and
//!   Delta E (CIE76, CIE94, CIEDE2000, CMC).
//! - [`spectral`]: the 380–780 nm grid, CIE observer and illuminant
//!   tables, reflectance estimation from Lab and metamerism.
//! - [`ink`]: inks with tier-keyed measurements, catalogs and the palette
//!   region table.
//! - [`mixing`]: Kubelka–Munk mixing models.
//! - [`recipe`]: normalized, immutable recipes.
//! - [`optimize`]: constrained recipe search with cancellation and a
//!   result cache.
//! - [`correction`]: feasibility analysis and corrective additions for a
//!   measured print.
//!
//! # Mixing
//!
//! All models follow Kubelka–Munk two-flux theory. An ink layer is
//! described by absorption K and scattering S, and for an opaque layer the
//! internal reflectance depends only on their ratio:
//!
//! ```text
//! K/S = (1 - R)^2 / (2R)
//! R   = 1 + K/S - sqrt((1 + K/S)^2 - 1)
//! ```
//!
//! K and S of a mixture are the weight-averaged K and S of its inks. The
//! Saunderson correction converts between measured and internal
//! reflectance:
//!
//! ```text
//! R_meas = k1 + (1 - k1)(1 - k2) R / (1 - k2 R)      k1 = 0.01, k2 = 0.4
//! ```
//!
//! | Model | Channels | Reflectance source | Confidence |
//! |-------|----------|--------------------|------------|
//! | Basic | 3 Bradford cone responses | Lab of each ink | 0.6 |
//! | Spectral | 41 wavelengths | measured curve, else estimated from Lab | 0.9 / 0.7 |
//! | Fluorescent | 41 wavelengths | as spectral, plus emission | 0.9 / 0.7 |
//!
//! Missing spectral data lowers confidence by 0.2 and is listed in the
//! prediction's [`DataQuality`](spectral::DataQuality).
//!
//! # Search
//!
//! ```text
//! candidates (ranked by hue, lightness, preferred region)
//!     |
//!     v
//! subsets of 1..=maxInkCount  x  tier assignments   -> branches
//!     |
//!     v
//! per-branch ensemble search over the ratio simplex   (rayon, seeded)
//!     |
//!     v
//! normalize -> TAC repair -> re-predict -> dedup -> rank by Delta E
//! ```
//!
//! Each branch's random seed depends only on the configured seed and the
//! branch's own inks and tiers, so results do not change when unrelated
//! inks are added to the catalog.

pub mod api;
pub mod color;
pub mod correction;
pub mod ink;
pub mod mixing;
pub mod optimize;
pub mod recipe;
pub mod spectral;


pub use api::{EngineError, RecipeEngine};
pub use color::{delta_e, ColorError, DeltaEMethod, DeltaEWeights, Illuminant, LabColor, Srgb, WhitePoint, XyzColor};
pub use correction::{
    CorrectionAnalysis, CorrectionError, CorrectionSettings, CorrectionSuggestion, Feasibility,
    InfeasibleReason,
};
pub use ink::{CatalogError, ConcentrationTier, Ink, InkCatalog, InkSet, InkType, RegionTable};
pub use mixing::{MixPrediction, MixingModel, MixingModelKind};
pub use optimize::{
    CancelToken, NoResultReason, OptimizationConstraints, OptimizationOutcome, RecipeCache,
    SearchOptions,
};
pub use recipe::{InkRatio, Recipe, RecipeError};
pub use spectral::{MetamerismReport, SpectralCurve, SpectralError};
