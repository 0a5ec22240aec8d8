pub mod calculation;
pub mod catalog;

pub use calculation::CalculationService;
pub use catalog::{CatalogProvider, StaticCatalog};
