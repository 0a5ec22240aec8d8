pub mod catalog;
pub mod config;
pub mod record;

pub use catalog::InkCatalogFile;
pub use config::{AppConfig, CacheConfig, DefaultsConfig, EngineConfig, SearchConfig};
pub use record::{RecipeRecord, RecordInk, RecordStatus};
