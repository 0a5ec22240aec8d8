use crate::error::ApiError;
use async_trait::async_trait;
use ink_recipe::{Ink, InkCatalog, InkSet, InkType};
use std::sync::Arc;

/// Read access to the ink catalog for request handlers
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All inks in catalog order
    async fn inks(&self) -> Result<Vec<Ink>, ApiError>;

    /// Find an ink by id
    async fn get(&self, id: &str) -> Result<Option<Ink>, ApiError>;

    /// Inks of one type
    async fn by_type(&self, ink_type: InkType) -> Result<Vec<Ink>, ApiError>;
}

/// Catalog loaded once at startup and never modified
pub struct StaticCatalog {
    inks: Arc<InkSet>,
}

impl StaticCatalog {
    pub fn new(inks: InkSet) -> Self {
        Self {
            inks: Arc::new(inks),
        }
    }

    pub fn len(&self) -> usize {
        self.inks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inks.is_empty()
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn inks(&self) -> Result<Vec<Ink>, ApiError> {
        Ok(self.inks.inks().to_vec())
    }

    async fn get(&self, id: &str) -> Result<Option<Ink>, ApiError> {
        Ok(InkCatalog::get(self.inks.as_ref(), id).cloned())
    }

    async fn by_type(&self, ink_type: InkType) -> Result<Vec<Ink>, ApiError> {
        Ok(InkCatalog::by_type(self.inks.as_ref(), ink_type)
            .into_iter()
            .cloned()
            .collect())
    }
}
