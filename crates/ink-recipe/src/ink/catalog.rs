//! Ink catalog abstraction and the in-memory [`InkSet`].

use std::collections::HashMap;

use super::error::CatalogError;
use super::ink::{Ink, InkType};

/// Read-only source of inks.
pub trait InkCatalog {
    fn inks(&self) -> &[Ink];

    fn get(&self, id: &str) -> Option<&Ink> {
        self.inks().iter().find(|ink| ink.id() == id)
    }

    fn by_type(&self, ink_type: InkType) -> Vec<&Ink> {
        self.inks()
            .iter()
            .filter(|ink| ink.ink_type() == ink_type)
            .collect()
    }

    /// Resolve a list of ids, failing on the first unknown one.
    fn select(&self, ids: &[String]) -> Result<Vec<Ink>, CatalogError> {
        ids.iter()
            .map(|id| {
                self.get(id)
                    .cloned()
                    .ok_or_else(|| CatalogError::UnknownInk(id.clone()))
            })
            .collect()
    }
}

/// Catalog backed by a vector with an id index. Ids are unique.
#[derive(Debug, Clone, Default)]
pub struct InkSet {
    inks: Vec<Ink>,
    index: HashMap<String, usize>,
}

impl InkSet {
    pub fn new(inks: Vec<Ink>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(inks.len());
        for (i, ink) in inks.iter().enumerate() {
            if index.insert(ink.id().to_string(), i).is_some() {
                return Err(CatalogError::DuplicateId(ink.id().to_string()));
            }
        }
        Ok(Self { inks, index })
    }

    pub fn len(&self) -> usize {
        self.inks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.inks.iter().map(Ink::id)
    }
}

impl InkCatalog for InkSet {
    fn inks(&self) -> &[Ink] {
        &self.inks
    }

    fn get(&self, id: &str) -> Option<&Ink> {
        self.index.get(id).map(|&i| &self.inks[i])
    }
}

impl InkCatalog for Vec<Ink> {
    fn inks(&self) -> &[Ink] {
        self
    }
}

impl InkCatalog for [Ink] {
    fn inks(&self) -> &[Ink] {
        self
    }
}
