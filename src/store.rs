//! Read access to animal and breeding data.
//!
//! Analyses only ever read through [`HerdStore`]; `PgStore` in `db.rs` is the
//! production implementation and [`MemoryStore`] backs tests and demos.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Animal, AnimalFilter, BreedingRecord};

#[async_trait]
pub trait HerdStore: Send + Sync {
    async fn get_animal_by_id(&self, id: Uuid) -> Result<Option<Animal>, StoreError>;

    async fn get_animals_by_filter(&self, filter: &AnimalFilter) -> Result<Vec<Animal>, StoreError>;

    /// Newest breeding date first.
    async fn get_breeding_records(&self) -> Result<Vec<BreedingRecord>, StoreError>;

    async fn get_animal_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    animals: Vec<Animal>,
    breedings: Vec<BreedingRecord>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_animals(animals: Vec<Animal>) -> Self {
        Self {
            animals,
            ..Self::default()
        }
    }

    pub fn add_animal(&mut self, animal: Animal) {
        self.animals.retain(|existing| existing.id != animal.id);
        self.animals.push(animal);
    }

    pub fn add_breeding(&mut self, record: BreedingRecord) {
        self.breedings.push(record);
    }

    /// Every read fails afterwards, mimicking a lost connection.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HerdStore for MemoryStore {
    async fn get_animal_by_id(&self, id: Uuid) -> Result<Option<Animal>, StoreError> {
        self.ensure_available()?;
        Ok(self.animals.iter().find(|animal| animal.id == id).cloned())
    }

    async fn get_animals_by_filter(
        &self,
        filter: &AnimalFilter,
    ) -> Result<Vec<Animal>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .animals
            .iter()
            .filter(|animal| filter.matches(animal))
            .cloned()
            .collect())
    }

    async fn get_breeding_records(&self) -> Result<Vec<BreedingRecord>, StoreError> {
        self.ensure_available()?;
        let mut records = self.breedings.clone();
        records.sort_by(|a, b| b.breeding_date.cmp(&a.breeding_date));
        Ok(records)
    }

    async fn get_animal_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .animals
            .iter()
            .filter(|animal| ids.contains(&animal.id))
            .map(|animal| (animal.id, animal.name.clone()))
            .collect())
    }
}
