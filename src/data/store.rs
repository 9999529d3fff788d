//! Pet record persistence seam. The battle core never touches this; it is
//! used by the ability-assignment API route, which reads and writes a pet's
//! assigned ability outside of battle.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::data::DataError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PetRecord {
    pub pet_id: u64,
    pub species_id: u32,
    pub level: u32,
    /// Capture timestamp (unix seconds); unique per owner, used as the lookup
    /// key inside a record.
    pub captured_at: i64,
    #[serde(default)]
    pub ability: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerRecord {
    pub owner_id: u64,
    pub pets: Vec<PetRecord>,
}

impl OwnerRecord {
    /// Find a pet within the record by its capture timestamp.
    pub fn find_pet(&self, captured_at: i64) -> Option<&PetRecord> {
        self.pets.iter().find(|p| p.captured_at == captured_at)
    }

    pub fn find_pet_mut(&mut self, captured_at: i64) -> Option<&mut PetRecord> {
        self.pets.iter_mut().find(|p| p.captured_at == captured_at)
    }
}

/// Key-value pet record store, keyed by owner id.
pub trait PetStore: Send + Sync {
    fn load_record(&self, owner_id: u64) -> Option<OwnerRecord>;
    fn persist_record(&self, record: OwnerRecord) -> Result<(), DataError>;
}

/// In-memory store for tests and the standalone server.
#[derive(Debug, Default)]
pub struct MemoryPetStore {
    records: Mutex<HashMap<u64, OwnerRecord>>,
}

impl MemoryPetStore {
    pub fn new() -> MemoryPetStore {
        MemoryPetStore::default()
    }

    pub fn with_records(records: Vec<OwnerRecord>) -> MemoryPetStore {
        let map = records.into_iter().map(|r| (r.owner_id, r)).collect();
        MemoryPetStore { records: Mutex::new(map) }
    }
}

impl PetStore for MemoryPetStore {
    fn load_record(&self, owner_id: u64) -> Option<OwnerRecord> {
        self.records.lock().ok()?.get(&owner_id).cloned()
    }

    fn persist_record(&self, record: OwnerRecord) -> Result<(), DataError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| DataError::Store("pet store lock poisoned".to_string()))?;
        records.insert(record.owner_id, record);
        Ok(())
    }
}

/// Assign an ability to one pet in one owner record, persisting the change.
pub fn assign_ability(
    store: &dyn PetStore,
    owner_id: u64,
    captured_at: i64,
    ability: &str,
) -> Result<(), DataError> {
    let mut record = store
        .load_record(owner_id)
        .ok_or_else(|| DataError::Store(format!("no record for owner {owner_id}")))?;
    let pet = record
        .find_pet_mut(captured_at)
        .ok_or_else(|| DataError::Store(format!("no pet captured at {captured_at}")))?;
    pet.ability = Some(ability.to_string());
    store.persist_record(record)
}
