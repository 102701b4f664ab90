use super::{Record, Store};
use crate::{ClinicError, ClinicResult};
use clinic_uuid::RecordId;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-process store backed by an ordered map.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: RwLock<BTreeMap<RecordId, T>>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ClinicResult<RwLockReadGuard<'_, BTreeMap<RecordId, T>>> {
        self.records
            .read()
            .map_err(|_| ClinicError::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> ClinicResult<RwLockWriteGuard<'_, BTreeMap<RecordId, T>>> {
        self.records
            .write()
            .map_err(|_| ClinicError::Storage("memory store lock poisoned".into()))
    }
}

impl<T: Record> Store<T> for MemoryStore<T> {
    fn insert(&self, record: T) -> ClinicResult<()> {
        let mut records = self.write()?;
        let id = record.id();
        if records.contains_key(&id) {
            return Err(ClinicError::Conflict(format!("{} {} already exists", T::KIND, id)));
        }
        records.insert(id, record);
        Ok(())
    }

    fn get(&self, id: &RecordId) -> ClinicResult<Option<T>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn update(&self, record: T) -> ClinicResult<()> {
        let mut records = self.write()?;
        match records.get_mut(&record.id()) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(ClinicError::not_found(T::KIND, record.id())),
        }
    }

    fn list(&self) -> ClinicResult<Vec<T>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn remove(&self, id: &RecordId) -> ClinicResult<()> {
        self.write()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ClinicError::not_found(T::KIND, id))
    }

    fn count(&self) -> ClinicResult<usize> {
        Ok(self.read()?.len())
    }
}
