use super::{sort_newest_first, Record, RecordStore};
use crate::error::{WardError, WardResult};
use dashmap::DashMap;
use ward_uuid::RecordId;

#[derive(Clone, Debug)]
struct StoredRecord {
    patient_id: RecordId,
    json: serde_json::Value,
}

/// Process-local store backed by a concurrent map.
///
/// Records are held in serialised form so each `get` hands out an independent copy.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<(&'static str, RecordId), StoredRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryStore {
    fn get<R: Record>(&self, id: RecordId) -> WardResult<R> {
        let value = self
            .records
            .get(&(R::COLLECTION, id))
            .map(|entry| entry.json.clone())
            .ok_or_else(|| WardError::not_found(R::KIND, id))?;
        serde_json::from_value(value).map_err(WardError::Deserialization)
    }

    fn put<R: Record>(&self, record: &R) -> WardResult<()> {
        let value = serde_json::to_value(record).map_err(WardError::Serialization)?;
        self.records.insert(
            (R::COLLECTION, record.id()),
            StoredRecord {
                patient_id: record.patient_id(),
                json: value,
            },
        );
        Ok(())
    }

    fn list_for_patient<R: Record>(&self, patient_id: RecordId) -> WardResult<Vec<R>> {
        let values: Vec<serde_json::Value> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == R::COLLECTION && entry.patient_id == patient_id)
            .map(|entry| entry.json.clone())
            .collect();

        let mut records = values
            .into_iter()
            .map(|v| serde_json::from_value::<R>(v).map_err(WardError::Deserialization))
            .collect::<WardResult<Vec<R>>>()?;
        sort_newest_first(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::exercise_store;

    #[test]
    fn test_in_memory_store_contract() {
        exercise_store(&InMemoryStore::new());
    }
}
