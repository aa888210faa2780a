//! Storage collaborator.
//!
//! The core is storage-agnostic: it needs a key-addressable store with one
//! secondary index (by patient) per collection. [`RecordStore`] is that seam;
//! [`InMemoryStore`] and [`FileStore`] are the two implementations shipped here.
//!
//! A `put` always replaces the whole record, so a concurrent reader sees either
//! the previous version or the new one, never a half-written bag list.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::InMemoryStore;

use crate::error::{RecordKind, WardResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use ward_uuid::RecordId;

/// An entity that can be persisted in a [`RecordStore`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table/directory) name.
    const COLLECTION: &'static str;
    /// Kind reported in `NotFound` errors.
    const KIND: RecordKind;

    fn id(&self) -> RecordId;
    fn patient_id(&self) -> RecordId;
    /// Date used to order the patient index, newest first.
    fn index_date(&self) -> DateTime<Utc>;
}

/// Key-addressable record storage with a per-collection patient index.
pub trait RecordStore: Send + Sync {
    /// Fetches a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WardError::NotFound`] if no record with that id exists in `R`'s
    /// collection, or a storage error if it cannot be read.
    fn get<R: Record>(&self, id: RecordId) -> WardResult<R>;

    /// Inserts or replaces a record.
    fn put<R: Record>(&self, record: &R) -> WardResult<()>;

    /// Lists every record in `R`'s collection belonging to `patient_id`,
    /// newest `index_date` first.
    fn list_for_patient<R: Record>(&self, patient_id: RecordId) -> WardResult<Vec<R>>;
}

pub(crate) fn sort_newest_first<R: Record>(records: &mut [R]) {
    records.sort_by(|a, b| {
        b.index_date()
            .cmp(&a.index_date())
            .then_with(|| a.id().cmp(&b.id()))
    });
}
