//! Store-backed services.
//!
//! Each service loads a record, applies a pure transition, persists the result
//! and emits an audit event. The read-modify-write runs under the record's lock;
//! audit emission happens after the lock is released.

mod admission;
mod status;
mod transfusion;
mod treatment_plan;

pub use admission::AdmissionService;
pub use status::{CurrentStatus, PatientStatus, PatientStatusService, PlanProgress};
pub use transfusion::TransfusionService;
pub use treatment_plan::TreatmentPlanService;

use crate::error::WardResult;
use crate::locks::RecordLocks;
use crate::patient::PatientSummary;
use crate::store::{Record, RecordStore};
use ward_uuid::RecordId;

/// Loads, transforms and stores one record under its lock.
///
/// Returns the stored version. On error nothing is written.
pub(crate) fn locked_update<S, R, F>(
    store: &S,
    locks: &RecordLocks,
    id: RecordId,
    f: F,
) -> WardResult<(R, R)>
where
    S: RecordStore,
    R: Record,
    F: FnOnce(&R) -> WardResult<R>,
{
    locks.with_lock(id, || {
        let current: R = store.get(id)?;
        let next = f(&current)?;
        store.put(&next)?;
        Ok((current, next))
    })
}

pub(crate) fn get_patient<S: RecordStore>(store: &S, id: RecordId) -> WardResult<PatientSummary> {
    store.get::<PatientSummary>(id)
}
