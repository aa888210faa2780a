use super::{get_patient, locked_update};
use crate::acting_user::ActingUser;
use crate::admission::{AdmissionRecord, NewAdmission};
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::error::WardResult;
use crate::locks::RecordLocks;
use crate::progress::LengthOfStay;
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ward_uuid::RecordId;

pub struct AdmissionService<S> {
    store: Arc<S>,
    locks: RecordLocks,
    audit: Arc<dyn AuditSink>,
}

impl<S: RecordStore> AdmissionService<S> {
    pub fn new(store: Arc<S>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            locks: RecordLocks::new(),
            audit,
        }
    }

    pub fn get(&self, id: RecordId) -> WardResult<AdmissionRecord> {
        self.store.get(id)
    }

    /// Admissions for a patient, most recent admission first.
    pub fn list_for_patient(&self, patient_id: RecordId) -> WardResult<Vec<AdmissionRecord>> {
        self.store.list_for_patient(patient_id)
    }

    pub fn admit(
        &self,
        patient_id: RecordId,
        new: NewAdmission,
        user: &ActingUser,
    ) -> WardResult<AdmissionRecord> {
        get_patient(self.store.as_ref(), patient_id)?;
        let admission = AdmissionRecord::admit(patient_id, new, user, Utc::now())?;
        self.store.put(&admission)?;

        tracing::debug!("admitted patient {} to {}", patient_id, admission.ward_location);
        self.audit.emit(
            AuditEvent::new(user, AuditAction::PatientAdmitted, admission.id, patient_id)
                .with_detail(admission.ward_location.to_string()),
        );
        Ok(admission)
    }

    pub fn request_discharge(
        &self,
        id: RecordId,
        expected: Option<DateTime<Utc>>,
        user: &ActingUser,
    ) -> WardResult<AdmissionRecord> {
        let (_, after) = locked_update(self.store.as_ref(), &self.locks, id, |a: &AdmissionRecord| {
            a.request_discharge(expected, user, Utc::now())
        })?;
        self.audit.emit(AuditEvent::new(
            user,
            AuditAction::DischargeRequested,
            after.id,
            after.patient_id,
        ));
        Ok(after)
    }

    pub fn discharge(
        &self,
        id: RecordId,
        at: DateTime<Utc>,
        user: &ActingUser,
    ) -> WardResult<AdmissionRecord> {
        let (_, after) = locked_update(self.store.as_ref(), &self.locks, id, |a: &AdmissionRecord| {
            a.discharge(at, user)
        })?;
        tracing::debug!("discharged admission {}", id);
        self.audit.emit(AuditEvent::new(
            user,
            AuditAction::PatientDischarged,
            after.id,
            after.patient_id,
        ));
        Ok(after)
    }

    pub fn length_of_stay(&self, id: RecordId, now: DateTime<Utc>) -> WardResult<LengthOfStay> {
        Ok(LengthOfStay::of(&self.get(id)?, now))
    }
}
