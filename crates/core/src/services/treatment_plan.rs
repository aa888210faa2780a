use super::{get_patient, locked_update};
use crate::acting_user::ActingUser;
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::error::WardResult;
use crate::locks::RecordLocks;
use crate::store::RecordStore;
use crate::treatment_plan::{NewTreatmentPlan, TreatmentPlanExecution};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ward_uuid::RecordId;

pub struct TreatmentPlanService<S> {
    store: Arc<S>,
    locks: RecordLocks,
    audit: Arc<dyn AuditSink>,
}

impl<S: RecordStore> TreatmentPlanService<S> {
    pub fn new(store: Arc<S>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            locks: RecordLocks::new(),
            audit,
        }
    }

    pub fn get(&self, id: RecordId) -> WardResult<TreatmentPlanExecution> {
        self.store.get(id)
    }

    pub fn list_for_patient(&self, patient_id: RecordId) -> WardResult<Vec<TreatmentPlanExecution>> {
        self.store.list_for_patient(patient_id)
    }

    pub fn create_plan(
        &self,
        patient_id: RecordId,
        new: NewTreatmentPlan,
        user: &ActingUser,
    ) -> WardResult<TreatmentPlanExecution> {
        get_patient(self.store.as_ref(), patient_id)?;
        let plan = TreatmentPlanExecution::create(patient_id, new, user, Utc::now())?;
        self.store.put(&plan)?;

        self.audit.emit(
            AuditEvent::new(user, AuditAction::PlanCreated, plan.id, patient_id)
                .with_detail(plan.title.to_string()),
        );
        Ok(plan)
    }

    pub fn update_progress(
        &self,
        id: RecordId,
        completed_steps: u32,
        overdue_steps: u32,
        now: DateTime<Utc>,
        user: &ActingUser,
    ) -> WardResult<TreatmentPlanExecution> {
        let (_, after) = locked_update(
            self.store.as_ref(),
            &self.locks,
            id,
            |p: &TreatmentPlanExecution| p.update_progress(completed_steps, overdue_steps, user, now),
        )?;
        tracing::debug!(
            "plan {} progress {}/{} ({} overdue, {})",
            id,
            after.completed_steps,
            after.total_steps,
            after.overdue_steps,
            after.status
        );
        self.audit.emit(
            AuditEvent::new(user, AuditAction::PlanProgressUpdated, after.id, after.patient_id)
                .with_detail(format!("{}/{}", after.completed_steps, after.total_steps)),
        );
        Ok(after)
    }
}
