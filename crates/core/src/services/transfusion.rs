use super::{get_patient, locked_update};
use crate::acting_user::ActingUser;
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::blood::BloodType;
use crate::error::WardResult;
use crate::locks::RecordLocks;
use crate::store::RecordStore;
use crate::transfusion::{
    BloodBagInput, CompatibilityCheck, ComplicationInput, NewTransfusion, SafetyChecklist,
    TransfusionRecord, TransfusionWorkflow, VitalsSnapshot,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ward_uuid::RecordId;

/// Transfusion operations over a [`RecordStore`].
pub struct TransfusionService<S> {
    store: Arc<S>,
    locks: RecordLocks,
    audit: Arc<dyn AuditSink>,
}

impl<S: RecordStore> TransfusionService<S> {
    pub fn new(store: Arc<S>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            locks: RecordLocks::new(),
            audit,
        }
    }

    pub fn get(&self, id: RecordId) -> WardResult<TransfusionRecord> {
        self.store.get(id)
    }

    /// Every transfusion for the patient, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WardError::NotFound`] if the patient does not exist.
    pub fn history(&self, patient_id: RecordId) -> WardResult<Vec<TransfusionRecord>> {
        get_patient(self.store.as_ref(), patient_id)?;
        self.store.list_for_patient(patient_id)
    }

    /// Plans a transfusion for an existing patient.
    pub fn plan(
        &self,
        patient_id: RecordId,
        new: NewTransfusion,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        let patient = get_patient(self.store.as_ref(), patient_id)?;
        let record = TransfusionWorkflow::plan(&patient, new, user, Utc::now())?;
        self.store.put(&record)?;

        tracing::debug!("planned transfusion {} for patient {}", record.id(), patient_id);
        self.audit.emit(AuditEvent::new(
            user,
            AuditAction::TransfusionPlanned,
            record.id(),
            patient_id,
        ));
        Ok(record)
    }

    pub fn check_compatibility(
        &self,
        id: RecordId,
        donor: BloodType,
    ) -> WardResult<CompatibilityCheck> {
        let record = self.get(id)?;
        Ok(TransfusionWorkflow::check_compatibility(&record, donor))
    }

    pub fn add_bag(
        &self,
        id: RecordId,
        input: BloodBagInput,
        override_confirmed: bool,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        let bag_number = input.bag_number.trim().to_string();
        let (before, after) = locked_update(self.store.as_ref(), &self.locks, id, |r| {
            TransfusionWorkflow::add_bag(r, input, override_confirmed, user, Utc::now())
        })?;

        if after.compatibility_overrides().len() > before.compatibility_overrides().len() {
            if let Some(entry) = after.compatibility_overrides().last() {
                tracing::info!(
                    "compatibility override on transfusion {}: donor {} to recipient {} confirmed by {}",
                    id,
                    entry.donor,
                    entry.recipient,
                    user
                );
                self.audit.emit(
                    AuditEvent::new(user, AuditAction::CompatibilityOverride, id, after.patient_id())
                        .with_detail(format!(
                            "bag {}: donor {} to recipient {}",
                            entry.bag_number, entry.donor, entry.recipient
                        )),
                );
            }
        }
        self.emitted(&after, user, AuditAction::BagAdded, Some(format!("bag {bag_number}")));
        Ok(after)
    }

    pub fn remove_bag(
        &self,
        id: RecordId,
        index: usize,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        let (before, after) = locked_update(self.store.as_ref(), &self.locks, id, |r| {
            TransfusionWorkflow::remove_bag(r, index, user, Utc::now())
        })?;
        let detail = before
            .blood_bags()
            .get(index)
            .map(|bag| format!("bag {}", bag.bag_number));
        self.emitted(&after, user, AuditAction::BagRemoved, detail);
        Ok(after)
    }

    pub fn update_checklist(
        &self,
        id: RecordId,
        checklist: SafetyChecklist,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::ChecklistUpdated, |r| {
            TransfusionWorkflow::update_checklist(r, checklist, user, Utc::now())
        })
    }

    pub fn record_vitals(
        &self,
        id: RecordId,
        snapshot: VitalsSnapshot,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::VitalsRecorded, |r| {
            TransfusionWorkflow::record_vitals(r, snapshot, user, Utc::now())
        })
    }

    pub fn record_complication(
        &self,
        id: RecordId,
        input: ComplicationInput,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::ComplicationRecorded, |r| {
            TransfusionWorkflow::record_complication(r, input, user, Utc::now())
        })
    }

    pub fn resolve_complication(
        &self,
        id: RecordId,
        complication_id: RecordId,
        resolved_at: DateTime<Utc>,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::ComplicationResolved, |r| {
            TransfusionWorkflow::resolve_complication(r, complication_id, resolved_at, user, Utc::now())
        })
    }

    pub fn start(
        &self,
        id: RecordId,
        start_time: DateTime<Utc>,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::TransfusionStarted, |r| {
            TransfusionWorkflow::start(r, start_time, user, Utc::now())
        })
    }

    pub fn complete(
        &self,
        id: RecordId,
        end_time: DateTime<Utc>,
        post_hb: Option<f64>,
        user: &ActingUser,
    ) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::TransfusionCompleted, |r| {
            TransfusionWorkflow::complete(r, end_time, post_hb, user, Utc::now())
        })
    }

    pub fn stop(&self, id: RecordId, reason: &str, user: &ActingUser) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::TransfusionStopped, |r| {
            TransfusionWorkflow::stop(r, reason, user, Utc::now())
        })
    }

    pub fn cancel(&self, id: RecordId, reason: &str, user: &ActingUser) -> WardResult<TransfusionRecord> {
        self.transition(id, user, AuditAction::TransfusionCancelled, |r| {
            TransfusionWorkflow::cancel(r, reason, user, Utc::now())
        })
    }

    fn transition<F>(
        &self,
        id: RecordId,
        user: &ActingUser,
        action: AuditAction,
        f: F,
    ) -> WardResult<TransfusionRecord>
    where
        F: FnOnce(&TransfusionRecord) -> WardResult<TransfusionRecord>,
    {
        let (_, after) = locked_update(self.store.as_ref(), &self.locks, id, f)?;
        self.emitted(&after, user, action, None);
        Ok(after)
    }

    fn emitted(
        &self,
        record: &TransfusionRecord,
        user: &ActingUser,
        action: AuditAction,
        detail: Option<String>,
    ) {
        tracing::debug!("{:?} on transfusion {} (status {})", action, record.id(), record.status());
        let mut event = AuditEvent::new(user, action, record.id(), record.patient_id());
        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }
        self.audit.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RecordKind, WardError};
    use crate::services::test_support::{at, audit_channel, drain, nurse, seed_patient};
    use crate::store::InMemoryStore;
    use crate::transfusion::{ComponentType, TransfusionStatus};
    use chrono::NaiveDate;
    use std::thread;

    fn new_transfusion() -> NewTransfusion {
        NewTransfusion {
            indication: "Chemotherapy-induced anaemia".into(),
            baseline_hb: 7.0,
            target_hb: Some(9.0),
            urgent: false,
            history: Default::default(),
        }
    }

    fn bag(number: &str, blood_type: BloodType) -> BloodBagInput {
        BloodBagInput {
            bag_number: number.into(),
            blood_type: Some(blood_type),
            component_type: ComponentType::PackedRbc,
            volume_ml: 300,
            donation_date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2026, 3, 30).unwrap(),
            source: "Hospital blood bank".into(),
            screening_done: true,
            crossmatch_compatible: true,
        }
    }

    #[test]
    fn test_plan_requires_existing_patient() {
        let store = Arc::new(InMemoryStore::new());
        let (sink, _rx) = audit_channel();
        let service = TransfusionService::new(store, sink);

        assert!(matches!(
            service.plan(RecordId::new(), new_transfusion(), &nurse()),
            Err(WardError::NotFound { kind: RecordKind::Patient, .. })
        ));
    }

    #[test]
    fn test_full_workflow_is_persisted_and_audited() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, Some(BloodType::APositive));
        let (sink, mut rx) = audit_channel();
        let service = TransfusionService::new(Arc::clone(&store), sink);
        let user = nurse();

        let record = service.plan(patient.id, new_transfusion(), &user).unwrap();
        let id = record.id();
        service.add_bag(id, bag("B1", BloodType::ONegative), false, &user).unwrap();
        service
            .update_checklist(id, SafetyChecklist::all_confirmed(), &user)
            .unwrap();
        service.start(id, at(10, 8, 0), &user).unwrap();
        let done = service.complete(id, at(10, 8, 45), Some(9.5), &user).unwrap();

        assert_eq!(done.duration_minutes(), Some(45));
        assert_eq!(done.hb_increment(), Some(2.5));
        assert_eq!(service.get(id).unwrap(), done);

        let actions: Vec<AuditAction> = drain(&mut rx).into_iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::TransfusionPlanned,
                AuditAction::BagAdded,
                AuditAction::ChecklistUpdated,
                AuditAction::TransfusionStarted,
                AuditAction::TransfusionCompleted,
            ]
        );
    }

    #[test]
    fn test_stop_is_accepted_when_start_was_recorded_ahead_of_clock() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, Some(BloodType::APositive));
        let (sink, _rx) = audit_channel();
        let service = TransfusionService::new(Arc::clone(&store), sink);
        let user = nurse();

        let id = service.plan(patient.id, new_transfusion(), &user).unwrap().id();
        service.add_bag(id, bag("B1", BloodType::ONegative), false, &user).unwrap();
        service
            .update_checklist(id, SafetyChecklist::all_confirmed(), &user)
            .unwrap();
        let ahead = Utc::now() + chrono::Duration::minutes(5);
        service.start(id, ahead, &user).unwrap();

        let stopped = service.stop(id, "Anaphylaxis", &user).unwrap();
        assert_eq!(stopped.status(), TransfusionStatus::Stopped);
        assert_eq!(stopped.end_time(), Some(ahead));
        assert_eq!(stopped.duration_minutes(), Some(0));
        assert!(stopped.updated_at() < ahead);
    }

    #[test]
    fn test_rejected_transition_leaves_stored_record_untouched() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, Some(BloodType::APositive));
        let (sink, mut rx) = audit_channel();
        let service = TransfusionService::new(Arc::clone(&store), sink);
        let user = nurse();

        let record = service.plan(patient.id, new_transfusion(), &user).unwrap();
        drain(&mut rx);

        assert!(matches!(
            service.start(record.id(), at(10, 8, 0), &user),
            Err(WardError::PreconditionFailed { .. })
        ));
        assert_eq!(service.get(record.id()).unwrap(), record);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_override_is_audited() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, Some(BloodType::ONegative));
        let (sink, mut rx) = audit_channel();
        let service = TransfusionService::new(Arc::clone(&store), sink);
        let user = nurse();
        let id = service.plan(patient.id, new_transfusion(), &user).unwrap().id();

        assert!(matches!(
            service.add_bag(id, bag("B1", BloodType::APositive), false, &user),
            Err(WardError::PreconditionFailed { .. })
        ));
        let record = service
            .add_bag(id, bag("B1", BloodType::APositive), true, &user)
            .unwrap();
        assert_eq!(record.compatibility_overrides().len(), 1);

        let events = drain(&mut rx);
        let override_event = events
            .iter()
            .find(|e| e.action == AuditAction::CompatibilityOverride)
            .unwrap();
        assert_eq!(override_event.actor, user);
        assert!(override_event.detail.as_deref().unwrap().contains("A+"));
    }

    #[test]
    fn test_history_is_newest_first() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, None);
        let (sink, _rx) = audit_channel();
        let service = TransfusionService::new(Arc::clone(&store), sink);

        let first = service.plan(patient.id, new_transfusion(), &nurse()).unwrap();
        thread::sleep(std::time::Duration::from_millis(5));
        let second = service.plan(patient.id, new_transfusion(), &nurse()).unwrap();

        let ids: Vec<RecordId> = service.history(patient.id).unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![second.id(), first.id()]);

        assert!(service.history(RecordId::new()).is_err());
    }

    #[test]
    fn test_concurrent_bag_additions_are_serialised() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, Some(BloodType::AbPositive));
        let (sink, _rx) = audit_channel();
        let service = Arc::new(TransfusionService::new(Arc::clone(&store), sink));
        let id = service.plan(patient.id, new_transfusion(), &nurse()).unwrap().id();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    for n in 0..5 {
                        service
                            .add_bag(id, bag(&format!("T{t}-{n}"), BloodType::BPositive), false, &nurse())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let record = service.get(id).unwrap();
        assert_eq!(record.total_units(), 40);
    }

    #[test]
    fn test_start_racing_add_bag_never_loses_a_write() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, Some(BloodType::AbPositive));
        let (sink, _rx) = audit_channel();
        let service = Arc::new(TransfusionService::new(Arc::clone(&store), sink));
        let user = nurse();
        let id = service.plan(patient.id, new_transfusion(), &user).unwrap().id();
        service.add_bag(id, bag("B0", BloodType::APositive), false, &user).unwrap();
        service.update_checklist(id, SafetyChecklist::all_confirmed(), &user).unwrap();

        let adder = {
            let service = Arc::clone(&service);
            thread::spawn(move || service.add_bag(id, bag("B1", BloodType::APositive), false, &nurse()))
        };
        let starter = {
            let service = Arc::clone(&service);
            thread::spawn(move || service.start(id, at(10, 8, 0), &nurse()))
        };
        let added = adder.join().unwrap();
        let started = starter.join().unwrap();
        assert!(started.is_ok());

        let record = service.get(id).unwrap();
        assert_eq!(record.status(), TransfusionStatus::InProgress);
        match added {
            Ok(_) => assert_eq!(record.total_units(), 2),
            Err(WardError::InvalidState { .. }) => assert_eq!(record.total_units(), 1),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
}
