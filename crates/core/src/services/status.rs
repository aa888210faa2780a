//! Per-patient status view.
//!
//! This is the single read path for dashboards and reporting. It always
//! returns a view: lookup failures and misconfigured plans are logged, noted
//! in [`PatientStatus::issues`] and otherwise absorbed.

use crate::admission::{AdmissionRecord, AdmissionStatus};
use crate::alerts::{generate_alerts, Alert};
use crate::config::CoreConfig;
use crate::progress::{overall_progress, LengthOfStay, ScheduleVariance};
use crate::store::RecordStore;
use crate::treatment_plan::{PlanStatus, TreatmentPlanExecution};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use ward_types::NonEmptyText;
use ward_uuid::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentStatus {
    Admitted,
    NotAdmitted,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanProgress {
    pub plan_id: RecordId,
    pub title: NonEmptyText,
    pub status: PlanStatus,
    pub total_steps: u32,
    pub completed_steps: u32,
    pub overdue_steps: u32,
    pub completion_percentage: f64,
    /// `None` without a planned end date or when the schedule is misconfigured.
    pub schedule: Option<ScheduleVariance>,
    pub is_on_schedule: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientStatus {
    pub patient_id: RecordId,
    pub current_status: CurrentStatus,
    pub admission: Option<AdmissionRecord>,
    pub length_of_stay: Option<LengthOfStay>,
    pub plans: Vec<PlanProgress>,
    pub overall_progress: u32,
    pub alerts: Vec<Alert>,
    /// Problems that were absorbed while building this view.
    pub issues: Vec<String>,
}

pub struct PatientStatusService<S> {
    store: Arc<S>,
    cfg: Arc<CoreConfig>,
}

impl<S: RecordStore> PatientStatusService<S> {
    pub fn new(store: Arc<S>, cfg: Arc<CoreConfig>) -> Self {
        Self { store, cfg }
    }

    pub fn patient_status(&self, patient_id: RecordId) -> PatientStatus {
        self.patient_status_at(patient_id, Utc::now())
    }

    /// Builds the status view as of `now`.
    pub fn patient_status_at(&self, patient_id: RecordId, now: DateTime<Utc>) -> PatientStatus {
        let mut issues = Vec::new();

        let admission = match self.store.list_for_patient::<AdmissionRecord>(patient_id) {
            Ok(admissions) => admissions.into_iter().next(),
            Err(e) => {
                tracing::warn!("admission lookup failed for patient {}: {}", patient_id, e);
                issues.push(format!("admission unavailable: {e}"));
                None
            }
        };

        let plans = match self.store.list_for_patient::<TreatmentPlanExecution>(patient_id) {
            Ok(plans) => plans,
            Err(e) => {
                tracing::warn!("treatment plan lookup failed for patient {}: {}", patient_id, e);
                issues.push(format!("treatment plans unavailable: {e}"));
                Vec::new()
            }
        };

        let plan_progress: Vec<PlanProgress> = plans
            .iter()
            .map(|plan| {
                let schedule = match ScheduleVariance::compute(plan, now) {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        issues.push(e.to_string());
                        None
                    }
                };
                PlanProgress {
                    plan_id: plan.id,
                    title: plan.title.clone(),
                    status: plan.status,
                    total_steps: plan.total_steps,
                    completed_steps: plan.completed_steps,
                    overdue_steps: plan.overdue_steps,
                    completion_percentage: plan.completion_percentage(),
                    is_on_schedule: schedule.map_or(true, |s| s.is_on_schedule),
                    schedule,
                }
            })
            .collect();

        let current_status = match &admission {
            Some(a) if a.status == AdmissionStatus::Active => CurrentStatus::Admitted,
            _ => CurrentStatus::NotAdmitted,
        };

        PatientStatus {
            patient_id,
            current_status,
            length_of_stay: admission.as_ref().map(|a| LengthOfStay::of(a, now)),
            alerts: generate_alerts(admission.as_ref(), &plans, &self.cfg.thresholds(), now),
            overall_progress: overall_progress(&plans),
            plans: plan_progress,
            admission,
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::NewAdmission;
    use crate::alerts::{AlertKind, AlertSeverity};
    use crate::config::AlertThresholds;
    use crate::constants::ADMISSIONS_COLLECTION;
    use crate::error::{WardError, WardResult};
    use crate::services::test_support::{at, audit_channel, nurse, seed_patient};
    use crate::services::{AdmissionService, TreatmentPlanService};
    use crate::store::{InMemoryStore, Record};
    use crate::treatment_plan::NewTreatmentPlan;
    use std::io;
    use std::path::PathBuf;

    struct AdmissionsOffline(InMemoryStore);

    impl RecordStore for AdmissionsOffline {
        fn get<R: Record>(&self, id: RecordId) -> WardResult<R> {
            self.0.get(id)
        }

        fn put<R: Record>(&self, record: &R) -> WardResult<()> {
            self.0.put(record)
        }

        fn list_for_patient<R: Record>(&self, patient_id: RecordId) -> WardResult<Vec<R>> {
            if R::COLLECTION == ADMISSIONS_COLLECTION {
                return Err(WardError::FileRead(io::Error::new(
                    io::ErrorKind::Other,
                    "admissions volume offline",
                )));
            }
            self.0.list_for_patient(patient_id)
        }
    }

    fn cfg() -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(PathBuf::from("unused"), AlertThresholds::default()).unwrap())
    }

    fn plan(title: &str, total: u32, completed: u32, end_day: Option<u32>) -> NewTreatmentPlan {
        NewTreatmentPlan {
            title: title.into(),
            total_steps: total,
            completed_steps: completed,
            overdue_steps: 0,
            start_date: at(1, 0, 0),
            planned_end_date: end_day.map(|d| at(d, 0, 0)),
        }
    }

    #[test]
    fn test_status_for_unknown_patient_is_not_admitted() {
        let service = PatientStatusService::new(Arc::new(InMemoryStore::new()), cfg());
        let status = service.patient_status(RecordId::new());
        assert_eq!(status.current_status, CurrentStatus::NotAdmitted);
        assert!(status.plans.is_empty());
        assert!(status.alerts.is_empty());
        assert_eq!(status.overall_progress, 0);
        assert!(status.issues.is_empty());
    }

    #[test]
    fn test_status_composes_admission_and_plans() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, None);
        let (sink, _rx) = audit_channel();
        let admissions = AdmissionService::new(Arc::clone(&store), sink.clone());
        let plans = TreatmentPlanService::new(Arc::clone(&store), sink);
        let user = nurse();

        let admission = admissions
            .admit(
                patient.id,
                NewAdmission {
                    admission_date: at(1, 0, 0),
                    expected_discharge_date: None,
                    ward_location: "Ward 2".into(),
                    diagnosis: "Stroke".into(),
                },
                &user,
            )
            .unwrap();
        plans.create_plan(patient.id, plan("Speech therapy", 10, 4, Some(11)), &user).unwrap();
        plans.create_plan(patient.id, plan("Physio", 10, 8, None), &user).unwrap();

        let service = PatientStatusService::new(Arc::clone(&store), cfg());
        let status = service.patient_status_at(patient.id, at(6, 0, 0));

        assert_eq!(status.current_status, CurrentStatus::Admitted);
        assert_eq!(status.admission.as_ref().map(|a| a.id), Some(admission.id));
        assert_eq!(status.length_of_stay.map(|l| l.days), Some(5));
        assert_eq!(status.overall_progress, 60);
        assert_eq!(status.plans.len(), 2);
        let speech = status.plans.iter().find(|p| p.title.as_str() == "Speech therapy").unwrap();
        assert!(!speech.is_on_schedule);
        assert_eq!(speech.schedule.map(|s| s.expected_progress), Some(50.0));
        assert_eq!(
            status.alerts.iter().map(|a| (a.kind, a.severity)).collect::<Vec<_>>(),
            vec![(AlertKind::DelayedPlan, AlertSeverity::Medium)]
        );
        assert!(status.issues.is_empty());
    }

    #[test]
    fn test_pending_discharge_is_not_admitted() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, None);
        let (sink, _rx) = audit_channel();
        let admissions = AdmissionService::new(Arc::clone(&store), sink);
        let admission = admissions
            .admit(
                patient.id,
                NewAdmission {
                    admission_date: at(1, 0, 0),
                    expected_discharge_date: None,
                    ward_location: "Ward 2".into(),
                    diagnosis: "Stroke".into(),
                },
                &nurse(),
            )
            .unwrap();
        admissions.request_discharge(admission.id, None, &nurse()).unwrap();

        let status = PatientStatusService::new(store, cfg()).patient_status_at(patient.id, at(3, 0, 0));
        assert_eq!(status.current_status, CurrentStatus::NotAdmitted);
        assert_eq!(status.alerts[0].kind, AlertKind::PendingDischarge);
    }

    #[test]
    fn test_admission_failure_degrades_to_not_admitted() {
        let inner = InMemoryStore::new();
        let patient = seed_patient(&inner, None);
        let store = Arc::new(AdmissionsOffline(inner));
        let (sink, _rx) = audit_channel();
        let plans = TreatmentPlanService::new(Arc::clone(&store), sink);
        plans
            .create_plan(patient.id, plan("Wound care", 4, 1, None), &nurse())
            .unwrap();

        let status = PatientStatusService::new(store, cfg()).patient_status_at(patient.id, at(5, 0, 0));

        assert_eq!(status.current_status, CurrentStatus::NotAdmitted);
        assert!(status.admission.is_none());
        assert_eq!(status.plans.len(), 1);
        assert_eq!(status.overall_progress, 25);
        assert_eq!(status.issues.len(), 1);
        assert!(status.issues[0].contains("admission unavailable"));
    }

    #[test]
    fn test_misconfigured_plan_is_reported_not_fatal() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, None);
        let (sink, _rx) = audit_channel();
        let plans = TreatmentPlanService::new(Arc::clone(&store), sink);
        plans
            .create_plan(patient.id, plan("Same-day plan", 2, 0, Some(1)), &nurse())
            .unwrap();

        let status = PatientStatusService::new(store, cfg()).patient_status_at(patient.id, at(4, 0, 0));
        assert_eq!(status.plans.len(), 1);
        assert!(status.plans[0].is_on_schedule);
        assert!(status.plans[0].schedule.is_none());
        assert!(status.alerts.is_empty());
        assert_eq!(status.issues.len(), 1);
    }

    #[test]
    fn test_zero_step_plans_give_zero_progress() {
        let store = Arc::new(InMemoryStore::new());
        let patient = seed_patient(&store, None);
        let (sink, _rx) = audit_channel();
        let plans = TreatmentPlanService::new(Arc::clone(&store), sink);
        plans.create_plan(patient.id, plan("Observation", 0, 0, None), &nurse()).unwrap();
        plans.create_plan(patient.id, plan("Review", 0, 0, None), &nurse()).unwrap();

        let status = PatientStatusService::new(store, cfg()).patient_status_at(patient.id, at(4, 0, 0));
        assert_eq!(status.overall_progress, 0);
    }
}
