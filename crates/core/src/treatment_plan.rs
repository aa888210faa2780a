//! Treatment-plan execution counters.
//!
//! Only raw counters and dates are stored. Completion percentage is derived
//! here; schedule variance lives in [`crate::progress`].

use crate::acting_user::ActingUser;
use crate::constants::TREATMENT_PLANS_COLLECTION;
use crate::error::{RecordKind, WardError, WardResult};
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ward_types::NonEmptyText;
use ward_uuid::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    NotStarted,
    InProgress,
    Completed,
    Delayed,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanStatus::NotStarted => "not_started",
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Completed => "completed",
            PlanStatus::Delayed => "delayed",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTreatmentPlan {
    pub title: String,
    pub total_steps: u32,
    #[serde(default)]
    pub completed_steps: u32,
    #[serde(default)]
    pub overdue_steps: u32,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub planned_end_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlanExecution {
    /// Plan id.
    pub id: RecordId,
    pub patient_id: RecordId,
    pub title: NonEmptyText,
    pub total_steps: u32,
    pub completed_steps: u32,
    pub overdue_steps: u32,
    pub status: PlanStatus,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub planned_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_end_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: ActingUser,
}

impl Record for TreatmentPlanExecution {
    const COLLECTION: &'static str = TREATMENT_PLANS_COLLECTION;
    const KIND: RecordKind = RecordKind::TreatmentPlan;

    fn id(&self) -> RecordId {
        self.id
    }

    fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    fn index_date(&self) -> DateTime<Utc> {
        self.start_date
    }
}

impl TreatmentPlanExecution {
    /// Creates a plan for `patient_id`.
    ///
    /// A planned end on or before the start is accepted here and reported as a
    /// configuration issue when progress is derived.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ValidationFailed`] for a blank title or
    /// `completed_steps > total_steps`.
    pub fn create(
        patient_id: RecordId,
        new: NewTreatmentPlan,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<Self> {
        check_counters(new.total_steps, new.completed_steps)?;
        let mut plan = Self {
            id: RecordId::new(),
            patient_id,
            title: NonEmptyText::named("title", &new.title)?,
            total_steps: new.total_steps,
            completed_steps: new.completed_steps,
            overdue_steps: new.overdue_steps,
            status: PlanStatus::NotStarted,
            start_date: new.start_date,
            planned_end_date: new.planned_end_date,
            actual_end_date: None,
            updated_at: now,
            updated_by: user.clone(),
        };
        plan.derive_status(now);
        Ok(plan)
    }

    /// Records new step counters and re-derives the status.
    ///
    /// # Errors
    ///
    /// - [`WardError::InvalidState`] once the plan is completed.
    /// - [`WardError::ValidationFailed`] if `completed_steps > total_steps`.
    pub fn update_progress(
        &self,
        completed_steps: u32,
        overdue_steps: u32,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<Self> {
        if self.status == PlanStatus::Completed {
            return Err(WardError::InvalidState {
                operation: "update plan progress",
                status: self.status.to_string(),
            });
        }
        check_counters(self.total_steps, completed_steps)?;

        let mut next = self.clone();
        next.completed_steps = completed_steps;
        next.overdue_steps = overdue_steps;
        next.derive_status(now);
        next.updated_at = now;
        next.updated_by = user.clone();
        Ok(next)
    }

    /// Percentage of steps completed; 0 for a plan with no steps.
    pub fn completion_percentage(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        f64::from(self.completed_steps) / f64::from(self.total_steps) * 100.0
    }

    fn derive_status(&mut self, now: DateTime<Utc>) {
        if self.total_steps > 0 && self.completed_steps == self.total_steps {
            self.status = PlanStatus::Completed;
            self.actual_end_date = Some(now);
        } else if self.overdue_steps > 0 {
            self.status = PlanStatus::Delayed;
        } else if self.completed_steps > 0 {
            self.status = PlanStatus::InProgress;
        }
    }
}

fn check_counters(total: u32, completed: u32) -> WardResult<()> {
    if completed > total {
        return Err(WardError::invalid(format!(
            "completed_steps {completed} exceeds total_steps {total}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap() + Duration::days(n)
    }

    fn user() -> ActingUser {
        ActingUser::new("Nurse Khan", "Staff Nurse").unwrap()
    }

    fn new_plan(total: u32, completed: u32) -> NewTreatmentPlan {
        NewTreatmentPlan {
            title: "IV antibiotics".into(),
            total_steps: total,
            completed_steps: completed,
            overdue_steps: 0,
            start_date: day(0),
            planned_end_date: Some(day(7)),
        }
    }

    #[test]
    fn test_create_validates_counters() {
        let plan = TreatmentPlanExecution::create(RecordId::new(), new_plan(10, 0), &user(), day(0)).unwrap();
        assert_eq!(plan.status, PlanStatus::NotStarted);

        assert!(matches!(
            TreatmentPlanExecution::create(RecordId::new(), new_plan(3, 4), &user(), day(0)),
            Err(WardError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_status_follows_counters() {
        let plan = TreatmentPlanExecution::create(RecordId::new(), new_plan(4, 0), &user(), day(0)).unwrap();

        let started = plan.update_progress(1, 0, &user(), day(1)).unwrap();
        assert_eq!(started.status, PlanStatus::InProgress);

        let delayed = started.update_progress(2, 1, &user(), day(3)).unwrap();
        assert_eq!(delayed.status, PlanStatus::Delayed);

        let done = delayed.update_progress(4, 1, &user(), day(6)).unwrap();
        assert_eq!(done.status, PlanStatus::Completed);
        assert_eq!(done.actual_end_date, Some(day(6)));

        assert!(matches!(
            done.update_progress(4, 0, &user(), day(7)),
            Err(WardError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_update_rejects_completed_beyond_total() {
        let plan = TreatmentPlanExecution::create(RecordId::new(), new_plan(4, 0), &user(), day(0)).unwrap();
        assert!(matches!(
            plan.update_progress(5, 0, &user(), day(1)),
            Err(WardError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_empty_plan_is_never_completed() {
        let plan = TreatmentPlanExecution::create(RecordId::new(), new_plan(0, 0), &user(), day(0)).unwrap();
        assert_eq!(plan.status, PlanStatus::NotStarted);
        assert_eq!(plan.completion_percentage(), 0.0);
    }

    #[test]
    fn test_completion_percentage() {
        let plan = TreatmentPlanExecution::create(RecordId::new(), new_plan(5, 2), &user(), day(0)).unwrap();
        assert_eq!(plan.completion_percentage(), 40.0);
    }
}
