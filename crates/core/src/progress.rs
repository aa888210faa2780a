//! Derived progress figures: length of stay, schedule variance, overall progress.
//!
//! Everything here is computed from current field values and an explicit `now`;
//! nothing is persisted.

use crate::admission::AdmissionRecord;
use crate::error::{WardError, WardResult};
use crate::treatment_plan::TreatmentPlanExecution;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LengthOfStay {
    /// Whole days, `hours / 24` rounded down.
    pub days: i64,
    /// Total elapsed hours, not the remainder after `days`.
    pub hours: i64,
}

impl LengthOfStay {
    /// Measures from admission to the actual discharge, or to `now` while the
    /// patient is still in.
    pub fn of(admission: &AdmissionRecord, now: DateTime<Utc>) -> Self {
        let end = admission.actual_discharge_date.unwrap_or(now);
        let mut hours = (end - admission.admission_date).num_hours();
        if hours < 0 {
            tracing::warn!(
                "admission {} ends before it starts ({} hours), reporting zero",
                admission.id,
                hours
            );
            hours = 0;
        }
        Self {
            days: hours / 24,
            hours,
        }
    }
}

/// Expected against actual completion of a plan with a planned end date.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScheduleVariance {
    /// Whole days only; a plan shorter than a day reports 0 here.
    pub total_days: i64,
    pub days_elapsed: i64,
    /// Negative once the planned end has passed.
    pub days_remaining: i64,
    /// Percentage of the planned duration elapsed, held within 0..=100.
    pub expected_progress: f64,
    pub completion_percentage: f64,
    pub is_on_schedule: bool,
}

impl ScheduleVariance {
    /// Computes the variance for `plan` at `now`.
    ///
    /// Returns `Ok(None)` when the plan has no planned end date.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ConfigurationError`] when the planned end is not
    /// after the start.
    pub fn compute(plan: &TreatmentPlanExecution, now: DateTime<Utc>) -> WardResult<Option<Self>> {
        let Some(planned_end) = plan.planned_end_date else {
            return Ok(None);
        };

        let planned = planned_end - plan.start_date;
        if planned <= Duration::zero() {
            return Err(WardError::ConfigurationError(format!(
                "treatment plan {} ends at {planned_end}, not after its start {}",
                plan.id, plan.start_date
            )));
        }

        let elapsed = now - plan.start_date;
        let expected_progress = (elapsed.num_seconds() as f64 / planned.num_seconds() as f64
            * 100.0)
            .clamp(0.0, 100.0);
        let total_days = planned.num_days();
        let days_elapsed = elapsed.num_days();
        let days_remaining = (planned_end - now).num_days();
        let completion_percentage = plan.completion_percentage();

        Ok(Some(Self {
            total_days,
            days_elapsed,
            days_remaining,
            expected_progress,
            completion_percentage,
            is_on_schedule: completion_percentage >= expected_progress,
        }))
    }
}

/// Whether `plan` is on schedule. Plans without a planned end always are.
///
/// # Errors
///
/// Propagates the configuration error from [`ScheduleVariance::compute`].
pub fn is_on_schedule(plan: &TreatmentPlanExecution, now: DateTime<Utc>) -> WardResult<bool> {
    Ok(ScheduleVariance::compute(plan, now)?.map_or(true, |v| v.is_on_schedule))
}

/// Completed steps over total steps across `plans`, as a rounded percentage.
/// Zero when there are no steps at all.
pub fn overall_progress(plans: &[TreatmentPlanExecution]) -> u32 {
    let total: u64 = plans.iter().map(|p| u64::from(p.total_steps)).sum();
    if total == 0 {
        return 0;
    }
    let completed: u64 = plans.iter().map(|p| u64::from(p.completed_steps)).sum();
    (completed as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acting_user::ActingUser;
    use crate::admission::AdmissionStatus;
    use crate::treatment_plan::PlanStatus;
    use chrono::{Duration, TimeZone};
    use ward_types::NonEmptyText;
    use ward_uuid::RecordId;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn user() -> ActingUser {
        ActingUser::new("Analyst", "Bed Manager").unwrap()
    }

    fn admission(admitted: DateTime<Utc>, discharged: Option<DateTime<Utc>>) -> AdmissionRecord {
        AdmissionRecord {
            id: RecordId::new(),
            patient_id: RecordId::new(),
            admission_date: admitted,
            expected_discharge_date: None,
            actual_discharge_date: discharged,
            ward_location: NonEmptyText::new("Ward 3").unwrap(),
            diagnosis: NonEmptyText::new("Cellulitis").unwrap(),
            status: if discharged.is_some() {
                AdmissionStatus::Discharged
            } else {
                AdmissionStatus::Active
            },
            updated_at: admitted,
            updated_by: user(),
        }
    }

    fn plan(
        total: u32,
        completed: u32,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> TreatmentPlanExecution {
        TreatmentPlanExecution {
            id: RecordId::new(),
            patient_id: RecordId::new(),
            title: NonEmptyText::new("Rehabilitation").unwrap(),
            total_steps: total,
            completed_steps: completed,
            overdue_steps: 0,
            status: PlanStatus::InProgress,
            start_date: start,
            planned_end_date: end,
            actual_end_date: None,
            updated_at: start,
            updated_by: user(),
        }
    }

    #[test]
    fn test_length_of_stay_uses_discharge_date() {
        let los = LengthOfStay::of(
            &admission(day(0), Some(day(10) + Duration::hours(5))),
            day(40),
        );
        assert_eq!(los, LengthOfStay { days: 10, hours: 245 });
    }

    #[test]
    fn test_length_of_stay_runs_to_now_while_admitted() {
        let los = LengthOfStay::of(&admission(day(0), None), day(3) + Duration::hours(23));
        assert_eq!(los.days, 3);
        assert_eq!(los.hours, 95);
    }

    #[test]
    fn test_length_of_stay_never_negative() {
        let los = LengthOfStay::of(&admission(day(5), None), day(4));
        assert_eq!(los, LengthOfStay { days: 0, hours: 0 });
    }

    #[test]
    fn test_schedule_variance_behind_schedule() {
        let p = plan(10, 4, day(0), Some(day(10)));
        let variance = ScheduleVariance::compute(&p, day(5)).unwrap().unwrap();
        assert_eq!(variance.total_days, 10);
        assert_eq!(variance.days_elapsed, 5);
        assert_eq!(variance.days_remaining, 5);
        assert_eq!(variance.expected_progress, 50.0);
        assert_eq!(variance.completion_percentage, 40.0);
        assert!(!variance.is_on_schedule);
    }

    #[test]
    fn test_schedule_variance_on_schedule_and_overrun() {
        let p = plan(10, 5, day(0), Some(day(10)));
        assert!(is_on_schedule(&p, day(5)).unwrap());

        let overrun = ScheduleVariance::compute(&p, day(13)).unwrap().unwrap();
        assert_eq!(overrun.days_remaining, -3);
        assert_eq!(overrun.expected_progress, 100.0);
        assert!(!overrun.is_on_schedule);

        let finished = plan(10, 10, day(0), Some(day(10)));
        assert!(is_on_schedule(&finished, day(13)).unwrap());
    }

    #[test]
    fn test_no_planned_end_is_on_schedule() {
        let p = plan(10, 0, day(0), None);
        assert!(ScheduleVariance::compute(&p, day(50)).unwrap().is_none());
        assert!(is_on_schedule(&p, day(50)).unwrap());
    }

    #[test]
    fn test_non_positive_planned_duration_is_configuration_error() {
        for end in [day(0), day(-2)] {
            let p = plan(10, 0, day(0), Some(end));
            assert!(matches!(
                ScheduleVariance::compute(&p, day(1)),
                Err(WardError::ConfigurationError(_))
            ));
        }
    }

    #[test]
    fn test_sub_day_plan_uses_elapsed_fraction() {
        let start = day(0);
        let end = start + Duration::hours(12);
        let now = start + Duration::hours(3);

        let on_track = ScheduleVariance::compute(&plan(4, 1, start, Some(end)), now)
            .unwrap()
            .unwrap();
        assert_eq!(on_track.total_days, 0);
        assert_eq!(on_track.expected_progress, 25.0);
        assert!(on_track.is_on_schedule);

        let behind = plan(5, 1, start, Some(end));
        assert!(!is_on_schedule(&behind, now).unwrap());
    }

    #[test]
    fn test_overall_progress() {
        let plans = vec![
            plan(4, 1, day(0), None),
            plan(2, 2, day(0), None),
        ];
        // 3 of 6
        assert_eq!(overall_progress(&plans), 50);
        assert_eq!(overall_progress(&[plan(3, 2, day(0), None)]), 67);
    }

    #[test]
    fn test_overall_progress_zero_steps_is_zero() {
        let plans = vec![plan(0, 0, day(0), None), plan(0, 0, day(1), None)];
        assert_eq!(overall_progress(&plans), 0);
        assert_eq!(overall_progress(&[]), 0);
    }
}
