//! Severity-ranked alert feed for one patient.

use crate::admission::{AdmissionRecord, AdmissionStatus};
use crate::config::AlertThresholds;
use crate::progress::{is_on_schedule, LengthOfStay};
use crate::treatment_plan::TreatmentPlanExecution;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LongStay,
    OverdueStep,
    DelayedPlan,
    PendingDischarge,
}

/// Declaration order is presentation order: most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Derives the alert list for one patient, most severe first.
///
/// Alerts of equal severity keep the order they are raised in: long stay,
/// overdue steps, delayed plans, pending discharge. A plan whose schedule
/// cannot be computed is not counted as delayed.
pub fn generate_alerts(
    admission: Option<&AdmissionRecord>,
    plans: &[TreatmentPlanExecution],
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(admission) = admission {
        let los = LengthOfStay::of(admission, now);
        if los.days > thresholds.long_stay_days {
            let severity = if los.days > thresholds.critical_stay_days {
                AlertSeverity::Critical
            } else {
                AlertSeverity::High
            };
            alerts.push(Alert {
                kind: AlertKind::LongStay,
                severity,
                message: format!(
                    "Length of stay is {} days (threshold {})",
                    los.days, thresholds.long_stay_days
                ),
            });
        }
    }

    let overdue: u64 = plans.iter().map(|p| u64::from(p.overdue_steps)).sum();
    if overdue > 0 {
        let severity = if overdue > u64::from(thresholds.overdue_steps_high) {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        alerts.push(Alert {
            kind: AlertKind::OverdueStep,
            severity,
            message: format!("{overdue} treatment step(s) overdue"),
        });
    }

    let delayed = plans
        .iter()
        .filter(|p| matches!(is_on_schedule(p, now), Ok(false)))
        .count();
    if delayed > 0 {
        alerts.push(Alert {
            kind: AlertKind::DelayedPlan,
            severity: AlertSeverity::Medium,
            message: format!("{delayed} treatment plan(s) behind schedule"),
        });
    }

    if let Some(admission) = admission {
        if admission.status == AdmissionStatus::PendingDischarge {
            alerts.push(Alert {
                kind: AlertKind::PendingDischarge,
                severity: AlertSeverity::Low,
                message: "Discharge requested, awaiting completion".to_string(),
            });
        }
    }

    // stable
    alerts.sort_by_key(|a| a.severity);
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acting_user::ActingUser;
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

    fn admission(admitted: DateTime<Utc>, status: AdmissionStatus) -> AdmissionRecord {
        AdmissionRecord {
            id: RecordId::new(),
            patient_id: RecordId::new(),
            admission_date: admitted,
            expected_discharge_date: None,
            actual_discharge_date: None,
            ward_location: NonEmptyText::new("Ward 9").unwrap(),
            diagnosis: NonEmptyText::new("Hip fracture").unwrap(),
            status,
            updated_at: admitted,
            updated_by: user(),
        }
    }

    fn plan(total: u32, completed: u32, overdue: u32, end: Option<DateTime<Utc>>) -> TreatmentPlanExecution {
        TreatmentPlanExecution {
            id: RecordId::new(),
            patient_id: RecordId::new(),
            title: NonEmptyText::new("Mobilisation").unwrap(),
            total_steps: total,
            completed_steps: completed,
            overdue_steps: overdue,
            status: PlanStatus::InProgress,
            start_date: day(0),
            planned_end_date: end,
            actual_end_date: None,
            updated_at: day(0),
            updated_by: user(),
        }
    }

    fn kinds_and_severities(alerts: &[Alert]) -> Vec<(AlertKind, AlertSeverity)> {
        alerts.iter().map(|a| (a.kind, a.severity)).collect()
    }

    #[test]
    fn test_alert_order_critical_medium_low() {
        let admission = admission(day(0), AdmissionStatus::PendingDischarge);
        let plans = vec![plan(10, 1, 0, Some(day(40)))];

        let alerts = generate_alerts(Some(&admission), &plans, &AlertThresholds::default(), day(31));

        assert_eq!(
            kinds_and_severities(&alerts),
            vec![
                (AlertKind::LongStay, AlertSeverity::Critical),
                (AlertKind::DelayedPlan, AlertSeverity::Medium),
                (AlertKind::PendingDischarge, AlertSeverity::Low),
            ]
        );
    }

    #[test]
    fn test_long_stay_thresholds() {
        let thresholds = AlertThresholds::default();
        let a = admission(day(0), AdmissionStatus::Active);

        assert!(generate_alerts(Some(&a), &[], &thresholds, day(14)).is_empty());
        assert_eq!(
            kinds_and_severities(&generate_alerts(Some(&a), &[], &thresholds, day(15))),
            vec![(AlertKind::LongStay, AlertSeverity::High)]
        );
        assert_eq!(
            kinds_and_severities(&generate_alerts(Some(&a), &[], &thresholds, day(30))),
            vec![(AlertKind::LongStay, AlertSeverity::High)]
        );
        assert_eq!(
            kinds_and_severities(&generate_alerts(Some(&a), &[], &thresholds, day(31))),
            vec![(AlertKind::LongStay, AlertSeverity::Critical)]
        );
    }

    #[test]
    fn test_overdue_steps_are_summed_across_plans() {
        let thresholds = AlertThresholds::default();
        let medium = vec![plan(5, 0, 2, None), plan(5, 0, 3, None)];
        assert_eq!(
            kinds_and_severities(&generate_alerts(None, &medium, &thresholds, day(1))),
            vec![(AlertKind::OverdueStep, AlertSeverity::Medium)]
        );

        let high = vec![plan(5, 0, 2, None), plan(5, 0, 4, None)];
        assert_eq!(
            kinds_and_severities(&generate_alerts(None, &high, &thresholds, day(1))),
            vec![(AlertKind::OverdueStep, AlertSeverity::High)]
        );
    }

    #[test]
    fn test_equal_severity_keeps_emission_order() {
        let plans = vec![plan(10, 0, 1, Some(day(10)))];
        let alerts = generate_alerts(None, &plans, &AlertThresholds::default(), day(5));
        assert_eq!(
            kinds_and_severities(&alerts),
            vec![
                (AlertKind::OverdueStep, AlertSeverity::Medium),
                (AlertKind::DelayedPlan, AlertSeverity::Medium),
            ]
        );
    }

    #[test]
    fn test_misconfigured_plan_is_not_delayed() {
        let plans = vec![plan(10, 0, 0, Some(day(0)))];
        assert!(generate_alerts(None, &plans, &AlertThresholds::default(), day(5)).is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = AlertThresholds {
            long_stay_days: 3,
            critical_stay_days: 7,
            overdue_steps_high: 0,
        };
        let a = admission(day(0), AdmissionStatus::Active);
        let plans = vec![plan(5, 0, 1, None)];
        assert_eq!(
            kinds_and_severities(&generate_alerts(Some(&a), &plans, &thresholds, day(4))),
            vec![
                (AlertKind::LongStay, AlertSeverity::High),
                (AlertKind::OverdueStep, AlertSeverity::High),
            ]
        );
    }
}
