//! Inpatient admissions.
//!
//! Length of stay is never stored; see [`crate::progress::LengthOfStay`].

use crate::acting_user::ActingUser;
use crate::constants::ADMISSIONS_COLLECTION;
use crate::error::{RecordKind, WardError, WardResult};
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ward_types::NonEmptyText;
use ward_uuid::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Active,
    PendingDischarge,
    Discharged,
}

impl fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdmissionStatus::Active => "active",
            AdmissionStatus::PendingDischarge => "pending_discharge",
            AdmissionStatus::Discharged => "discharged",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewAdmission {
    pub admission_date: DateTime<Utc>,
    #[serde(default)]
    pub expected_discharge_date: Option<DateTime<Utc>>,
    pub ward_location: String,
    pub diagnosis: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub admission_date: DateTime<Utc>,
    #[serde(default)]
    pub expected_discharge_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_discharge_date: Option<DateTime<Utc>>,
    pub ward_location: NonEmptyText,
    pub diagnosis: NonEmptyText,
    pub status: AdmissionStatus,
    pub updated_at: DateTime<Utc>,
    pub updated_by: ActingUser,
}

impl Record for AdmissionRecord {
    const COLLECTION: &'static str = ADMISSIONS_COLLECTION;
    const KIND: RecordKind = RecordKind::Admission;

    fn id(&self) -> RecordId {
        self.id
    }

    fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    fn index_date(&self) -> DateTime<Utc> {
        self.admission_date
    }
}

impl AdmissionRecord {
    /// Opens an active admission.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ValidationFailed`] if ward or diagnosis is blank or
    /// the expected discharge precedes admission.
    pub fn admit(
        patient_id: RecordId,
        new: NewAdmission,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<Self> {
        if let Some(expected) = new.expected_discharge_date {
            check_not_before_admission(new.admission_date, expected, "expected_discharge_date")?;
        }
        Ok(Self {
            id: RecordId::new(),
            patient_id,
            admission_date: new.admission_date,
            expected_discharge_date: new.expected_discharge_date,
            actual_discharge_date: None,
            ward_location: NonEmptyText::named("ward_location", &new.ward_location)?,
            diagnosis: NonEmptyText::named("diagnosis", &new.diagnosis)?,
            status: AdmissionStatus::Active,
            updated_at: now,
            updated_by: user.clone(),
        })
    }

    /// `active` to `pending_discharge`, optionally revising the expected date.
    pub fn request_discharge(
        &self,
        expected: Option<DateTime<Utc>>,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<Self> {
        if self.status != AdmissionStatus::Active {
            return Err(WardError::InvalidState {
                operation: "request discharge",
                status: self.status.to_string(),
            });
        }
        if let Some(expected) = expected {
            check_not_before_admission(self.admission_date, expected, "expected_discharge_date")?;
        }

        let mut next = self.clone();
        next.status = AdmissionStatus::PendingDischarge;
        if expected.is_some() {
            next.expected_discharge_date = expected;
        }
        next.updated_at = now;
        next.updated_by = user.clone();
        Ok(next)
    }

    /// Closes the admission at `at`.
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidState`] if already discharged;
    /// [`WardError::ValidationFailed`] if `at` precedes the admission.
    pub fn discharge(&self, at: DateTime<Utc>, user: &ActingUser) -> WardResult<Self> {
        if self.status == AdmissionStatus::Discharged {
            return Err(WardError::InvalidState {
                operation: "discharge patient",
                status: self.status.to_string(),
            });
        }
        check_not_before_admission(self.admission_date, at, "actual_discharge_date")?;

        let mut next = self.clone();
        next.status = AdmissionStatus::Discharged;
        next.actual_discharge_date = Some(at);
        next.updated_at = at;
        next.updated_by = user.clone();
        Ok(next)
    }
}

fn check_not_before_admission(
    admitted: DateTime<Utc>,
    date: DateTime<Utc>,
    field: &str,
) -> WardResult<()> {
    if date < admitted {
        return Err(WardError::invalid(format!(
            "{field} {date} is before admission_date {admitted}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap() + Duration::days(n)
    }

    fn user() -> ActingUser {
        ActingUser::new("Dr Achebe", "Consultant").unwrap()
    }

    fn admitted() -> AdmissionRecord {
        AdmissionRecord::admit(
            RecordId::new(),
            NewAdmission {
                admission_date: day(0),
                expected_discharge_date: Some(day(5)),
                ward_location: "Ward 7B".into(),
                diagnosis: "Community-acquired pneumonia".into(),
            },
            &user(),
            day(0),
        )
        .unwrap()
    }

    #[test]
    fn test_admit_validates_fields() {
        let admission = admitted();
        assert_eq!(admission.status, AdmissionStatus::Active);
        assert!(admission.actual_discharge_date.is_none());

        let blank_ward = NewAdmission {
            admission_date: day(0),
            expected_discharge_date: None,
            ward_location: " ".into(),
            diagnosis: "Sepsis".into(),
        };
        assert!(matches!(
            AdmissionRecord::admit(RecordId::new(), blank_ward, &user(), day(0)),
            Err(WardError::ValidationFailed(_))
        ));

        let backwards = NewAdmission {
            admission_date: day(3),
            expected_discharge_date: Some(day(1)),
            ward_location: "AMU".into(),
            diagnosis: "Sepsis".into(),
        };
        assert!(matches!(
            AdmissionRecord::admit(RecordId::new(), backwards, &user(), day(3)),
            Err(WardError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_discharge_lifecycle() {
        let pending = admitted().request_discharge(Some(day(4)), &user(), day(3)).unwrap();
        assert_eq!(pending.status, AdmissionStatus::PendingDischarge);
        assert_eq!(pending.expected_discharge_date, Some(day(4)));

        assert!(matches!(
            pending.request_discharge(None, &user(), day(3)),
            Err(WardError::InvalidState { .. })
        ));

        let discharged = pending.discharge(day(4), &user()).unwrap();
        assert_eq!(discharged.status, AdmissionStatus::Discharged);
        assert_eq!(discharged.actual_discharge_date, Some(day(4)));

        assert!(matches!(
            discharged.discharge(day(5), &user()),
            Err(WardError::InvalidState { status, .. }) if status == "discharged"
        ));
    }

    #[test]
    fn test_discharge_directly_from_active() {
        let discharged = admitted().discharge(day(2), &user()).unwrap();
        assert_eq!(discharged.status, AdmissionStatus::Discharged);
    }

    #[test]
    fn test_discharge_before_admission_rejected() {
        assert!(matches!(
            admitted().discharge(day(-1), &user()),
            Err(WardError::ValidationFailed(_))
        ));
    }
}
