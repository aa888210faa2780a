//! Patient summary supplied by the registration system.
//!
//! Registration itself lives outside this crate; the core only reads the fields it
//! needs for safety checks (blood type) and display.

use crate::blood::BloodType;
use crate::constants::PATIENTS_COLLECTION;
use crate::error::{RecordKind, WardResult};
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ward_types::NonEmptyText;
use ward_uuid::RecordId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub hospital_number: NonEmptyText,
    /// `None` until the patient has been grouped.
    #[serde(default)]
    pub blood_type: Option<BloodType>,
    pub registered_at: DateTime<Utc>,
}

impl PatientSummary {
    /// Builds a summary for a newly registered patient.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WardError::ValidationFailed`] if the name or hospital
    /// number is blank.
    pub fn register(
        name: &str,
        hospital_number: &str,
        blood_type: Option<BloodType>,
        now: DateTime<Utc>,
    ) -> WardResult<Self> {
        Ok(Self {
            id: RecordId::new(),
            name: NonEmptyText::named("name", name)?,
            hospital_number: NonEmptyText::named("hospital_number", hospital_number)?,
            blood_type,
            registered_at: now,
        })
    }
}

impl Record for PatientSummary {
    const COLLECTION: &'static str = PATIENTS_COLLECTION;
    const KIND: RecordKind = RecordKind::Patient;

    fn id(&self) -> RecordId {
        self.id
    }

    fn patient_id(&self) -> RecordId {
        self.id
    }

    fn index_date(&self) -> DateTime<Utc> {
        self.registered_at
    }
}
