//! Transfusion aggregate and the value types it owns.
//!
//! Fields on [`TransfusionRecord`] are private; reads go through accessors and
//! writes go through [`super::TransfusionWorkflow`]. Derived values
//! (`total_units`, `adverse_events`) are computed from the owned collections
//! rather than stored beside them.

use crate::acting_user::ActingUser;
use crate::blood::BloodType;
use crate::constants::TRANSFUSIONS_COLLECTION;
use crate::error::{RecordKind, WardError, WardResult};
use crate::store::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ward_types::NonEmptyText;
use ward_uuid::RecordId;

// ============================================================================
// Status
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransfusionStatus {
    Planned,
    InProgress,
    Completed,
    Stopped,
    Cancelled,
}

impl TransfusionStatus {
    pub const ALL: [TransfusionStatus; 5] = [
        TransfusionStatus::Planned,
        TransfusionStatus::InProgress,
        TransfusionStatus::Completed,
        TransfusionStatus::Stopped,
        TransfusionStatus::Cancelled,
    ];

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransfusionStatus::Completed | TransfusionStatus::Stopped | TransfusionStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransfusionStatus::Planned => "planned",
            TransfusionStatus::InProgress => "in_progress",
            TransfusionStatus::Completed => "completed",
            TransfusionStatus::Stopped => "stopped",
            TransfusionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransfusionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Blood bags
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    WholeBlood,
    PackedRbc,
    Platelets,
    Ffp,
    Cryoprecipitate,
}

/// A unit of blood attached to a transfusion.
///
/// Only produced by validating a [`BloodBagInput`]; the owning record exposes
/// bags as a read-only slice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BloodBag {
    pub bag_number: NonEmptyText,
    pub blood_type: BloodType,
    pub component_type: ComponentType,
    pub volume_ml: u32,
    pub donation_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub source: String,
    pub screening_done: bool,
    pub crossmatch_compatible: bool,
    /// Set for every bag when the transfusion completes.
    #[serde(default)]
    pub transfused: bool,
}

/// Unvalidated bag details as entered at the bedside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BloodBagInput {
    pub bag_number: String,
    pub blood_type: Option<BloodType>,
    pub component_type: ComponentType,
    pub volume_ml: u32,
    pub donation_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub screening_done: bool,
    #[serde(default)]
    pub crossmatch_compatible: bool,
}

impl BloodBagInput {
    /// Validates the input into a [`BloodBag`].
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ValidationFailed`] if the bag number is blank, the
    /// blood type is missing, the volume is zero, or the expiry date precedes
    /// the donation date.
    pub fn validate(self) -> WardResult<BloodBag> {
        let bag_number = NonEmptyText::named("bag_number", &self.bag_number)?;
        let blood_type = self
            .blood_type
            .ok_or_else(|| WardError::invalid(format!("bag {bag_number}: blood_type is required")))?;
        if self.volume_ml == 0 {
            return Err(WardError::invalid(format!(
                "bag {bag_number}: volume_ml must be greater than zero"
            )));
        }
        if self.expiry_date < self.donation_date {
            return Err(WardError::invalid(format!(
                "bag {bag_number}: expiry_date {} is before donation_date {}",
                self.expiry_date, self.donation_date
            )));
        }

        Ok(BloodBag {
            bag_number,
            blood_type,
            component_type: self.component_type,
            volume_ml: self.volume_ml,
            donation_date: self.donation_date,
            expiry_date: self.expiry_date,
            source: self.source.trim().to_string(),
            screening_done: self.screening_done,
            crossmatch_compatible: self.crossmatch_compatible,
            transfused: false,
        })
    }
}

/// Kept on the record whenever a bag is added despite failing the ABO/Rh check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityOverride {
    pub bag_number: NonEmptyText,
    pub recipient: BloodType,
    pub donor: BloodType,
    pub confirmed_by: ActingUser,
    pub confirmed_at: DateTime<Utc>,
}

// ============================================================================
// Safety checklist
// ============================================================================

/// The four bedside verifications required before a transfusion may start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyChecklist {
    pub consent_obtained: bool,
    pub patient_identification_verified: bool,
    pub blood_group_verified: bool,
    pub crossmatch_checked: bool,
}

impl SafetyChecklist {
    pub fn all_confirmed() -> Self {
        Self {
            consent_obtained: true,
            patient_identification_verified: true,
            blood_group_verified: true,
            crossmatch_checked: true,
        }
    }

    /// One message per unchecked flag, in checklist order.
    pub fn unmet(&self) -> Vec<String> {
        [
            ("consent_obtained", self.consent_obtained),
            (
                "patient_identification_verified",
                self.patient_identification_verified,
            ),
            ("blood_group_verified", self.blood_group_verified),
            ("crossmatch_checked", self.crossmatch_checked),
        ]
        .into_iter()
        .filter(|(_, done)| !done)
        .map(|(flag, _)| format!("{flag} is false"))
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unmet().is_empty()
    }
}

// ============================================================================
// Vitals
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalsPhase {
    Pre,
    During,
    Post,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    pub transfusion_id: RecordId,
    pub patient_id: RecordId,
    pub phase: VitalsPhase,
    pub temperature_c: f64,
    pub pulse_bpm: u32,
    pub systolic_mmhg: u32,
    pub diastolic_mmhg: u32,
    pub respiratory_rate: u32,
    pub spo2_percent: u32,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: NonEmptyText,
}

impl VitalsSnapshot {
    pub(crate) fn validate(&self) -> WardResult<()> {
        if !(25.0..=45.0).contains(&self.temperature_c) {
            return Err(WardError::invalid(format!(
                "temperature_c {} is outside 25.0..=45.0",
                self.temperature_c
            )));
        }
        if self.spo2_percent > 100 {
            return Err(WardError::invalid(format!(
                "spo2_percent {} exceeds 100",
                self.spo2_percent
            )));
        }
        if self.diastolic_mmhg >= self.systolic_mmhg {
            return Err(WardError::invalid(format!(
                "diastolic_mmhg {} must be below systolic_mmhg {}",
                self.diastolic_mmhg, self.systolic_mmhg
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Complications
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplicationType {
    FebrileReaction,
    AllergicReaction,
    Anaphylaxis,
    HemolyticReaction,
    Trali,
    Taco,
    Sepsis,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplicationSeverity {
    Mild,
    Moderate,
    Severe,
    LifeThreatening,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Complication {
    pub id: RecordId,
    pub transfusion_id: RecordId,
    pub patient_id: RecordId,
    pub complication_type: ComplicationType,
    pub severity: ComplicationSeverity,
    /// Never empty, no duplicates, in the order first reported.
    pub symptoms: Vec<NonEmptyText>,
    #[serde(default)]
    pub management: String,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplicationInput {
    pub complication_type: ComplicationType,
    pub severity: ComplicationSeverity,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub management: String,
    pub detected_at: DateTime<Utc>,
}

impl ComplicationInput {
    /// Builds a [`Complication`] owned by `record`.
    ///
    /// Blank symptoms are dropped and duplicates collapsed before the
    /// at-least-one-symptom rule is applied.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ValidationFailed`] when no symptom remains.
    pub(crate) fn into_complication(self, record: &TransfusionRecord) -> WardResult<Complication> {
        let mut symptoms: Vec<NonEmptyText> = Vec::with_capacity(self.symptoms.len());
        for raw in &self.symptoms {
            let Ok(symptom) = NonEmptyText::named("symptom", raw) else {
                continue;
            };
            if !symptoms.contains(&symptom) {
                symptoms.push(symptom);
            }
        }
        if symptoms.is_empty() {
            return Err(WardError::invalid(
                "a complication requires at least one symptom",
            ));
        }

        Ok(Complication {
            id: RecordId::new(),
            transfusion_id: record.id,
            patient_id: record.patient_id,
            complication_type: self.complication_type,
            severity: self.severity,
            symptoms,
            management: self.management.trim().to_string(),
            detected_at: self.detected_at,
            resolved: false,
            resolved_at: None,
        })
    }
}

// ============================================================================
// Record
// ============================================================================

/// Prior transfusion history. Informational only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransfusionHistory {
    pub previous_transfusions: bool,
    #[serde(default)]
    pub previous_reactions: Option<String>,
}

/// Request to plan a new transfusion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTransfusion {
    pub indication: String,
    pub baseline_hb: f64,
    #[serde(default)]
    pub target_hb: Option<f64>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub history: TransfusionHistory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransfusionRecord {
    pub(crate) id: RecordId,
    pub(crate) patient_id: RecordId,
    /// Copied from the patient at planning time when known.
    pub(crate) patient_blood_type: Option<BloodType>,
    pub(crate) indication: NonEmptyText,
    pub(crate) baseline_hb: f64,
    pub(crate) target_hb: Option<f64>,
    pub(crate) urgent: bool,
    pub(crate) history: TransfusionHistory,
    pub(crate) blood_bags: Vec<BloodBag>,
    pub(crate) checklist: SafetyChecklist,
    pub(crate) pre_vitals: Option<VitalsSnapshot>,
    pub(crate) during_vitals: Vec<VitalsSnapshot>,
    pub(crate) post_vitals: Option<VitalsSnapshot>,
    pub(crate) complications: Vec<Complication>,
    pub(crate) compatibility_overrides: Vec<CompatibilityOverride>,
    pub(crate) status: TransfusionStatus,
    pub(crate) start_time: Option<DateTime<Utc>>,
    pub(crate) end_time: Option<DateTime<Utc>>,
    pub(crate) post_transfusion_hb: Option<f64>,
    pub(crate) hb_increment: Option<f64>,
    pub(crate) duration_minutes: Option<i64>,
    pub(crate) stop_reason: Option<NonEmptyText>,
    pub(crate) cancel_reason: Option<NonEmptyText>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) created_by: ActingUser,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) updated_by: ActingUser,
}

impl TransfusionRecord {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    pub fn patient_blood_type(&self) -> Option<BloodType> {
        self.patient_blood_type
    }

    pub fn indication(&self) -> &NonEmptyText {
        &self.indication
    }

    pub fn baseline_hb(&self) -> f64 {
        self.baseline_hb
    }

    pub fn target_hb(&self) -> Option<f64> {
        self.target_hb
    }

    pub fn urgent(&self) -> bool {
        self.urgent
    }

    pub fn history(&self) -> &TransfusionHistory {
        &self.history
    }

    pub fn blood_bags(&self) -> &[BloodBag] {
        &self.blood_bags
    }

    /// Always the live bag count.
    pub fn total_units(&self) -> usize {
        self.blood_bags.len()
    }

    pub fn checklist(&self) -> SafetyChecklist {
        self.checklist
    }

    pub fn pre_vitals(&self) -> Option<&VitalsSnapshot> {
        self.pre_vitals.as_ref()
    }

    pub fn during_vitals(&self) -> &[VitalsSnapshot] {
        &self.during_vitals
    }

    pub fn post_vitals(&self) -> Option<&VitalsSnapshot> {
        self.post_vitals.as_ref()
    }

    pub fn complications(&self) -> &[Complication] {
        &self.complications
    }

    /// True once any complication has been recorded, resolved or not.
    pub fn adverse_events(&self) -> bool {
        !self.complications.is_empty()
    }

    pub fn compatibility_overrides(&self) -> &[CompatibilityOverride] {
        &self.compatibility_overrides
    }

    pub fn status(&self) -> TransfusionStatus {
        self.status
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn post_transfusion_hb(&self) -> Option<f64> {
        self.post_transfusion_hb
    }

    pub fn hb_increment(&self) -> Option<f64> {
        self.hb_increment
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.duration_minutes
    }

    pub fn stop_reason(&self) -> Option<&NonEmptyText> {
        self.stop_reason.as_ref()
    }

    pub fn cancel_reason(&self) -> Option<&NonEmptyText> {
        self.cancel_reason.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> &ActingUser {
        &self.created_by
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn updated_by(&self) -> &ActingUser {
        &self.updated_by
    }

    pub(crate) fn stamp(&mut self, user: &ActingUser, at: DateTime<Utc>) {
        self.updated_at = at;
        self.updated_by = user.clone();
    }
}

impl Record for TransfusionRecord {
    const COLLECTION: &'static str = TRANSFUSIONS_COLLECTION;
    const KIND: RecordKind = RecordKind::Transfusion;

    fn id(&self) -> RecordId {
        self.id
    }

    fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    fn index_date(&self) -> DateTime<Utc> {
        self.created_at
    }
}
