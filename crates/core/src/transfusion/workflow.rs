//! Transfusion state machine.
//!
//! ```text
//! planned ──start──▶ in_progress ──complete──▶ completed
//!    │                    └───────stop───────▶ stopped
//!    └──────cancel──────────────────────────▶ cancelled
//! ```
//!
//! Every transition takes the current record by reference and returns the next
//! version. A rejected transition returns an error and the caller's record is
//! left exactly as it was.

use super::record::{
    BloodBagInput, CompatibilityOverride, ComplicationInput, NewTransfusion, SafetyChecklist,
    TransfusionRecord, TransfusionStatus, VitalsPhase, VitalsSnapshot,
};
use crate::acting_user::ActingUser;
use crate::blood::{is_compatible, BloodType};
use crate::error::{RecordKind, WardError, WardResult};
use crate::patient::PatientSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use ward_types::NonEmptyText;
use ward_uuid::RecordId;

/// Advisory result of checking a donor type against the recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CompatibilityCheck {
    Compatible {
        recipient: BloodType,
        donor: BloodType,
    },
    Incompatible {
        recipient: BloodType,
        donor: BloodType,
    },
    /// The patient has not been grouped, so nothing can be checked.
    RecipientUnknown,
}

/// Namespace for the transition functions.
pub struct TransfusionWorkflow;

impl TransfusionWorkflow {
    /// Creates a `planned` transfusion for `patient`.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ValidationFailed`] if the indication is blank or a
    /// haemoglobin value is not positive.
    pub fn plan(
        patient: &PatientSummary,
        new: NewTransfusion,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        let indication = NonEmptyText::named("indication", &new.indication)?;
        if !(new.baseline_hb > 0.0) {
            return Err(WardError::invalid(format!(
                "baseline_hb must be greater than zero, got {}",
                new.baseline_hb
            )));
        }
        if let Some(target) = new.target_hb {
            if !(target > 0.0) {
                return Err(WardError::invalid(format!(
                    "target_hb must be greater than zero, got {target}"
                )));
            }
        }

        Ok(TransfusionRecord {
            id: RecordId::new(),
            patient_id: patient.id,
            patient_blood_type: patient.blood_type,
            indication,
            baseline_hb: new.baseline_hb,
            target_hb: new.target_hb,
            urgent: new.urgent,
            history: new.history,
            blood_bags: Vec::new(),
            checklist: SafetyChecklist::default(),
            pre_vitals: None,
            during_vitals: Vec::new(),
            post_vitals: None,
            complications: Vec::new(),
            compatibility_overrides: Vec::new(),
            status: TransfusionStatus::Planned,
            start_time: None,
            end_time: None,
            post_transfusion_hb: None,
            hb_increment: None,
            duration_minutes: None,
            stop_reason: None,
            cancel_reason: None,
            created_at: now,
            created_by: user.clone(),
            updated_at: now,
            updated_by: user.clone(),
        })
    }

    pub fn check_compatibility(record: &TransfusionRecord, donor: BloodType) -> CompatibilityCheck {
        match record.patient_blood_type {
            None => CompatibilityCheck::RecipientUnknown,
            Some(recipient) if is_compatible(recipient, donor) => {
                CompatibilityCheck::Compatible { recipient, donor }
            }
            Some(recipient) => CompatibilityCheck::Incompatible { recipient, donor },
        }
    }

    /// Appends a bag to a planned transfusion.
    ///
    /// An incompatible bag is only appended when `override_confirmed` is set,
    /// in which case a [`CompatibilityOverride`] is kept on the record.
    ///
    /// # Errors
    ///
    /// - [`WardError::InvalidState`] unless the record is `planned`.
    /// - [`WardError::ValidationFailed`] for invalid bag details or a
    ///   duplicate bag number.
    /// - [`WardError::PreconditionFailed`] for an unconfirmed incompatibility.
    pub fn add_bag(
        record: &TransfusionRecord,
        input: BloodBagInput,
        override_confirmed: bool,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_status(record, &[TransfusionStatus::Planned], "add blood bag")?;
        let bag = input.validate()?;

        if record
            .blood_bags
            .iter()
            .any(|existing| existing.bag_number == bag.bag_number)
        {
            return Err(WardError::invalid(format!(
                "bag {} is already attached to this transfusion",
                bag.bag_number
            )));
        }

        let mut next = record.clone();
        if let CompatibilityCheck::Incompatible { recipient, donor } =
            Self::check_compatibility(record, bag.blood_type)
        {
            if !override_confirmed {
                return Err(WardError::PreconditionFailed {
                    operation: "add blood bag",
                    unmet: vec![format!(
                        "donor {donor} is incompatible with recipient {recipient} and no override was confirmed"
                    )],
                });
            }
            next.compatibility_overrides.push(CompatibilityOverride {
                bag_number: bag.bag_number.clone(),
                recipient,
                donor,
                confirmed_by: user.clone(),
                confirmed_at: now,
            });
        }

        next.blood_bags.push(bag);
        next.stamp(user, now);
        Ok(next)
    }

    /// Removes the bag at `index` from a planned transfusion.
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidState`] unless `planned`; [`WardError::NotFound`]
    /// if there is no bag at `index`.
    pub fn remove_bag(
        record: &TransfusionRecord,
        index: usize,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_status(record, &[TransfusionStatus::Planned], "remove blood bag")?;
        if index >= record.blood_bags.len() {
            return Err(WardError::not_found(
                RecordKind::BloodBag,
                format!("index {index} on transfusion {}", record.id),
            ));
        }

        let mut next = record.clone();
        next.blood_bags.remove(index);
        next.stamp(user, now);
        Ok(next)
    }

    /// Replaces the safety checklist of a planned transfusion.
    pub fn update_checklist(
        record: &TransfusionRecord,
        checklist: SafetyChecklist,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_status(record, &[TransfusionStatus::Planned], "update checklist")?;
        let mut next = record.clone();
        next.checklist = checklist;
        next.stamp(user, now);
        Ok(next)
    }

    /// Records a vitals snapshot. `pre` and `post` overwrite; `during` appends.
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidState`] on a terminal record;
    /// [`WardError::ValidationFailed`] if the snapshot belongs to another
    /// transfusion or holds implausible values.
    pub fn record_vitals(
        record: &TransfusionRecord,
        snapshot: VitalsSnapshot,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_not_terminal(record, "record vitals")?;
        if snapshot.transfusion_id != record.id || snapshot.patient_id != record.patient_id {
            return Err(WardError::invalid(
                "vitals snapshot does not belong to this transfusion",
            ));
        }
        snapshot.validate()?;

        let mut next = record.clone();
        match snapshot.phase {
            VitalsPhase::Pre => next.pre_vitals = Some(snapshot),
            VitalsPhase::During => next.during_vitals.push(snapshot),
            VitalsPhase::Post => next.post_vitals = Some(snapshot),
        }
        next.stamp(user, now);
        Ok(next)
    }

    /// Records a complication; `adverse_events` becomes true for good.
    pub fn record_complication(
        record: &TransfusionRecord,
        input: ComplicationInput,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_not_terminal(record, "record complication")?;
        let complication = input.into_complication(record)?;

        let mut next = record.clone();
        next.complications.push(complication);
        next.stamp(user, now);
        Ok(next)
    }

    /// Marks a complication resolved.
    ///
    /// # Errors
    ///
    /// - [`WardError::InvalidState`] on a terminal record.
    /// - [`WardError::NotFound`] for an unknown complication id.
    /// - [`WardError::ValidationFailed`] if already resolved or if
    ///   `resolved_at` precedes detection.
    pub fn resolve_complication(
        record: &TransfusionRecord,
        complication_id: RecordId,
        resolved_at: DateTime<Utc>,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_not_terminal(record, "resolve complication")?;

        let mut next = record.clone();
        let complication = next
            .complications
            .iter_mut()
            .find(|c| c.id == complication_id)
            .ok_or_else(|| WardError::not_found(RecordKind::Complication, complication_id))?;
        if complication.resolved {
            return Err(WardError::invalid(format!(
                "complication {complication_id} is already resolved"
            )));
        }
        if resolved_at < complication.detected_at {
            return Err(WardError::invalid(format!(
                "resolved_at {resolved_at} is before detected_at {}",
                complication.detected_at
            )));
        }
        complication.resolved = true;
        complication.resolved_at = Some(resolved_at);

        next.stamp(user, now);
        Ok(next)
    }

    /// Starts a planned transfusion.
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidState`] unless `planned`;
    /// [`WardError::PreconditionFailed`] naming every unchecked checklist flag
    /// and the absence of bags.
    pub fn start(
        record: &TransfusionRecord,
        start_time: DateTime<Utc>,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_status(record, &[TransfusionStatus::Planned], "start transfusion")?;

        let mut unmet = record.checklist.unmet();
        if record.total_units() == 0 {
            unmet.push("no blood bags attached".to_string());
        }
        if !unmet.is_empty() {
            return Err(WardError::PreconditionFailed {
                operation: "start transfusion",
                unmet,
            });
        }

        let mut next = record.clone();
        next.status = TransfusionStatus::InProgress;
        next.start_time = Some(start_time);
        next.stamp(user, now);
        Ok(next)
    }

    /// Completes an in-progress transfusion and derives duration and Hb increment.
    ///
    /// A negative `hb_increment` is kept as is.
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidState`] unless `in_progress`;
    /// [`WardError::ValidationFailed`] if `end_time` precedes the start or
    /// `post_hb` is not positive.
    pub fn complete(
        record: &TransfusionRecord,
        end_time: DateTime<Utc>,
        post_hb: Option<f64>,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_status(record, &[TransfusionStatus::InProgress], "complete transfusion")?;
        let duration = elapsed_minutes(record, end_time)?;
        if let Some(hb) = post_hb {
            if !(hb > 0.0) {
                return Err(WardError::invalid(format!(
                    "post_transfusion_hb must be greater than zero, got {hb}"
                )));
            }
        }

        let mut next = record.clone();
        next.status = TransfusionStatus::Completed;
        next.end_time = Some(end_time);
        next.duration_minutes = Some(duration);
        if let Some(hb) = post_hb {
            next.post_transfusion_hb = Some(hb);
            next.hb_increment = Some(hb - record.baseline_hb);
        }
        for bag in &mut next.blood_bags {
            bag.transfused = true;
        }
        next.stamp(user, now);
        Ok(next)
    }

    /// Stops an in-progress transfusion at `now`.
    ///
    /// A stop is never refused over timing: if `now` is earlier than the
    /// recorded start, the end time is pinned to the start and the duration
    /// is zero.
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidState`] unless `in_progress`;
    /// [`WardError::ValidationFailed`] for a blank reason.
    pub fn stop(
        record: &TransfusionRecord,
        reason: &str,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_status(record, &[TransfusionStatus::InProgress], "stop transfusion")?;
        let reason = NonEmptyText::named("stop reason", reason)?;
        let end_time = match record.start_time {
            Some(start) if now < start => {
                tracing::warn!(
                    "transfusion {} stopped at {} before its recorded start {}; pinning end to start",
                    record.id,
                    now,
                    start
                );
                start
            }
            _ => now,
        };

        let mut next = record.clone();
        next.status = TransfusionStatus::Stopped;
        next.end_time = Some(end_time);
        next.duration_minutes = record
            .start_time
            .map(|start| (end_time - start).num_minutes());
        next.stop_reason = Some(reason);
        next.stamp(user, now);
        Ok(next)
    }

    /// Cancels a transfusion that never started. The record is kept.
    pub fn cancel(
        record: &TransfusionRecord,
        reason: &str,
        user: &ActingUser,
        now: DateTime<Utc>,
    ) -> WardResult<TransfusionRecord> {
        require_status(record, &[TransfusionStatus::Planned], "cancel transfusion")?;
        let reason = NonEmptyText::named("cancel reason", reason)?;

        let mut next = record.clone();
        next.status = TransfusionStatus::Cancelled;
        next.cancel_reason = Some(reason);
        next.stamp(user, now);
        Ok(next)
    }
}

fn require_not_terminal(record: &TransfusionRecord, operation: &'static str) -> WardResult<()> {
    if record.status.is_terminal() {
        return Err(WardError::InvalidState {
            operation,
            status: record.status.to_string(),
        });
    }
    Ok(())
}

fn require_status(
    record: &TransfusionRecord,
    allowed: &[TransfusionStatus],
    operation: &'static str,
) -> WardResult<()> {
    if !allowed.contains(&record.status) {
        return Err(WardError::InvalidState {
            operation,
            status: record.status.to_string(),
        });
    }
    Ok(())
}

fn elapsed_minutes(record: &TransfusionRecord, end: DateTime<Utc>) -> WardResult<i64> {
    let start = record
        .start_time
        .ok_or_else(|| WardError::invalid("in-progress transfusion has no start_time"))?;
    if end < start {
        return Err(WardError::invalid(format!(
            "end_time {end} is before start_time {start}"
        )));
    }
    Ok((end - start).num_minutes())
}
