//! Best-effort audit side channel.
//!
//! Emitting an audit event can never fail or block the operation that produced it:
//! [`AuditSink::emit`] returns nothing, and sinks swallow their own delivery errors.

use crate::acting_user::ActingUser;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use ward_uuid::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TransfusionPlanned,
    BagAdded,
    BagRemoved,
    CompatibilityOverride,
    ChecklistUpdated,
    VitalsRecorded,
    ComplicationRecorded,
    ComplicationResolved,
    TransfusionStarted,
    TransfusionCompleted,
    TransfusionStopped,
    TransfusionCancelled,
    PatientAdmitted,
    DischargeRequested,
    PatientDischarged,
    PlanCreated,
    PlanProgressUpdated,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    pub actor: ActingUser,
    pub action: AuditAction,
    pub record_id: RecordId,
    pub patient_id: RecordId,
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(
        actor: &ActingUser,
        action: AuditAction,
        record_id: RecordId,
        patient_id: RecordId,
    ) -> Self {
        Self {
            at: Utc::now(),
            actor: actor.clone(),
            action,
            record_id,
            patient_id,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Writes audit events to the `ward::audit` tracing target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::info!(
            target: "ward::audit",
            action = ?event.action,
            record_id = %event.record_id,
            patient_id = %event.patient_id,
            actor = %event.actor,
            detail = event.detail.as_deref().unwrap_or(""),
        );
    }
}

/// Forwards audit events to an unbounded channel drained elsewhere.
#[derive(Clone, Debug)]
pub struct ChannelAuditSink {
    sender: UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    pub fn new(sender: UnboundedSender<AuditEvent>) -> Self {
        Self { sender }
    }
}

impl AuditSink for ChannelAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.sender.send(event) {
            tracing::debug!(
                target: "ward::audit",
                "audit receiver gone, dropping {:?}",
                err.0.action
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn event() -> AuditEvent {
        AuditEvent::new(
            &ActingUser::new("Dr Patel", "Registrar").unwrap(),
            AuditAction::CompatibilityOverride,
            RecordId::new(),
            RecordId::new(),
        )
        .with_detail("bag B1")
    }

    #[test]
    fn test_channel_sink_delivers_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelAuditSink::new(tx);
        let sent = event();
        sink.emit(sent.clone());
        assert_eq!(rx.try_recv().unwrap(), sent);
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ChannelAuditSink::new(tx).emit(event());
    }
}
