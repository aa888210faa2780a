//! # Ward Core
//!
//! Core clinical logic for the ward safety system:
//! - Blood-type compatibility rules
//! - The transfusion safety workflow (state machine, derived fields)
//! - Admission and treatment-plan records
//! - Length of stay, schedule variance and the alert feed
//! - The per-patient status view
//!
//! Records are persisted through the [`RecordStore`] trait; an in-memory store
//! and a sharded YAML file store are provided.
//!
//! **No API concerns**: HTTP routing and request parsing belong in `api-rest`.

pub mod acting_user;
pub mod admission;
pub mod alerts;
pub mod audit;
pub mod blood;
pub mod config;
pub mod constants;
pub mod error;
pub mod locks;
pub mod patient;
pub mod progress;
pub mod services;
pub mod store;
pub mod transfusion;
pub mod treatment_plan;

pub use acting_user::ActingUser;
pub use admission::{AdmissionRecord, AdmissionStatus, NewAdmission};
pub use alerts::{generate_alerts, Alert, AlertKind, AlertSeverity};
pub use audit::{AuditAction, AuditEvent, AuditSink, ChannelAuditSink, TracingAuditSink};
pub use blood::{is_compatible, BloodType};
pub use config::{alert_thresholds_from_env_values, AlertThresholds, CoreConfig};
pub use error::{RecordKind, WardError, WardResult};
pub use patient::PatientSummary;
pub use progress::{overall_progress, LengthOfStay, ScheduleVariance};
pub use services::{
    AdmissionService, CurrentStatus, PatientStatus, PatientStatusService, PlanProgress,
    TransfusionService, TreatmentPlanService,
};
pub use store::{FileStore, InMemoryStore, Record, RecordStore};
pub use treatment_plan::{NewTreatmentPlan, PlanStatus, TreatmentPlanExecution};
pub use ward_uuid::RecordId;
