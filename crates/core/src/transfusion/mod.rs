//! Transfusion safety workflow.
//!
//! [`record`] defines the aggregate and its parts; [`workflow`] is the only code
//! allowed to change a [`TransfusionRecord`] once it exists.

pub mod record;
pub mod workflow;

pub use record::{
    BloodBag, BloodBagInput, CompatibilityOverride, Complication, ComplicationInput,
    ComplicationSeverity, ComplicationType, ComponentType, NewTransfusion, SafetyChecklist,
    TransfusionHistory, TransfusionRecord, TransfusionStatus, VitalsPhase, VitalsSnapshot,
};
pub use workflow::{CompatibilityCheck, TransfusionWorkflow};
