//! Constants used throughout the ward core crate.
//!
//! Collection names, file names and default thresholds live here so the file
//! store, configuration and alert engine agree on them.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "ward_data";

/// Collection name for patient summaries supplied by the registration system.
pub const PATIENTS_COLLECTION: &str = "patients";

/// Collection name for transfusion records.
pub const TRANSFUSIONS_COLLECTION: &str = "transfusions";

/// Collection name for admission records.
pub const ADMISSIONS_COLLECTION: &str = "admissions";

/// Collection name for treatment-plan execution records.
pub const TREATMENT_PLANS_COLLECTION: &str = "treatment_plans";

/// Filename for a single stored record.
pub const RECORD_FILENAME: &str = "record.yaml";

/// Directory (inside each collection) holding the patient secondary index.
pub const BY_PATIENT_DIR_NAME: &str = "by-patient";

/// A stay longer than this many days raises a `long_stay` alert.
pub const DEFAULT_LONG_STAY_DAYS: i64 = 14;

/// A stay longer than this many days raises the `long_stay` alert as critical.
pub const DEFAULT_CRITICAL_STAY_DAYS: i64 = 30;

/// More overdue steps than this raise the `overdue_step` alert as high.
pub const DEFAULT_OVERDUE_STEPS_HIGH: u32 = 5;
