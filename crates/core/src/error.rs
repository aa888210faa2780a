use std::fmt;

/// The kind of record a [`WardError::NotFound`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Patient,
    Transfusion,
    Admission,
    TreatmentPlan,
    BloodBag,
    Complication,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Patient => "patient",
            RecordKind::Transfusion => "transfusion",
            RecordKind::Admission => "admission",
            RecordKind::TreatmentPlan => "treatment plan",
            RecordKind::BloodBag => "blood bag",
            RecordKind::Complication => "complication",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WardError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("cannot {operation}: {}", unmet.join(", "))]
    PreconditionFailed {
        operation: &'static str,
        unmet: Vec<String>,
    },

    #[error("cannot {operation} while status is {status}")]
    InvalidState {
        operation: &'static str,
        status: String,
    },

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("failed to create storage directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("record schema mismatch in {path} at {field}: {message}")]
    YamlDeserialization {
        path: String,
        field: String,
        message: String,
    },
}

impl WardError {
    pub(crate) fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        WardError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        WardError::ValidationFailed(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WardError::NotFound { .. })
    }
}

impl From<ward_types::TextError> for WardError {
    fn from(err: ward_types::TextError) -> Self {
        WardError::ValidationFailed(err.to_string())
    }
}

impl From<ward_uuid::UuidError> for WardError {
    fn from(err: ward_uuid::UuidError) -> Self {
        WardError::ValidationFailed(err.to_string())
    }
}

pub type WardResult<T> = std::result::Result<T, WardError>;
