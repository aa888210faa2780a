//! Record identifiers and sharded-path utilities.
//!
//! Every ward record (patient summary, transfusion, admission, treatment plan) is
//! addressed by a [`RecordId`]: a UUID held in a *canonical* text form of
//! **32 lowercase hexadecimal characters** (no hyphens), for example
//! `550e8400e29b41d4a716446655440000`.
//!
//! Canonical form is required for identifiers arriving from outside the core
//! (CLI arguments, REST paths). Use [`RecordId::parse`] to validate them;
//! uppercase, hyphenated, wrong-length or non-hex values are rejected.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, the file store keeps data under
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`, which keeps directory fan-out small
//! when a collection grows to many thousands of records.

mod id;

pub use id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
