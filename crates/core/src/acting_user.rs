//! The clinician performing a write.
//!
//! Every mutating operation takes an explicit [`ActingUser`] which is stamped onto
//! the record (`updated_by`) and onto emitted audit events.

use crate::WardResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use ward_types::NonEmptyText;

/// Represents the person on whose behalf an operation is performed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    /// Display name of the user.
    pub name: NonEmptyText,

    /// Professional role (e.g. "Staff Nurse", "Registrar").
    pub role: NonEmptyText,
}

impl ActingUser {
    /// Builds an acting user from raw strings.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WardError::ValidationFailed`] if either value is blank.
    pub fn new(name: impl AsRef<str>, role: impl AsRef<str>) -> WardResult<Self> {
        Ok(Self {
            name: NonEmptyText::named("acting user name", name)?,
            role: NonEmptyText::named("acting user role", role)?,
        })
    }
}

impl fmt::Display for ActingUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.role)
    }
}
