//! Validated primitive types shared across the ward crates.
//!
//! Clinical free text (indications, bag numbers, stop reasons, symptoms) is
//! frequently required to be present. [`NonEmptyText`] makes that requirement
//! part of the type so it is checked once, at the boundary.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty("text"))` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        Self::named("text", input)
    }

    /// Like [`NonEmptyText::new`], but the error names the field being validated.
    ///
    /// ```
    /// use ward_types::{NonEmptyText, TextError};
    ///
    /// let err = NonEmptyText::named("indication", "   ").unwrap_err();
    /// assert_eq!(err, TextError::Empty("indication"));
    /// ```
    pub fn named(field: &'static str, input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty(field));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_input() {
        let text = NonEmptyText::new("  febrile  ").unwrap();
        assert_eq!(text.as_str(), "febrile");
    }

    #[test]
    fn test_new_rejects_whitespace() {
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty("text")));
    }

    #[test]
    fn test_named_error_message_mentions_field() {
        let err = NonEmptyText::named("stop reason", "").unwrap_err();
        assert_eq!(err.to_string(), "stop reason cannot be empty");
    }

    #[test]
    fn test_deserialize_rejects_empty_string() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());

        let ok: NonEmptyText = serde_json::from_str("\"rigors\"").unwrap();
        assert_eq!(ok.as_str(), "rigors");
    }
}
