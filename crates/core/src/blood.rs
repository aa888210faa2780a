//! ABO/Rh blood types and red-cell compatibility rules.
//!
//! The compatibility table is fixed at compile time and shared freely between
//! threads. [`is_compatible`] is total: every recipient/donor pair has an answer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

use BloodType::*;

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        APositive, ANegative, BPositive, BNegative, AbPositive, AbNegative, OPositive, ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            APositive => "A+",
            ANegative => "A-",
            BPositive => "B+",
            BNegative => "B-",
            AbPositive => "AB+",
            AbNegative => "AB-",
            OPositive => "O+",
            ONegative => "O-",
        }
    }

    /// Donor types this recipient may receive, own type first.
    pub fn accepted_donors(&self) -> &'static [BloodType] {
        match self {
            APositive => &[APositive, ANegative, OPositive, ONegative],
            ANegative => &[ANegative, ONegative],
            BPositive => &[BPositive, BNegative, OPositive, ONegative],
            BNegative => &[BNegative, ONegative],
            AbPositive => &Self::ALL,
            AbNegative => &[AbNegative, ANegative, BNegative, ONegative],
            OPositive => &[OPositive, ONegative],
            ONegative => &[ONegative],
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown blood type '{0}' (expected one of A+, A-, B+, B-, AB+, AB-, O+, O-)")]
pub struct ParseBloodTypeError(String);

impl FromStr for BloodType {
    type Err = ParseBloodTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase();
        BloodType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalised)
            .ok_or_else(|| ParseBloodTypeError(s.to_string()))
    }
}

/// Returns whether `recipient` may receive red cells from `donor`.
pub fn is_compatible(recipient: BloodType, donor: BloodType) -> bool {
    recipient.accepted_donors().contains(&donor)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Rows are recipients, columns donors, both in `BloodType::ALL` order.
    const EXPECTED: [[bool; 8]; 8] = [
        // A+     A-     B+     B-     AB+    AB-    O+     O-
        [true, true, false, false, false, false, true, true], // A+
        [false, true, false, false, false, false, false, true], // A-
        [false, false, true, true, false, false, true, true], // B+
        [false, false, false, true, false, false, false, true], // B-
        [true, true, true, true, true, true, true, true],     // AB+
        [false, true, false, true, false, true, false, true], // AB-
        [false, false, false, false, false, false, true, true], // O+
        [false, false, false, false, false, false, false, true], // O-
    ];

    #[test]
    fn test_every_pair_matches_table() {
        for (r, recipient) in BloodType::ALL.iter().enumerate() {
            for (d, donor) in BloodType::ALL.iter().enumerate() {
                assert_eq!(
                    is_compatible(*recipient, *donor),
                    EXPECTED[r][d],
                    "recipient {recipient} donor {donor}"
                );
            }
        }
    }

    #[test]
    fn test_o_negative_donates_to_everyone() {
        for recipient in BloodType::ALL {
            assert!(is_compatible(recipient, ONegative));
        }
    }

    #[test]
    fn test_ab_positive_receives_from_everyone() {
        for donor in BloodType::ALL {
            assert!(is_compatible(AbPositive, donor));
        }
    }

    #[test]
    fn test_a_positive_accepts_expected_set() {
        assert_eq!(
            APositive.accepted_donors(),
            &[APositive, ANegative, OPositive, ONegative]
        );
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("ab-".parse::<BloodType>().unwrap(), AbNegative);
        assert_eq!(" O+ ".parse::<BloodType>().unwrap(), OPositive);
        assert!("C+".parse::<BloodType>().is_err());
        for t in BloodType::ALL {
            assert_eq!(t.to_string().parse::<BloodType>().unwrap(), t);
        }
    }

    #[test]
    fn test_serde_uses_clinical_notation() {
        assert_eq!(serde_json::to_string(&AbPositive).unwrap(), "\"AB+\"");
        let parsed: BloodType = serde_json::from_str("\"O-\"").unwrap();
        assert_eq!(parsed, ONegative);
    }
}
