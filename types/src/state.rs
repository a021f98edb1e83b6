//! Lifecycle state of an off-chain voter registration request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The status of a voter registration request.
///
/// Valid transitions:
/// - `Pending -> Approved` (admin registers the voter on-chain)
/// - `Pending -> Rejected` (admin declines, no contract call)
/// - `Rejected -> Pending` (the wallet resubmits)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a new submission may replace a record in this state.
    pub fn admits_resubmission(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Whether an admin decision may move a record from this state to `next`.
    pub fn can_decide(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(TypesError::InvalidStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_can_be_decided() {
        use RegistrationStatus::*;
        assert!(Pending.can_decide(Approved));
        assert!(Pending.can_decide(Rejected));
        assert!(!Approved.can_decide(Rejected));
        assert!(!Rejected.can_decide(Approved));
        assert!(!Pending.can_decide(Pending));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(
            "approved".parse::<RegistrationStatus>().unwrap(),
            RegistrationStatus::Approved
        );
        assert!("APPROVED".parse::<RegistrationStatus>().is_err());
        assert!("deleted".parse::<RegistrationStatus>().is_err());
    }
}
