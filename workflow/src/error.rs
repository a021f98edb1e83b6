use chainvote_contract::ContractError;
use chainvote_store::StoreError;
use chainvote_types::{RegistrationStatus, VoterAddress};
use chainvote_verification::VerificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0} is not the contract admin")]
    NotAdmin(VoterAddress),

    #[error("cannot move a registration from {from} to {to}")]
    InvalidTransition {
        from: RegistrationStatus,
        to: RegistrationStatus,
    },

    /// A pre-check refused the vote before anything was sent.
    #[error("{0}")]
    VoteRefused(String),

    #[error("{0}")]
    Otp(String),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl WorkflowError {
    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Contract(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}

impl From<VerificationError> for WorkflowError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Store(s) => s.into(),
            VerificationError::OtpNotIssued(_)
            | VerificationError::OtpExpired
            | VerificationError::OtpMismatch
            | VerificationError::OtpAttemptsExhausted => Self::Otp(e.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_maps_to_conflict() {
        let e: WorkflowError = StoreError::Conflict("dup".into()).into();
        assert!(matches!(e, WorkflowError::Conflict(m) if m == "dup"));
    }

    #[test]
    fn contract_revert_user_message() {
        let e: WorkflowError = ContractError::Revert {
            reason: "You have already voted".into(),
        }
        .into();
        assert_eq!(e.user_message(), "You have already voted");
    }

    #[test]
    fn otp_errors_grouped() {
        let e: WorkflowError = VerificationError::OtpExpired.into();
        assert!(matches!(e, WorkflowError::Otp(_)));
        let e: WorkflowError = VerificationError::InvalidNationalId.into();
        assert!(matches!(e, WorkflowError::Validation(_)));
    }
}
