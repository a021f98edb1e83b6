use chainvote_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("national id must be 12 digits")]
    InvalidNationalId,

    #[error("phone number must be 10 digits")]
    InvalidPhoneNumber,

    #[error("cannot derive an E.164 number from {0:?}")]
    UnformattablePhone(String),

    #[error("captured frame is empty")]
    EmptyFrame,

    #[error("no verification code was issued for {0}")]
    OtpNotIssued(String),

    #[error("verification code has expired")]
    OtpExpired,

    #[error("verification code does not match")]
    OtpMismatch,

    #[error("too many wrong codes; request a new one")]
    OtpAttemptsExhausted,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
