//! Abstract storage traits for the chainvote service.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! The registration lifecycle rules (who may submit, what a resubmission
//! overwrites) live here as pure functions so every backend applies them the
//! same way inside its own atomic section.

pub mod error;
pub mod hidden;
pub mod meta;
pub mod otp;
pub mod registration;

pub use error::StoreError;
pub use hidden::HiddenCandidateStore;
pub use meta::MetaStore;
pub use otp::{OtpChallenge, OtpStore};
pub use registration::{
    admit_submission, apply_status, sort_registrations, RegistrationStore,
    RegistrationSubmission, VoterRegistration,
};
