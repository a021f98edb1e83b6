//! Voter registration storage trait and lifecycle rules.

use chainvote_types::{RegistrationStatus, Timestamp, VoterAddress};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// An off-chain request by a wallet to be registered as a voter.
///
/// Keyed by `address`. Records are never hard-deleted: rejection is a status
/// change so the history of a wallet's requests stays visible to admins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterRegistration {
    pub address: VoterAddress,
    /// Opaque face-capture digest (simulated).
    pub face_data: String,
    /// Opaque fingerprint-capture digest (simulated).
    pub fingerprint_data: String,
    pub national_id: String,
    pub phone_number: String,
    pub status: RegistrationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The caller-supplied part of a registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSubmission {
    pub address: VoterAddress,
    pub face_data: String,
    pub fingerprint_data: String,
    pub national_id: String,
    pub phone_number: String,
}

/// Storage for voter registrations.
///
/// Implementations must run [`admit_submission`] and the subsequent write
/// atomically with respect to other writers of the same address, so that two
/// concurrent submissions for a new address cannot both succeed.
pub trait RegistrationStore: Send + Sync {
    /// Create or resubmit a registration. New records start as `pending`.
    fn submit(
        &self,
        submission: RegistrationSubmission,
        now: Timestamp,
    ) -> Result<VoterRegistration, StoreError>;

    fn get(&self, address: &VoterAddress) -> Result<Option<VoterRegistration>, StoreError>;

    /// All registrations, optionally filtered by status, ordered by
    /// creation time then address.
    fn list(
        &self,
        filter: Option<RegistrationStatus>,
    ) -> Result<Vec<VoterRegistration>, StoreError>;

    /// Overwrite the status of an existing record. `NotFound` if absent.
    fn set_status(
        &self,
        address: &VoterAddress,
        status: RegistrationStatus,
        now: Timestamp,
    ) -> Result<VoterRegistration, StoreError>;

    fn count(&self) -> Result<u64, StoreError> {
        self.list(None).map(|v| v.len() as u64)
    }
}

/// Decide whether `submission` may be stored given the `existing` record for
/// the same address, and build the record to write.
///
/// - no record: a fresh `pending` record
/// - `pending` or `approved`: `Conflict`
/// - `rejected`: payload overwritten, status back to `pending`, original
///   `created_at` kept
pub fn admit_submission(
    existing: Option<&VoterRegistration>,
    submission: RegistrationSubmission,
    now: Timestamp,
) -> Result<VoterRegistration, StoreError> {
    let created_at = match existing {
        None => now,
        Some(prev) => match prev.status {
            RegistrationStatus::Pending => {
                return Err(StoreError::Conflict(format!(
                    "a registration request for {} is already pending",
                    prev.address
                )));
            }
            RegistrationStatus::Approved => {
                return Err(StoreError::Conflict(format!(
                    "{} is already registered as a voter",
                    prev.address
                )));
            }
            RegistrationStatus::Rejected => prev.created_at,
        },
    };

    Ok(VoterRegistration {
        address: submission.address,
        face_data: submission.face_data,
        fingerprint_data: submission.fingerprint_data,
        national_id: submission.national_id,
        phone_number: submission.phone_number,
        status: RegistrationStatus::Pending,
        created_at,
        updated_at: now,
    })
}

/// Set a record's status and bump `updated_at`.
pub fn apply_status(record: &mut VoterRegistration, status: RegistrationStatus, now: Timestamp) {
    record.status = status;
    record.updated_at = now;
}

/// Order registrations oldest first, ties broken by address.
pub fn sort_registrations(records: &mut [VoterRegistration]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.address.cmp(&b.address))
    });
}
