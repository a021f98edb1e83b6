//! One-time password challenge storage.

use chainvote_types::{Timestamp, VoterAddress};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// An issued phone-verification code awaiting confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub address: VoterAddress,
    /// Phone number in E.164 form.
    pub phone_number: String,
    pub code: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    /// Wrong codes presented so far.
    pub failed_attempts: u32,
}

impl OtpChallenge {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// At most one outstanding challenge per address; `put` replaces any previous one.
pub trait OtpStore: Send + Sync {
    fn put(&self, challenge: &OtpChallenge) -> Result<(), StoreError>;
    fn get(&self, address: &VoterAddress) -> Result<Option<OtpChallenge>, StoreError>;
    /// Returns `false` if there was nothing to remove.
    fn remove(&self, address: &VoterAddress) -> Result<bool, StoreError>;
}
