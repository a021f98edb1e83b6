//! Contract-owned records: candidates and per-address voter flags.
//!
//! These mirror the voting contract's storage and are read-only from the
//! service's point of view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a candidate in the contract's `candidates` array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(u64);

impl CandidateId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CandidateId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

/// The contract's `voters(address)` record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterStatus {
    pub is_registered: bool,
    /// Monotonic on-chain: once true it never resets.
    pub has_voted: bool,
}

impl VoterStatus {
    /// Registered and has not yet voted.
    pub fn can_vote(&self) -> bool {
        self.is_registered && !self.has_voted
    }
}
