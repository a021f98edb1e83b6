//! Decoding of the voting contract's event logs.

use chainvote_types::{CandidateId, VoterAddress};
use serde::{Deserialize, Serialize};

use crate::abi::{self, WORD};
use crate::ContractError;

/// Event signature hashes (`topics[0]`), lowercase hex without prefix.
pub mod topic {
    pub const VOTING_STARTED: &str =
        "877e2548498f42b7975a186b94ef1d32c86d420b7b806dd2be2bea293b895904";
    pub const VOTING_ENDED: &str =
        "7a19ed057db79e3c2fa0b97a54b43bef4fce74b31bb6c01af514b9a18a7f70ab";
    pub const VOTE_CAST: &str =
        "a36cc2bebb74db33e9f88110a07ef56e1b31b24b4c4f51b54b1664266e29f45b";
    pub const CANDIDATE_ADDED: &str =
        "e83b2a43e7e82d975c8a0a6d2f045153c869e111136a34d1889ab7b598e396a3";
    pub const VOTER_REGISTERED: &str =
        "b6be2187d059cc2a55fe29e0e503b566e1e0f8c8780096e185429350acffd3dd";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ContractEvent {
    VotingStarted,
    VotingEnded,
    #[serde(rename_all = "camelCase")]
    VoteCast {
        voter: VoterAddress,
        candidate_id: CandidateId,
    },
    #[serde(rename_all = "camelCase")]
    CandidateAdded {
        candidate_id: CandidateId,
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    VoterRegistered { voter: VoterAddress },
}

impl ContractEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VotingStarted => "VotingStarted",
            Self::VotingEnded => "VotingEnded",
            Self::VoteCast { .. } => "VoteCast",
            Self::CandidateAdded { .. } => "CandidateAdded",
            Self::VoterRegistered { .. } => "VoterRegistered",
        }
    }

    /// Decode a raw log. Returns `Ok(None)` for logs with an unknown signature.
    ///
    /// Parameters may be indexed (in `topics[1..]`) or not (in `data`); both
    /// layouts are accepted.
    pub fn decode(topics: &[String], data: &[u8]) -> Result<Option<Self>, ContractError> {
        let Some(signature) = topics.first() else {
            return Ok(None);
        };
        let signature = signature.trim_start_matches("0x").to_ascii_lowercase();
        let indexed: Vec<Vec<u8>> = topics[1..]
            .iter()
            .map(|t| abi::from_hex_data(t))
            .collect::<Result<_, _>>()?;

        let event = match signature.as_str() {
            topic::VOTING_STARTED => Self::VotingStarted,
            topic::VOTING_ENDED => Self::VotingEnded,
            topic::VOTE_CAST => {
                let words = static_words(&indexed, data);
                Self::VoteCast {
                    voter: abi::decode_address(&words, 0)?,
                    candidate_id: CandidateId::new(abi::decode_uint(&words, 1)?),
                }
            }
            topic::CANDIDATE_ADDED => match indexed.first() {
                Some(id_topic) => Self::CandidateAdded {
                    candidate_id: CandidateId::new(abi::decode_uint(id_topic, 0)?),
                    name: abi::decode_string(data, 0)?,
                },
                None => Self::CandidateAdded {
                    candidate_id: CandidateId::new(abi::decode_uint(data, 0)?),
                    name: abi::decode_string(data, 1)?,
                },
            },
            topic::VOTER_REGISTERED => {
                let words = static_words(&indexed, data);
                Self::VoterRegistered {
                    voter: abi::decode_address(&words, 0)?,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Indexed topics followed by the data words, for events whose parameters
/// are all static.
fn static_words(indexed: &[Vec<u8>], data: &[u8]) -> Vec<u8> {
    let mut words = Vec::with_capacity(indexed.len() * WORD + data.len());
    for t in indexed {
        words.extend_from_slice(t);
    }
    words.extend_from_slice(data);
    words
}
