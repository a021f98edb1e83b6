//! Contract and chain seams.

use async_trait::async_trait;
use chainvote_types::{Candidate, CandidateId, ChainId, TxHash, VoterAddress, VoterStatus, Wei};
use serde::{Deserialize, Serialize};

use crate::{ContractError, ContractEvent};

/// Outcome of a mined, successful transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    pub block_number: u64,
    pub tx_hash: Option<TxHash>,
    #[serde(flatten)]
    pub event: ContractEvent,
}

/// Events found in a block range and the block to resume from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventBatch {
    pub events: Vec<LoggedEvent>,
    pub next_block: u64,
}

/// The on-chain voting contract.
///
/// Each method is one contract call. Writes take the sending address; the
/// contract decides whether that sender is allowed to perform the action.
#[async_trait]
pub trait VotingContract: Send + Sync {
    async fn voting_active(&self) -> Result<bool, ContractError>;
    async fn total_candidates(&self) -> Result<u64, ContractError>;
    async fn total_votes(&self) -> Result<u64, ContractError>;
    async fn admin(&self) -> Result<VoterAddress, ContractError>;
    async fn candidate(&self, id: CandidateId) -> Result<Candidate, ContractError>;
    async fn voter(&self, address: &VoterAddress) -> Result<VoterStatus, ContractError>;

    async fn vote(&self, from: &VoterAddress, id: CandidateId) -> Result<TxReceipt, ContractError>;
    async fn add_candidate(&self, from: &VoterAddress, name: &str)
        -> Result<TxReceipt, ContractError>;
    async fn register_voter(
        &self,
        from: &VoterAddress,
        voter: &VoterAddress,
    ) -> Result<TxReceipt, ContractError>;
    async fn start_voting(&self, from: &VoterAddress) -> Result<TxReceipt, ContractError>;
    async fn end_voting(&self, from: &VoterAddress) -> Result<TxReceipt, ContractError>;

    /// Contract events from `from_block` onwards. An implementation may stop
    /// short of the head; callers resume from `next_block`.
    async fn events(&self, from_block: u64) -> Result<EventBatch, ContractError>;

    /// All candidates in id order, read one by one.
    async fn candidates(&self) -> Result<Vec<Candidate>, ContractError> {
        let total = self.total_candidates().await?;
        let mut out = Vec::with_capacity(total as usize);
        for i in 0..total {
            out.push(self.candidate(CandidateId::new(i)).await?);
        }
        Ok(out)
    }
}

/// Chain-level queries used to describe a wallet session.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn chain_id(&self) -> Result<ChainId, ContractError>;
    async fn balance(&self, address: &VoterAddress) -> Result<Wei, ContractError>;
}
