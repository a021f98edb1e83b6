//! Wallet session view, recomputed per request.

use std::sync::Arc;

use chainvote_contract::{ChainProvider, VotingContract};
use chainvote_types::{ChainId, VoterAddress, VoterStatus};
use serde::Serialize;

use crate::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub address: VoterAddress,
    /// `0x`-prefixed hex, as wallets report it.
    pub chain_id: String,
    pub network_name: String,
    pub is_correct_network: bool,
    /// Balance in ether, decimal.
    pub balance: String,
    pub is_admin: bool,
    pub voter: VoterStatus,
}

pub struct WalletSessions {
    chain: Arc<dyn ChainProvider>,
    contract: Arc<dyn VotingContract>,
    expected_chain: ChainId,
}

impl WalletSessions {
    pub fn new(
        chain: Arc<dyn ChainProvider>,
        contract: Arc<dyn VotingContract>,
        expected_chain: ChainId,
    ) -> Self {
        Self {
            chain,
            contract,
            expected_chain,
        }
    }

    pub fn expected_chain(&self) -> ChainId {
        self.expected_chain
    }

    pub async fn describe(&self, address: &VoterAddress) -> Result<WalletSession, WorkflowError> {
        let chain_id = self.chain.chain_id().await?;
        let balance = self.chain.balance(address).await?;
        let admin = self.contract.admin().await?;
        let voter = self.contract.voter(address).await?;

        Ok(WalletSession {
            address: address.clone(),
            chain_id: chain_id.to_hex(),
            network_name: chain_id.network_name(),
            is_correct_network: chain_id == self.expected_chain,
            balance: balance.to_ether_string(),
            is_admin: admin == *address,
            voter,
        })
    }
}
