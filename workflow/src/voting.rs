//! Voting control (admin) and vote casting.

use std::sync::Arc;

use chainvote_contract::{RevertKind, TxReceipt, VotingContract};
use chainvote_store::HiddenCandidateStore;
use chainvote_types::{CandidateId, VoterAddress};
use chainvote_verification::OtpService;
use serde::Serialize;

use crate::{ensure_admin, WorkflowError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingToggle {
    pub voting_active: bool,
    pub receipt: TxReceipt,
}

pub struct VotingDesk {
    contract: Arc<dyn VotingContract>,
    otp: Option<Arc<OtpService>>,
    hidden: Option<Arc<dyn HiddenCandidateStore>>,
}

impl VotingDesk {
    pub fn new(contract: Arc<dyn VotingContract>) -> Self {
        Self {
            contract,
            otp: None,
            hidden: None,
        }
    }

    /// Refuse votes for candidates hidden from the ballot.
    pub fn with_hidden_candidates(mut self, hidden: Arc<dyn HiddenCandidateStore>) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Require a verified phone code for every vote.
    pub fn with_otp(mut self, otp: Arc<OtpService>) -> Self {
        self.otp = Some(otp);
        self
    }

    pub fn requires_otp(&self) -> bool {
        self.otp.is_some()
    }

    pub async fn start(&self, actor: &VoterAddress) -> Result<VotingToggle, WorkflowError> {
        ensure_admin(self.contract.as_ref(), actor).await?;
        let receipt = self.contract.start_voting(actor).await?;
        tracing::info!(tx = %receipt.tx_hash, "voting started");
        Ok(VotingToggle {
            voting_active: true,
            receipt,
        })
    }

    pub async fn end(&self, actor: &VoterAddress) -> Result<VotingToggle, WorkflowError> {
        ensure_admin(self.contract.as_ref(), actor).await?;
        let receipt = self.contract.end_voting(actor).await?;
        tracing::info!(tx = %receipt.tx_hash, "voting ended");
        Ok(VotingToggle {
            voting_active: false,
            receipt,
        })
    }

    /// Read `votingActive` and call the opposite.
    pub async fn toggle(&self, actor: &VoterAddress) -> Result<VotingToggle, WorkflowError> {
        if self.contract.voting_active().await? {
            self.end(actor).await
        } else {
            self.start(actor).await
        }
    }

    pub async fn add_candidate(
        &self,
        actor: &VoterAddress,
        name: &str,
    ) -> Result<TxReceipt, WorkflowError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::Validation("candidate name is required".into()));
        }
        ensure_admin(self.contract.as_ref(), actor).await?;
        let receipt = self.contract.add_candidate(actor, name).await?;
        tracing::info!(name, tx = %receipt.tx_hash, "candidate added");
        Ok(receipt)
    }

    /// Cast a vote after checking the voter's on-chain status and, when
    /// configured, a phone verification code.
    #[tracing::instrument(skip(self, otp_code))]
    pub async fn cast_vote(
        &self,
        voter: &VoterAddress,
        candidate: CandidateId,
        otp_code: Option<&str>,
    ) -> Result<TxReceipt, WorkflowError> {
        let status = self.contract.voter(voter).await?;
        if !status.is_registered {
            return Err(WorkflowError::VoteRefused(
                RevertKind::NotRegistered.user_message().into(),
            ));
        }
        if status.has_voted {
            return Err(WorkflowError::VoteRefused(
                RevertKind::AlreadyVoted.user_message().into(),
            ));
        }
        if !self.contract.voting_active().await? {
            return Err(WorkflowError::VoteRefused(
                RevertKind::NotActive.user_message().into(),
            ));
        }
        if let Some(hidden) = &self.hidden {
            if hidden.hidden()?.contains(&candidate) {
                return Err(WorkflowError::VoteRefused(
                    RevertKind::InvalidCandidate.user_message().into(),
                ));
            }
        }

        if let Some(otp) = &self.otp {
            let code = otp_code
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| WorkflowError::Otp("a verification code is required to vote".into()))?;
            otp.verify(voter, code)?;
        }

        let receipt = self.contract.vote(voter, candidate).await?;
        tracing::info!(%voter, %candidate, tx = %receipt.tx_hash, "vote cast");
        Ok(receipt)
    }
}
