//! Admin decisions on registration requests.
//!
//! Approval is two steps: `registerVoter` on the contract, then the record is
//! marked approved. The two are not atomic. When the contract call succeeds
//! and the status write fails the voter is registered on chain but the
//! request still reads `pending`; that outcome is reported, not repaired.

use std::sync::Arc;

use chainvote_contract::VotingContract;
use chainvote_store::VoterRegistration;
use chainvote_types::{RegistrationStatus, TxHash, VoterAddress};
use serde::Serialize;

use crate::{VoterRegistry, WorkflowError};

/// Fail unless `actor` is the contract's admin (case-insensitive).
pub async fn ensure_admin(
    contract: &dyn VotingContract,
    actor: &VoterAddress,
) -> Result<(), WorkflowError> {
    let admin = contract.admin().await?;
    if admin != *actor {
        tracing::warn!(%actor, "admin action refused");
        return Err(WorkflowError::NotAdmin(actor.clone()));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeKind {
    Approved,
    Rejected,
    /// The record already had the requested status; nothing was sent.
    Unchanged,
    /// `registerVoter` succeeded but the status write failed.
    RegisteredOnChainOnly,
    Failed,
}

/// Result of one address in a batch decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub address: VoterAddress,
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecisionOutcome {
    fn new(address: &VoterAddress, outcome: OutcomeKind) -> Self {
        Self {
            address: address.clone(),
            outcome,
            tx_hash: None,
            error: None,
        }
    }

    fn failed(address: &VoterAddress, err: &WorkflowError) -> Self {
        Self {
            error: Some(err.user_message()),
            ..Self::new(address, OutcomeKind::Failed)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            OutcomeKind::Approved | OutcomeKind::Rejected | OutcomeKind::Unchanged
        )
    }
}

pub struct AdminWorkflow {
    registry: Arc<VoterRegistry>,
    contract: Arc<dyn VotingContract>,
}

impl AdminWorkflow {
    pub fn new(registry: Arc<VoterRegistry>, contract: Arc<dyn VotingContract>) -> Self {
        Self { registry, contract }
    }

    /// Approve each address independently: register it on chain, then mark
    /// the request approved.
    #[tracing::instrument(skip(self, addresses), fields(count = addresses.len()))]
    pub async fn approve(
        &self,
        actor: &VoterAddress,
        addresses: &[VoterAddress],
    ) -> Result<Vec<DecisionOutcome>, WorkflowError> {
        ensure_admin(self.contract.as_ref(), actor).await?;

        let mut outcomes = Vec::with_capacity(addresses.len());
        for address in addresses {
            outcomes.push(self.approve_one(actor, address).await);
        }
        Ok(outcomes)
    }

    async fn approve_one(&self, actor: &VoterAddress, address: &VoterAddress) -> DecisionOutcome {
        match self.needs_approval(address) {
            Ok(true) => {}
            Ok(false) => return DecisionOutcome::new(address, OutcomeKind::Unchanged),
            Err(err) => return DecisionOutcome::failed(address, &err),
        }

        let receipt = match self.contract.register_voter(actor, address).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(%address, error = %e, "registerVoter failed");
                return DecisionOutcome::failed(address, &WorkflowError::Contract(e));
            }
        };

        match self.registry.decide(address, RegistrationStatus::Approved) {
            Ok(_) => {
                tracing::info!(%address, tx = %receipt.tx_hash, "voter approved");
                DecisionOutcome {
                    tx_hash: Some(receipt.tx_hash),
                    ..DecisionOutcome::new(address, OutcomeKind::Approved)
                }
            }
            Err(e) => {
                tracing::error!(
                    %address,
                    tx = %receipt.tx_hash,
                    error = %e,
                    "voter registered on chain but approval was not recorded"
                );
                DecisionOutcome {
                    tx_hash: Some(receipt.tx_hash),
                    error: Some(e.to_string()),
                    ..DecisionOutcome::new(address, OutcomeKind::RegisteredOnChainOnly)
                }
            }
        }
    }

    /// `true` for a pending request, `false` for one already approved.
    fn needs_approval(&self, address: &VoterAddress) -> Result<bool, WorkflowError> {
        let record = self
            .registry
            .get(address)?
            .ok_or_else(|| WorkflowError::NotFound(address.to_string()))?;
        match record.status {
            RegistrationStatus::Pending => Ok(true),
            RegistrationStatus::Approved => Ok(false),
            from @ RegistrationStatus::Rejected => Err(WorkflowError::InvalidTransition {
                from,
                to: RegistrationStatus::Approved,
            }),
        }
    }

    /// Move a single request to `status` as `actor`.
    ///
    /// Approval registers the voter on chain first, exactly as a batch
    /// approval does. Every other target must be a valid lifecycle move.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        actor: &VoterAddress,
        address: &VoterAddress,
        status: RegistrationStatus,
    ) -> Result<VoterRegistration, WorkflowError> {
        ensure_admin(self.contract.as_ref(), actor).await?;
        if status != RegistrationStatus::Approved {
            return self.registry.decide(address, status);
        }

        if self.needs_approval(address)? {
            let receipt = self.contract.register_voter(actor, address).await?;
            return self.registry.decide(address, status).map_err(|e| {
                tracing::error!(
                    %address,
                    tx = %receipt.tx_hash,
                    error = %e,
                    "voter registered on chain but approval was not recorded"
                );
                e
            });
        }
        self.registry.decide(address, status)
    }

    /// Reject each address independently. No contract call is made.
    #[tracing::instrument(skip(self, addresses), fields(count = addresses.len()))]
    pub async fn reject(
        &self,
        actor: &VoterAddress,
        addresses: &[VoterAddress],
    ) -> Result<Vec<DecisionOutcome>, WorkflowError> {
        ensure_admin(self.contract.as_ref(), actor).await?;

        let outcomes = addresses
            .iter()
            .map(|address| {
                let before = self.registry.get(address).ok().flatten().map(|r| r.status);
                match self.registry.decide(address, RegistrationStatus::Rejected) {
                    Ok(_) if before == Some(RegistrationStatus::Rejected) => {
                        DecisionOutcome::new(address, OutcomeKind::Unchanged)
                    }
                    Ok(_) => {
                        tracing::info!(%address, "voter rejected");
                        DecisionOutcome::new(address, OutcomeKind::Rejected)
                    }
                    Err(e) => DecisionOutcome::failed(address, &e),
                }
            })
            .collect();
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainvote_contract::ContractError;
    use chainvote_nullables::{NullClock, NullContract, NullRegistrationStore};
    use chainvote_store::{RegistrationStore, RegistrationSubmission};
    use chainvote_types::Timestamp;

    fn admin() -> VoterAddress {
        VoterAddress::parse("0x1194CD63491865d684A4619b785129230F018730").unwrap()
    }

    fn addr(n: u8) -> VoterAddress {
        let mut b = [0u8; 20];
        b[19] = n;
        VoterAddress::from_bytes(b)
    }

    struct Fixture {
        store: Arc<NullRegistrationStore>,
        contract: Arc<NullContract>,
        workflow: AdminWorkflow,
    }

    fn fixture(pending: &[u8]) -> Fixture {
        let store = Arc::new(NullRegistrationStore::new());
        for n in pending {
            store
                .submit(
                    RegistrationSubmission {
                        address: addr(*n),
                        face_data: "0xface".into(),
                        fingerprint_data: "0xf1".into(),
                        national_id: "123456789012".into(),
                        phone_number: "9876543210".into(),
                    },
                    Timestamp::new(u64::from(*n)),
                )
                .unwrap();
        }
        let contract = Arc::new(NullContract::new(admin()));
        let registry = Arc::new(VoterRegistry::new(store.clone(), Arc::new(NullClock::new(100))));
        let workflow = AdminWorkflow::new(registry, contract.clone());
        Fixture {
            store,
            contract,
            workflow,
        }
    }

    #[tokio::test]
    async fn non_admin_is_refused_before_any_call() {
        let f = fixture(&[1]);
        let err = f.workflow.approve(&addr(1), &[addr(1)]).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotAdmin(_)));
        assert!(f.contract.transactions().is_empty());
    }

    #[tokio::test]
    async fn approve_registers_then_marks_approved() {
        let f = fixture(&[1, 2]);
        let outcomes = f.workflow.approve(&admin(), &[addr(1), addr(2)]).await.unwrap();

        assert!(outcomes.iter().all(|o| o.outcome == OutcomeKind::Approved));
        assert!(outcomes.iter().all(|o| o.tx_hash.is_some()));
        for n in [1, 2] {
            assert!(f.contract.voter(&addr(n)).await.unwrap().is_registered);
            assert_eq!(
                f.store.get(&addr(n)).unwrap().unwrap().status,
                RegistrationStatus::Approved
            );
        }
    }

    #[tokio::test]
    async fn batch_outcomes_are_independent() {
        let f = fixture(&[1, 2]);
        f.contract
            .fail_next_write(ContractError::Transport("connection reset".into()));

        let outcomes = f
            .workflow
            .approve(&admin(), &[addr(1), addr(2), addr(3)])
            .await
            .unwrap();

        assert_eq!(outcomes[0].outcome, OutcomeKind::Failed);
        assert_eq!(outcomes[1].outcome, OutcomeKind::Approved);
        assert_eq!(outcomes[2].outcome, OutcomeKind::Failed);
        assert_eq!(
            f.store.get(&addr(1)).unwrap().unwrap().status,
            RegistrationStatus::Pending
        );
    }

    #[tokio::test]
    async fn status_write_failure_is_reported() {
        let f = fixture(&[1]);
        f.store.fail_status_writes(true);

        let outcomes = f.workflow.approve(&admin(), &[addr(1)]).await.unwrap();
        assert_eq!(outcomes[0].outcome, OutcomeKind::RegisteredOnChainOnly);
        assert!(outcomes[0].error.is_some());
        assert!(f.contract.voter(&addr(1)).await.unwrap().is_registered);
    }

    #[tokio::test]
    async fn approved_is_unchanged_and_rejected_cannot_be_approved() {
        let f = fixture(&[1, 2]);
        f.workflow.approve(&admin(), &[addr(1)]).await.unwrap();
        f.workflow.reject(&admin(), &[addr(2)]).await.unwrap();

        let outcomes = f.workflow.approve(&admin(), &[addr(1), addr(2)]).await.unwrap();
        assert_eq!(outcomes[0].outcome, OutcomeKind::Unchanged);
        assert_eq!(outcomes[1].outcome, OutcomeKind::Failed);
        // only the first approval reached the chain
        assert_eq!(f.contract.transactions().len(), 1);
    }

    #[tokio::test]
    async fn single_status_change_is_admin_only() {
        let f = fixture(&[1]);
        let err = f
            .workflow
            .set_status(&addr(1), &addr(1), RegistrationStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotAdmin(_)));
        assert!(f.contract.transactions().is_empty());
        assert_eq!(
            f.store.get(&addr(1)).unwrap().unwrap().status,
            RegistrationStatus::Pending
        );
    }

    #[tokio::test]
    async fn single_approval_registers_on_chain() {
        let f = fixture(&[1]);
        let record = f
            .workflow
            .set_status(&admin(), &addr(1), RegistrationStatus::Approved)
            .await
            .unwrap();
        assert_eq!(record.status, RegistrationStatus::Approved);
        assert!(f.contract.voter(&addr(1)).await.unwrap().is_registered);

        // already approved: no second transaction
        f.workflow
            .set_status(&admin(), &addr(1), RegistrationStatus::Approved)
            .await
            .unwrap();
        assert_eq!(f.contract.transactions().len(), 1);

        for target in [RegistrationStatus::Pending, RegistrationStatus::Rejected] {
            let err = f
                .workflow
                .set_status(&admin(), &addr(1), target)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        }
    }

    #[tokio::test]
    async fn rejected_request_cannot_be_approved_singly() {
        let f = fixture(&[1]);
        f.workflow
            .set_status(&admin(), &addr(1), RegistrationStatus::Rejected)
            .await
            .unwrap();
        let err = f
            .workflow
            .set_status(&admin(), &addr(1), RegistrationStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert!(f.contract.transactions().is_empty());
    }

    #[tokio::test]
    async fn reject_outcomes() {
        let f = fixture(&[1, 2]);
        f.workflow.approve(&admin(), &[addr(2)]).await.unwrap();

        let outcomes = f
            .workflow
            .reject(&admin(), &[addr(1), addr(1), addr(2), addr(9)])
            .await
            .unwrap();
        assert_eq!(outcomes[0].outcome, OutcomeKind::Rejected);
        assert_eq!(outcomes[1].outcome, OutcomeKind::Unchanged);
        assert_eq!(outcomes[2].outcome, OutcomeKind::Failed);
        assert_eq!(outcomes[3].outcome, OutcomeKind::Failed);
    }
}
