//! Election overview, ballot and results views.
//!
//! Candidates cannot be removed from the contract, so the service keeps a
//! set of hidden ids. Hidden candidates are left out of the ballot and the
//! results list; they still count towards `totalCandidates`, and their votes
//! still count towards the contract's `totalVotes`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chainvote_contract::VotingContract;
use chainvote_store::HiddenCandidateStore;
use chainvote_types::{Candidate, CandidateId, VoterAddress};
use serde::Serialize;

use crate::{ensure_admin, WorkflowError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionInfo {
    pub voting_active: bool,
    pub total_candidates: u64,
    pub visible_candidates: u64,
    pub total_votes: u64,
    pub admin: VoterAddress,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
    /// Share of the visible vote total, one decimal place.
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub voting_active: bool,
    pub candidates: Vec<CandidateResult>,
    /// Sum of the visible candidates' votes.
    pub visible_votes: u64,
    /// The contract's `totalVotes`, hidden candidates included.
    pub total_votes: u64,
    pub hidden_candidates: u64,
}

pub struct Ballot {
    contract: Arc<dyn VotingContract>,
    hidden: Arc<dyn HiddenCandidateStore>,
}

fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 1000.0 / total as f64).round() / 10.0
}

impl Ballot {
    pub fn new(contract: Arc<dyn VotingContract>, hidden: Arc<dyn HiddenCandidateStore>) -> Self {
        Self { contract, hidden }
    }

    fn visible(&self, all: Vec<Candidate>) -> Result<Vec<Candidate>, WorkflowError> {
        let hidden = self.hidden.hidden()?;
        Ok(all.into_iter().filter(|c| !hidden.contains(&c.id)).collect())
    }

    pub async fn election(&self) -> Result<ElectionInfo, WorkflowError> {
        let total_candidates = self.contract.total_candidates().await?;
        let hidden = self.hidden.hidden()?;
        let hidden_in_range = hidden
            .iter()
            .filter(|id| id.value() < total_candidates)
            .count() as u64;
        Ok(ElectionInfo {
            voting_active: self.contract.voting_active().await?,
            total_candidates,
            visible_candidates: total_candidates - hidden_in_range,
            total_votes: self.contract.total_votes().await?,
            admin: self.contract.admin().await?,
        })
    }

    /// Candidates shown on the ballot, in id order.
    pub async fn candidates(&self) -> Result<Vec<Candidate>, WorkflowError> {
        let all = self.contract.candidates().await?;
        self.visible(all)
    }

    pub async fn results(&self) -> Result<ResultsView, WorkflowError> {
        let all = self.contract.candidates().await?;
        let total_listed = all.len() as u64;
        let visible = self.visible(all)?;
        let visible_votes: u64 = visible.iter().map(|c| c.vote_count).sum();

        let candidates = visible
            .into_iter()
            .map(|c| CandidateResult {
                percentage: percentage(c.vote_count, visible_votes),
                id: c.id,
                name: c.name,
                vote_count: c.vote_count,
            })
            .collect::<Vec<_>>();

        Ok(ResultsView {
            voting_active: self.contract.voting_active().await?,
            hidden_candidates: total_listed - candidates.len() as u64,
            candidates,
            visible_votes,
            total_votes: self.contract.total_votes().await?,
        })
    }

    pub fn hidden(&self) -> Result<BTreeSet<CandidateId>, WorkflowError> {
        Ok(self.hidden.hidden()?)
    }

    /// Hide a candidate from ballot and results. Returns `false` if it was
    /// already hidden.
    pub async fn hide(&self, actor: &VoterAddress, id: CandidateId) -> Result<bool, WorkflowError> {
        ensure_admin(self.contract.as_ref(), actor).await?;
        let total = self.contract.total_candidates().await?;
        if id.value() >= total {
            return Err(WorkflowError::NotFound(format!("candidate {id}")));
        }
        let changed = self.hidden.hide(id)?;
        tracing::info!(%id, changed, "candidate hidden");
        Ok(changed)
    }

    pub async fn unhide(
        &self,
        actor: &VoterAddress,
        id: CandidateId,
    ) -> Result<bool, WorkflowError> {
        ensure_admin(self.contract.as_ref(), actor).await?;
        let changed = self.hidden.unhide(id)?;
        tracing::info!(%id, changed, "candidate restored");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainvote_nullables::{NullContract, NullHiddenCandidateStore};

    fn admin() -> VoterAddress {
        VoterAddress::parse("0x1194cd63491865d684a4619b785129230f018730").unwrap()
    }

    fn voter(n: u8) -> VoterAddress {
        let mut b = [0u8; 20];
        b[19] = n;
        VoterAddress::from_bytes(b)
    }

    async fn ballot_with_votes() -> (Arc<NullContract>, Ballot) {
        let contract = Arc::new(NullContract::new(admin()).with_candidates(&["A", "B", "C"]));
        contract.start_voting(&admin()).await.unwrap();
        for (n, choice) in [(1u8, 0u64), (2, 1), (3, 1), (4, 2)] {
            contract.register_voter(&admin(), &voter(n)).await.unwrap();
            contract
                .vote(&voter(n), CandidateId::new(choice))
                .await
                .unwrap();
        }
        let ballot = Ballot::new(contract.clone(), Arc::new(NullHiddenCandidateStore::new()));
        (contract, ballot)
    }

    #[tokio::test]
    async fn hidden_candidates_are_excluded_but_still_counted() {
        let (contract, ballot) = ballot_with_votes().await;
        assert!(ballot.hide(&admin(), CandidateId::new(2)).await.unwrap());

        let shown: Vec<_> = ballot
            .candidates()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.value())
            .collect();
        assert_eq!(shown, vec![0, 1]);

        let results = ballot.results().await.unwrap();
        assert_eq!(results.candidates.len(), 2);
        assert_eq!(results.hidden_candidates, 1);
        assert_eq!(results.visible_votes, 3);
        assert_eq!(results.total_votes, 4);
        assert_eq!(results.candidates[1].percentage, 66.7);

        assert_eq!(contract.total_candidates().await.unwrap(), 3);
        let info = ballot.election().await.unwrap();
        assert_eq!(info.total_candidates, 3);
        assert_eq!(info.visible_candidates, 2);
    }

    #[tokio::test]
    async fn hide_requires_admin_and_existing_candidate() {
        let (_contract, ballot) = ballot_with_votes().await;
        assert!(matches!(
            ballot.hide(&voter(1), CandidateId::new(0)).await,
            Err(WorkflowError::NotAdmin(_))
        ));
        assert!(matches!(
            ballot.hide(&admin(), CandidateId::new(7)).await,
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unhide_restores() {
        let (_contract, ballot) = ballot_with_votes().await;
        ballot.hide(&admin(), CandidateId::new(0)).await.unwrap();
        assert!(ballot.unhide(&admin(), CandidateId::new(0)).await.unwrap());
        assert!(!ballot.unhide(&admin(), CandidateId::new(0)).await.unwrap());
        assert_eq!(ballot.candidates().await.unwrap().len(), 3);
    }

    #[test]
    fn percentage_rounding() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(3, 3), 100.0);
    }
}
