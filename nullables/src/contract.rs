//! Nullable contract: an in-memory voting contract.
//!
//! Enforces the same rules as the deployed contract and reverts with the
//! same reason strings, so revert classification can be exercised without a
//! chain. Every successful write mines a block and logs its event.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chainvote_contract::{
    ChainProvider, ContractError, ContractEvent, EventBatch, LoggedEvent, TxReceipt,
    VotingContract,
};
use chainvote_types::{Candidate, CandidateId, ChainId, TxHash, VoterAddress, VoterStatus, Wei};

struct State {
    admin: VoterAddress,
    voting_active: bool,
    candidates: Vec<Candidate>,
    voters: HashMap<VoterAddress, VoterStatus>,
    total_votes: u64,
    block: u64,
    events: Vec<LoggedEvent>,
    balances: HashMap<VoterAddress, Wei>,
    chain_id: ChainId,
    fail_next: Option<ContractError>,
    transactions: Vec<(VoterAddress, &'static str)>,
}

pub struct NullContract {
    state: Mutex<State>,
}

fn revert(reason: &str) -> ContractError {
    ContractError::Revert {
        reason: reason.to_string(),
    }
}

impl NullContract {
    pub fn new(admin: VoterAddress) -> Self {
        Self {
            state: Mutex::new(State {
                admin,
                voting_active: false,
                candidates: Vec::new(),
                voters: HashMap::new(),
                total_votes: 0,
                block: 0,
                events: Vec::new(),
                balances: HashMap::new(),
                chain_id: ChainId::SEPOLIA,
                fail_next: None,
                transactions: Vec::new(),
            }),
        }
    }

    /// Seed candidates without going through the admin check.
    pub fn with_candidates(self, names: &[&str]) -> Self {
        {
            let mut s = self.state.lock().unwrap();
            for name in names {
                let id = CandidateId::new(s.candidates.len() as u64);
                s.candidates.push(Candidate {
                    id,
                    name: name.to_string(),
                    vote_count: 0,
                });
            }
        }
        self
    }

    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn set_balance(&self, address: &VoterAddress, balance: Wei) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.clone(), balance);
    }

    pub fn set_voting_active(&self, active: bool) {
        self.state.lock().unwrap().voting_active = active;
    }

    /// Mark an address registered without a transaction.
    pub fn preregister(&self, address: &VoterAddress) {
        self.state
            .lock()
            .unwrap()
            .voters
            .entry(address.clone())
            .or_default()
            .is_registered = true;
    }

    /// Fail the next write call with `err` instead of executing it.
    pub fn fail_next_write(&self, err: ContractError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// Every successful write as `(sender, function name)`.
    pub fn transactions(&self) -> Vec<(VoterAddress, &'static str)> {
        self.state.lock().unwrap().transactions.clone()
    }

    /// Run a write: check the injected failure, apply `f`, mine a block.
    fn transact<F>(
        &self,
        from: &VoterAddress,
        function: &'static str,
        f: F,
    ) -> Result<TxReceipt, ContractError>
    where
        F: FnOnce(&mut State) -> Result<ContractEvent, ContractError>,
    {
        let mut s = self.state.lock().unwrap();
        if let Some(err) = s.fail_next.take() {
            return Err(err);
        }
        let event = f(&mut *s)?;

        s.block += 1;
        let mut hash = [0u8; 32];
        hash[24..].copy_from_slice(&s.block.to_be_bytes());
        let tx_hash = TxHash::new(hash);
        let block_number = s.block;
        s.events.push(LoggedEvent {
            block_number,
            tx_hash: Some(tx_hash),
            event,
        });
        s.transactions.push((from.clone(), function));

        Ok(TxReceipt {
            tx_hash,
            block_number,
            gas_used: 21_000,
        })
    }
}

fn only_admin(s: &State, from: &VoterAddress) -> Result<(), ContractError> {
    if *from != s.admin {
        return Err(revert("Only admin can perform this action"));
    }
    Ok(())
}

#[async_trait]
impl VotingContract for NullContract {
    async fn voting_active(&self) -> Result<bool, ContractError> {
        Ok(self.state.lock().unwrap().voting_active)
    }

    async fn total_candidates(&self) -> Result<u64, ContractError> {
        Ok(self.state.lock().unwrap().candidates.len() as u64)
    }

    async fn total_votes(&self) -> Result<u64, ContractError> {
        Ok(self.state.lock().unwrap().total_votes)
    }

    async fn admin(&self) -> Result<VoterAddress, ContractError> {
        Ok(self.state.lock().unwrap().admin.clone())
    }

    async fn candidate(&self, id: CandidateId) -> Result<Candidate, ContractError> {
        self.state
            .lock()
            .unwrap()
            .candidates
            .get(id.value() as usize)
            .cloned()
            .ok_or_else(|| revert("Invalid candidate"))
    }

    async fn voter(&self, address: &VoterAddress) -> Result<VoterStatus, ContractError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .voters
            .get(address)
            .copied()
            .unwrap_or_default())
    }

    async fn vote(&self, from: &VoterAddress, id: CandidateId) -> Result<TxReceipt, ContractError> {
        self.transact(from, "vote", |s| {
            if !s.voting_active {
                return Err(revert("Voting is not active"));
            }
            let status = s.voters.get(from).copied().unwrap_or_default();
            if !status.is_registered {
                return Err(revert("Voter not registered"));
            }
            if status.has_voted {
                return Err(revert("You have already voted"));
            }
            let candidate = s
                .candidates
                .get_mut(id.value() as usize)
                .ok_or_else(|| revert("Invalid candidate"))?;
            candidate.vote_count += 1;
            s.total_votes += 1;
            s.voters.entry(from.clone()).or_default().has_voted = true;
            Ok(ContractEvent::VoteCast {
                voter: from.clone(),
                candidate_id: id,
            })
        })
    }

    async fn add_candidate(
        &self,
        from: &VoterAddress,
        name: &str,
    ) -> Result<TxReceipt, ContractError> {
        self.transact(from, "addCandidate", |s| {
            only_admin(s, from)?;
            let id = CandidateId::new(s.candidates.len() as u64);
            s.candidates.push(Candidate {
                id,
                name: name.to_string(),
                vote_count: 0,
            });
            Ok(ContractEvent::CandidateAdded {
                candidate_id: id,
                name: name.to_string(),
            })
        })
    }

    async fn register_voter(
        &self,
        from: &VoterAddress,
        voter: &VoterAddress,
    ) -> Result<TxReceipt, ContractError> {
        self.transact(from, "registerVoter", |s| {
            only_admin(s, from)?;
            let entry = s.voters.entry(voter.clone()).or_default();
            if entry.is_registered {
                return Err(revert("Voter already registered"));
            }
            entry.is_registered = true;
            Ok(ContractEvent::VoterRegistered {
                voter: voter.clone(),
            })
        })
    }

    async fn start_voting(&self, from: &VoterAddress) -> Result<TxReceipt, ContractError> {
        self.transact(from, "startVoting", |s| {
            only_admin(s, from)?;
            if s.voting_active {
                return Err(revert("Voting is already active"));
            }
            s.voting_active = true;
            Ok(ContractEvent::VotingStarted)
        })
    }

    async fn end_voting(&self, from: &VoterAddress) -> Result<TxReceipt, ContractError> {
        self.transact(from, "endVoting", |s| {
            only_admin(s, from)?;
            if !s.voting_active {
                return Err(revert("Voting is not active"));
            }
            s.voting_active = false;
            Ok(ContractEvent::VotingEnded)
        })
    }

    async fn events(&self, from_block: u64) -> Result<EventBatch, ContractError> {
        let s = self.state.lock().unwrap();
        let events = s
            .events
            .iter()
            .filter(|e| e.block_number >= from_block)
            .cloned()
            .collect();
        Ok(EventBatch {
            events,
            next_block: (s.block + 1).max(from_block),
        })
    }
}

#[async_trait]
impl ChainProvider for NullContract {
    async fn chain_id(&self) -> Result<ChainId, ContractError> {
        Ok(self.state.lock().unwrap().chain_id)
    }

    async fn balance(&self, address: &VoterAddress) -> Result<Wei, ContractError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(address)
            .copied()
            .unwrap_or(Wei::ZERO))
    }
}
