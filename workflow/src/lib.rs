//! Service workflows on top of the stores and the contract client.
//!
//! The registry owns the off-chain registration lifecycle; the admin
//! workflow bridges it to the contract (`registerVoter`). Ballot, voting and
//! session views read contract state and apply the service's own display
//! rules (hidden candidates, friendly pre-checks).
//!
//! Nothing here holds a lock across a contract call. Uniqueness of
//! registrations is arbitrated by the store.

pub mod admin;
pub mod ballot;
pub mod error;
pub mod identity;
pub mod registry;
pub mod session;
pub mod voting;

pub use admin::{ensure_admin, AdminWorkflow, DecisionOutcome, OutcomeKind};
pub use ballot::{Ballot, CandidateResult, ElectionInfo, ResultsView};
pub use error::WorkflowError;
pub use identity::IdentityCheck;
pub use registry::{RegistrationEvent, VerificationData, VoterRegistry};
pub use session::{WalletSession, WalletSessions};
pub use voting::{VotingDesk, VotingToggle};
