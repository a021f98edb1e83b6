//! Fundamental types for the chainvote voting service.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! wallet addresses, transaction hashes, wei amounts, chain ids, timestamps,
//! candidates and the registration status enum.

pub mod address;
pub mod amount;
pub mod candidate;
pub mod error;
pub mod hash;
pub mod network;
pub mod state;
pub mod time;

pub use address::VoterAddress;
pub use amount::Wei;
pub use candidate::{Candidate, CandidateId, VoterStatus};
pub use error::TypesError;
pub use hash::TxHash;
pub use network::ChainId;
pub use state::RegistrationStatus;
pub use time::{Clock, SystemClock, Timestamp};
