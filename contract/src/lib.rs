//! Client binding for the on-chain voting contract.
//!
//! The contract is the authority for voting state: admin identity, candidate
//! list, tallies and per-address voter flags. This crate only encodes calls,
//! sends them and decodes the answers; it performs no validation of its own
//! beyond classifying revert reasons into user-facing messages.
//!
//! - [`VotingContract`] and [`ChainProvider`] are the seams the rest of the
//!   workspace depends on.
//! - [`RpcVotingContract`] and [`JsonRpcClient`] implement them over Ethereum
//!   JSON-RPC.

pub mod abi;
pub mod client;
pub mod error;
pub mod events;
pub mod rpc;

pub use client::{ChainProvider, EventBatch, LoggedEvent, TxReceipt, VotingContract};
pub use error::{ContractError, RevertKind};
pub use events::ContractEvent;
pub use rpc::{JsonRpcClient, ReceiptPolling, RpcVotingContract, DEFAULT_LOG_WINDOW};
