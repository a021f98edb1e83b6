//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, randomness, storage, the voting
//! contract) are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod contract;
pub mod random;
pub mod store;

pub use clock::NullClock;
pub use contract::NullContract;
pub use random::NullRandom;
pub use store::{NullHiddenCandidateStore, NullOtpStore, NullRegistrationStore};
