//! HTTP API for the chainvote service.
//!
//! Provides endpoints for:
//! - Voter registration requests and their status
//! - Simulated biometric capture and identity checks
//! - Phone verification codes
//! - Wallet session, election, ballot and results views
//! - Vote casting
//! - Admin actions (approvals, voting control, candidates)
//! - Prometheus metrics
//!
//! JSON field names are camelCase. Errors are `{ "error": message }`.

pub mod admin;
pub mod election;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod params;
pub mod server;

pub use error::RpcError;
pub use metrics::ApiMetrics;
pub use server::{router, ApiState, CaptureSettings, RpcServer};
