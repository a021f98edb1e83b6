//! WebSocket server for real-time updates.
//!
//! Clients can subscribe to:
//! - Registration request changes (`registration`)
//! - Voting contract events (`contract`)

pub mod server;
pub mod subscriptions;

pub use server::{WebSocketServer, WsState};
pub use subscriptions::{SubscriptionEvent, SubscriptionTopic};

#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("WebSocket server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
