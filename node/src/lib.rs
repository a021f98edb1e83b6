//! chainvote node: wires storage, the contract client, workflows and the
//! HTTP/WebSocket servers into one process.
//!
//! - [`NodeConfig`] loads settings from TOML.
//! - [`ChainvoteNode`] owns every service and the background tasks.
//! - [`EventPoller`] follows contract logs and republishes them.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use events::{EventPoller, EVENT_CURSOR_KEY};
pub use logging::{init_logging, LogFormat};
pub use node::ChainvoteNode;
pub use shutdown::ShutdownController;
