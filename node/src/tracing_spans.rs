//! Span constructors for node background work.
//!
//! Consistent span names make it easy to filter logs for one subsystem.

use tracing::{info_span, Span};

/// One pass of the contract event poller.
pub fn event_poll_span(from_block: u64) -> Span {
    info_span!("event_poll", from_block)
}

/// A read-only contract or chain query made by the node itself.
pub fn contract_call_span(method: &str) -> Span {
    info_span!("contract_call", method = %method)
}

/// A long-running node task such as a server or a bridge.
pub fn node_task_span(task: &str) -> Span {
    info_span!("node_task", task = %task)
}
