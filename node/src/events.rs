//! Contract event polling.
//!
//! The poller reads contract logs from a persisted block cursor, publishes
//! every decoded event on a broadcast channel and advances the cursor. A
//! restarted node resumes where it stopped instead of replaying history.

use std::sync::Arc;
use std::time::Duration;

use chainvote_contract::{LoggedEvent, VotingContract};
use chainvote_store::MetaStore;
use tokio::sync::broadcast;
use tracing::{debug, warn, Instrument};

use crate::tracing_spans::event_poll_span;
use crate::NodeError;

/// Meta key holding the next block to scan, as a little-endian `u64`.
pub const EVENT_CURSOR_KEY: &str = "event_cursor";

pub struct EventPoller {
    contract: Arc<dyn VotingContract>,
    meta: Arc<dyn MetaStore>,
    start_block: u64,
    events: broadcast::Sender<LoggedEvent>,
}

impl EventPoller {
    pub fn new(
        contract: Arc<dyn VotingContract>,
        meta: Arc<dyn MetaStore>,
        start_block: u64,
        events: broadcast::Sender<LoggedEvent>,
    ) -> Self {
        Self {
            contract,
            meta,
            start_block,
            events,
        }
    }

    /// Block the next poll starts from.
    pub fn cursor(&self) -> Result<u64, NodeError> {
        let stored = self.meta.get_u64(EVENT_CURSOR_KEY)?;
        Ok(stored.map_or(self.start_block, |block| block.max(self.start_block)))
    }

    /// Fetch and publish new events. Returns how many were found.
    pub async fn poll_once(&self) -> Result<usize, NodeError> {
        let from = self.cursor()?;
        let batch = self
            .contract
            .events(from)
            .instrument(event_poll_span(from))
            .await?;

        for event in &batch.events {
            debug!(block = event.block_number, event = event.event.name(), "contract event");
            // No subscribers is not an error.
            let _ = self.events.send(event.clone());
        }
        if batch.next_block > from {
            self.meta.put_u64(EVENT_CURSOR_KEY, batch.next_block)?;
        }
        Ok(batch.events.len())
    }

    /// Poll every `interval` until `shutdown` fires. Failed polls are logged
    /// and retried on the next tick.
    pub async fn run(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "contract event poll failed");
                    }
                }
            }
        }
        debug!("event poller stopped");
    }
}
