//! Polling fallback for block notifications.
//!
//! Not started unless `POLL_FALLBACK_ENABLED` is set; the WebSocket listener
//! is the primary source.

use crate::notice::{self, BlockContext};
use crate::notifier::Notifier;
use crate::observer::ObserverClient;
use crate::types::PoolInfo;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// First observation, nothing announced
    Initialized(u64),
    NewBlock { previous: u64, current: u64 },
    Unchanged(u64),
    /// Tip went backwards (reorg or API issue); marker reset without announcing
    Regressed { previous: u64, current: u64 },
    MissingData,
}

/// Detects new sidechain tips by comparing heights between polls
pub struct BlockPoller<N> {
    api: ObserverClient,
    notifier: N,
    interval: Duration,
    last_known_height: Option<u64>,
    warned_missing_data: bool,
}

impl<N: Notifier> BlockPoller<N> {
    pub fn new(api: ObserverClient, notifier: N, interval: Duration) -> Self {
        Self {
            api,
            notifier,
            interval,
            last_known_height: None,
            warned_missing_data: false,
        }
    }

    pub fn last_known_height(&self) -> Option<u64> {
        self.last_known_height
    }

    /// Compare the current tip with the last known height and update it
    pub fn observe(&mut self, pool: &PoolInfo) -> PollOutcome {
        let Some(current) = pool.last_block().and_then(|b| b.side_height) else {
            return PollOutcome::MissingData;
        };

        let outcome = match self.last_known_height {
            None => PollOutcome::Initialized(current),
            Some(previous) if current > previous => PollOutcome::NewBlock { previous, current },
            Some(previous) if current < previous => PollOutcome::Regressed { previous, current },
            Some(previous) => PollOutcome::Unchanged(previous),
        };
        self.last_known_height = Some(current);
        outcome
    }

    /// One poll: fetch, compare, announce when the tip advanced
    pub async fn tick(&mut self) -> Result<PollOutcome> {
        let pool = self.api.pool_info().await?;
        let outcome = self.observe(&pool);

        match outcome {
            PollOutcome::Initialized(height) => {
                tracing::info!(height, "Polling: initialized last known block height");
            }
            PollOutcome::NewBlock { previous, current } => {
                tracing::info!(previous, current, "Polling: new block detected");
                let notice = notice::latest_block(&pool, BlockContext::Notification);
                if let Err(e) = self.notifier.notify(notice).await {
                    tracing::error!(error = %e, "Polling: failed to send notification");
                }
            }
            PollOutcome::Regressed { previous, current } => {
                tracing::warn!(
                    previous,
                    current,
                    "Polling: block height went backwards, possible reorg or API issue"
                );
            }
            PollOutcome::MissingData => {
                if !self.warned_missing_data {
                    tracing::warn!("Polling: pool_info response has no sidechain tip height");
                    self.warned_missing_data = true;
                }
            }
            PollOutcome::Unchanged(_) => {}
        }

        Ok(outcome)
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Polling: started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "Polling: error fetching pool info");
            }
        }

        tracing::info!("Polling: stopped");
    }
}
