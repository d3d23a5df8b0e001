use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::{LogQuery, QuizChain};
use crate::config::QuizConfig;
use crate::decoder::{decode_logs, sort_chain_order, DecodedLog, ALL_EVENT_SIGNATURES};
use crate::error::IndexerResult;
use crate::fetcher::LogFetcher;

const CHANNEL_CAPACITY: usize = 256;

/// Polls the contract for new logs and streams them, decoded, to a
/// `Subscription`.
pub struct EventWatcher {
    chain: Arc<dyn QuizChain>,
    contract: Address,
    window: u64,
    poll_interval: Duration,
}

impl EventWatcher {
    /// Start polling at `from_block`. The task runs until the returned
    /// handle is dropped or unsubscribed.
    pub fn subscribe(chain: Arc<dyn QuizChain>, config: &QuizConfig, from_block: u64) -> Subscription {
        let watcher = Self {
            chain,
            contract: config.contract_address,
            window: config.log_window,
            poll_interval: config.poll_interval,
        };
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(watcher.run(from_block, tx));
        Subscription { rx, handle }
    }

    async fn run(self, from_block: u64, tx: mpsc::Sender<DecodedLog>) {
        info!(contract = %self.contract, from_block, "event watcher started");
        let mut next = from_block;
        let mut ticker = tokio::time::interval(self.poll_interval.max(Duration::from_millis(1)));

        loop {
            ticker.tick().await;
            let head = match self.chain.block_number().await {
                Ok(head) => head,
                Err(err) => {
                    warn!(%err, "watcher could not read head");
                    continue;
                }
            };
            if head < next {
                continue;
            }

            let logs = match self.poll(next, head).await {
                Ok(logs) => logs,
                Err(err) => {
                    // Same range again on the next tick.
                    warn!(%err, from = next, to = head, "watcher poll failed");
                    continue;
                }
            };
            debug!(from = next, to = head, count = logs.len(), "watcher poll");
            for log in logs {
                if tx.send(log).await.is_err() {
                    debug!("subscriber gone, stopping watcher");
                    return;
                }
            }
            next = head.saturating_add(1);
        }
    }

    async fn poll(&self, from: u64, to: u64) -> IndexerResult<Vec<DecodedLog>> {
        let fetcher = LogFetcher::new(self.chain.as_ref(), self.window);
        let mut raw = Vec::new();
        for signature in ALL_EVENT_SIGNATURES {
            let query = LogQuery::new(self.contract, signature).window(from, to);
            raw.extend(fetcher.fetch(&query).await?);
        }
        let mut decoded = decode_logs(&raw);
        sort_chain_order(&mut decoded);
        Ok(decoded)
    }
}

/// Receiving end of an `EventWatcher`. Dropping it stops the polling task.
pub struct Subscription {
    rx: mpsc::Receiver<DecodedLog>,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<DecodedLog> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<DecodedLog> {
        self.rx.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
