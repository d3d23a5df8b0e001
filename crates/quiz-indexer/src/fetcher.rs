use tracing::{debug, warn};

use crate::chain::{LogQuery, QuizChain, RawLog};
use crate::error::{ChainError, IndexerResult};

/// `getLogs` with a fallback to bounded windows for providers that reject
/// wide ranges.
pub struct LogFetcher<'a, C: QuizChain + ?Sized> {
    chain: &'a C,
    window: u64,
}

impl<'a, C: QuizChain + ?Sized> LogFetcher<'a, C> {
    pub fn new(chain: &'a C, window: u64) -> Self {
        Self {
            chain,
            window: window.max(1),
        }
    }

    /// First block worth scanning: the later of `start_block` and the
    /// lookback horizon behind the head. A zero lookback disables the horizon.
    pub async fn resolve_from_block(&self, lookback: u64, start_block: u64) -> IndexerResult<u64> {
        if lookback == 0 {
            return Ok(start_block);
        }
        let latest = self.chain.block_number().await?;
        Ok(horizon_start(latest, lookback).max(start_block))
    }

    /// All logs matching `query` up to `query.to_block` (or the head).
    pub async fn fetch(&self, query: &LogQuery) -> IndexerResult<Vec<RawLog>> {
        match self.chain.get_logs(query).await {
            Ok(logs) => Ok(logs),
            Err(ChainError::RangeTooLarge(reason)) => {
                let to = match query.to_block {
                    Some(to) => to,
                    None => self.chain.block_number().await?,
                };
                debug!(%reason, from = query.from_block, to, "range rejected, chunking");
                self.fetch_chunked(query, query.from_block, to).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Sequential windows over `[from, to]` with no gaps or overlaps.
    /// A window the provider still rejects is retried at half the width.
    pub async fn fetch_chunked(
        &self,
        query: &LogQuery,
        from: u64,
        to: u64,
    ) -> IndexerResult<Vec<RawLog>> {
        let mut logs = Vec::new();
        let mut window = self.window;
        let mut start = from;

        while start <= to {
            let end = start.saturating_add(window - 1).min(to);
            match self.chain.get_logs(&query.window(start, end)).await {
                Ok(batch) => {
                    debug!(start, end, count = batch.len(), "log window");
                    logs.extend(batch);
                    match end.checked_add(1) {
                        Some(next) => start = next,
                        None => break,
                    }
                }
                Err(ChainError::RangeTooLarge(reason)) if window > 1 => {
                    window = (window / 2).max(1);
                    warn!(%reason, window, "window still too wide, shrinking");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(logs)
    }
}

/// `head - lookback + 1`, clamped at genesis.
pub fn horizon_start(head: u64, lookback: u64) -> u64 {
    if head >= lookback {
        head - lookback + 1
    } else {
        0
    }
}
