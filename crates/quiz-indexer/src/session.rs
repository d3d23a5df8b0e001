use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, info};

use crate::chain::QuizChain;
use crate::config::QuizConfig;
use crate::decoder::{DecodedLog, QuizEvent};
use crate::error::IndexerResult;
use crate::watcher::{EventWatcher, Subscription};

/// Last score seen for one player. Never authoritative: `getPlayerScore`
/// is, and the cache only saves a round trip between reads.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ScoreCache {
    score: Option<u64>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<u64> {
        self.score
    }

    pub fn set(&mut self, score: u64) {
        self.score = Some(score);
    }

    pub fn clear(&mut self) {
        self.score = None;
    }
}

/// A connected player: a score cache plus the event subscription that
/// keeps it fresh.
pub struct Session {
    player: Address,
    cache: ScoreCache,
    subscription: Option<Subscription>,
}

impl Session {
    /// Start watching from `from_block` with an empty cache.
    pub fn connect(
        chain: Arc<dyn QuizChain>,
        config: &QuizConfig,
        player: Address,
        from_block: u64,
    ) -> Self {
        info!(%player, from_block, "session connected");
        Self {
            player,
            cache: ScoreCache::new(),
            subscription: Some(EventWatcher::subscribe(chain, config, from_block)),
        }
    }

    pub fn player(&self) -> Address {
        self.player
    }

    pub fn score(&self) -> Option<u64> {
        self.cache.get()
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }

    /// Seed or resync the cache from contract state.
    pub async fn refresh(&mut self, chain: &dyn QuizChain) -> IndexerResult<u64> {
        let score = chain.player_score(self.player).await?;
        self.cache.set(score);
        Ok(score)
    }

    /// Fold one event into the cache. Returns whether the cache changed.
    pub fn apply(&mut self, log: &DecodedLog) -> bool {
        match log.event {
            QuizEvent::ScoreUpdated { player, new_score } if player == self.player => {
                debug!(%player, new_score, block = log.block_number, "score updated");
                self.cache.set(new_score);
                true
            }
            _ => false,
        }
    }

    /// Next event from the subscription, already applied to the cache.
    /// `None` once disconnected.
    pub async fn next_event(&mut self) -> Option<DecodedLog> {
        let log = self.subscription.as_mut()?.recv().await?;
        self.apply(&log);
        Some(log)
    }

    /// Stop watching and forget the cached score.
    pub fn disconnect(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.cache.clear();
        info!(player = %self.player, "session disconnected");
    }
}
