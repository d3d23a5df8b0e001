use std::collections::BTreeSet;
use std::time::Duration;

use alloy::primitives::Address;

use crate::error::{IndexerError, IndexerResult};

const CONTRACT_ADDRESS_KEYS: [&str; 3] = [
    "QUIZ_CONTRACT_ADDRESS",
    "CONTRACT_ADDRESS",
    "NEXT_PUBLIC_CONTRACT_ADDRESS",
];
const RPC_URL_KEYS: [&str; 5] = [
    "QUIZ_RPC_URL",
    "NEXT_PUBLIC_SEPOLIA_RPC_URL",
    "NEXT_PUBLIC_RPC_URL",
    "SEPOLIA_RPC_URL",
    "RPC_URL",
];
const START_BLOCK_KEYS: [&str; 2] = ["LOG_START_BLOCK", "NEXT_PUBLIC_LOG_START_BLOCK"];
const LOOKBACK_BLOCKS_KEYS: [&str; 2] = ["LOG_LOOKBACK_BLOCKS", "NEXT_PUBLIC_LOG_LOOKBACK_BLOCKS"];
const LOOKBACK_HOURS_KEYS: [&str; 2] = ["LOG_LOOKBACK_HOURS", "NEXT_PUBLIC_LOG_LOOKBACK_HOURS"];
const BLACKLIST_KEYS: [&str; 3] = [
    "LEADERBOARD_BLACKLIST",
    "NEXT_PUBLIC_LEADERBOARD_BLACKLIST",
    "NEXT_PUBLIC_EXCLUDE_ADDRESSES",
];

pub const DEFAULT_LOG_WINDOW: u64 = 1500;
pub const DEFAULT_LOOKBACK_HOURS: f64 = 4.0;
/// ~12 s block time.
pub const DEFAULT_BLOCKS_PER_HOUR: u64 = 300;
pub const DEFAULT_READ_BATCH_SIZE: usize = 8;
pub const DEFAULT_POLL_SECS: u64 = 12;

#[derive(Clone, Debug)]
pub struct QuizConfig {
    pub contract_address: Address,
    pub rpc_url: String,
    /// Lowest block ever scanned.
    pub start_block: u64,
    /// Only scan this many trailing blocks; 0 disables the horizon.
    pub lookback_blocks: u64,
    /// Width of one `getLogs` window once chunking kicks in.
    pub log_window: u64,
    /// Never listed on the leaderboard.
    pub blacklist: BTreeSet<Address>,
    /// Concurrent contract reads per batch.
    pub read_batch_size: usize,
    pub poll_interval: Duration,
}

impl QuizConfig {
    pub fn from_env() -> IndexerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Required keys are checked before
    /// anything else so a missing setting fails before a network call.
    pub fn from_lookup<F>(lookup: F) -> IndexerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let raw_address = first(&CONTRACT_ADDRESS_KEYS)
            .ok_or(IndexerError::MissingConfig("contract address (QUIZ_CONTRACT_ADDRESS)"))?;
        let contract_address =
            raw_address
                .parse::<Address>()
                .map_err(|_| IndexerError::InvalidConfig {
                    key: "QUIZ_CONTRACT_ADDRESS",
                    value: raw_address.clone(),
                })?;
        let rpc_url =
            first(&RPC_URL_KEYS).ok_or(IndexerError::MissingConfig("RPC URL (QUIZ_RPC_URL)"))?;

        let start_block = first(&START_BLOCK_KEYS)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let blocks_per_hour = first(&["BLOCKS_PER_HOUR"])
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_BLOCKS_PER_HOUR);
        let lookback_blocks = match first(&LOOKBACK_BLOCKS_KEYS)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
        {
            Some(blocks) => blocks,
            None => {
                let hours = first(&LOOKBACK_HOURS_KEYS)
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|h| !h.is_nan())
                    .unwrap_or(DEFAULT_LOOKBACK_HOURS);
                hours_to_blocks(hours, blocks_per_hour)
            }
        };

        let log_window = first(&["LOG_WINDOW_BLOCKS"])
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LOG_WINDOW);
        let read_batch_size = first(&["READ_BATCH_SIZE"])
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_READ_BATCH_SIZE);
        let poll_secs = first(&["WATCH_POLL_SECS"])
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_POLL_SECS);

        let blacklist = first(&BLACKLIST_KEYS)
            .map(|raw| parse_address_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            contract_address,
            rpc_url,
            start_block,
            lookback_blocks,
            log_window,
            blacklist,
            read_batch_size,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    /// Minimal config for a known contract and endpoint, everything else at
    /// defaults and no lookback horizon.
    pub fn new(contract_address: Address, rpc_url: impl Into<String>) -> Self {
        Self {
            contract_address,
            rpc_url: rpc_url.into(),
            start_block: 0,
            lookback_blocks: 0,
            log_window: DEFAULT_LOG_WINDOW,
            blacklist: BTreeSet::new(),
            read_batch_size: DEFAULT_READ_BATCH_SIZE,
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
        }
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }
}

/// `max(1, round(hours * blocks_per_hour))`, or 0 for a non-positive horizon.
pub fn hours_to_blocks(hours: f64, blocks_per_hour: u64) -> u64 {
    if !(hours > 0.0) {
        return 0;
    }
    ((hours * blocks_per_hour as f64).round() as u64).max(1)
}

/// Comma-separated addresses; unparsable entries are dropped.
pub fn parse_address_list(raw: &str) -> BTreeSet<Address> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<Address>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                tracing::warn!(entry = s, "ignoring malformed blacklist address");
                None
            }
        })
        .collect()
}
