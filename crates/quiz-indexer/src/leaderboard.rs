use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::Address;
use futures::future::join_all;
use quiz_rules::{rank_entries, LeaderboardEntry};
use tracing::{info, warn};

use crate::chain::{LogQuery, QuizChain, RawLog};
use crate::config::QuizConfig;
use crate::decoder::{decode_logs, sort_chain_order, QuizEvent, NAME_CHANGED, PLAYER_REGISTERED};
use crate::error::IndexerResult;
use crate::fetcher::LogFetcher;

/// Ranked `(address, name, score)` for every registered player, minus the
/// blacklist and the contract owner.
///
/// Names and scores come from live contract reads, the logs only say who
/// to look up.
pub async fn fetch_leaderboard<C>(chain: &C, config: &QuizConfig) -> IndexerResult<Vec<LeaderboardEntry>>
where
    C: QuizChain + ?Sized,
{
    let fetcher = LogFetcher::new(chain, config.log_window);

    let mut excluded: BTreeSet<Address> = config.blacklist.clone();
    match chain.owner().await {
        Ok(owner) => {
            excluded.insert(owner);
        }
        Err(err) => warn!(%err, "could not read contract owner"),
    }

    let from_block = fetcher
        .resolve_from_block(config.lookback_blocks, config.start_block)
        .await?;
    let registered_query =
        LogQuery::new(config.contract_address, PLAYER_REGISTERED).from_block(from_block);
    let renamed_query =
        LogQuery::new(config.contract_address, NAME_CHANGED).from_block(from_block);
    let (registered_logs, renamed_logs) = tokio::try_join!(
        fetcher.fetch(&registered_query),
        fetcher.fetch(&renamed_query)
    )?;

    let names = collect_player_names(&registered_logs, &renamed_logs);
    let candidates: Vec<Address> = names
        .keys()
        .copied()
        .filter(|addr| !excluded.contains(addr))
        .collect();
    info!(
        from_block,
        registered = names.len(),
        listed = candidates.len(),
        "building leaderboard"
    );

    let mut entries = Vec::with_capacity(candidates.len());
    for batch in candidates.chunks(config.read_batch_size.max(1)) {
        let reads = batch.iter().map(|&addr| read_entry(chain, addr));
        entries.extend(join_all(reads).await.into_iter().flatten());
    }

    rank_entries(&mut entries);
    Ok(entries)
}

/// address → latest name. Registrations first, then renames in chain
/// order; a rename for an address that never registered is ignored.
pub fn collect_player_names(
    registered: &[RawLog],
    renamed: &[RawLog],
) -> BTreeMap<Address, String> {
    let mut names = BTreeMap::new();

    let mut registrations = decode_logs(registered);
    sort_chain_order(&mut registrations);
    for log in registrations {
        if let QuizEvent::PlayerRegistered { player, name } = log.event {
            names.insert(player, name);
        }
    }

    let mut renames = decode_logs(renamed);
    sort_chain_order(&mut renames);
    for log in renames {
        if let QuizEvent::NameChanged { player, new_name } = log.event {
            if let Some(slot) = names.get_mut(&player) {
                *slot = new_name;
            }
        }
    }
    names
}

async fn read_entry<C>(chain: &C, address: Address) -> Option<LeaderboardEntry>
where
    C: QuizChain + ?Sized,
{
    match tokio::try_join!(chain.player_name(address), chain.player_score(address)) {
        Ok((name, score)) => Some(LeaderboardEntry {
            address,
            name,
            score,
        }),
        Err(err) => {
            warn!(%address, %err, "failed to fetch player data");
            None
        }
    }
}
