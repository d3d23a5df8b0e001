use std::collections::BTreeMap;

use alloy::primitives::Address;
use quiz_rules::LeaderboardEntry;
use serde::Serialize;
use tracing::info;

use crate::chain::{LogQuery, QuizChain, RawLog};
use crate::config::QuizConfig;
use crate::decoder::{decode_logs, QuizEvent, ANSWER_EVALUATED};
use crate::error::IndexerResult;
use crate::fetcher::LogFetcher;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct AnswerTally {
    pub correct: u64,
    pub total: u64,
}

impl AnswerTally {
    fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    pub fn accuracy_pct(&self) -> u64 {
        accuracy_pct(self.correct, self.total)
    }
}

/// Evaluated answers per question and per player, from `AnswerEvaluated`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct QuizStats {
    pub questions: BTreeMap<u64, AnswerTally>,
    pub players: BTreeMap<Address, AnswerTally>,
    pub overall: AnswerTally,
}

impl QuizStats {
    /// Zero tally for a question nobody answered yet.
    pub fn question(&self, id: u64) -> AnswerTally {
        self.questions.get(&id).copied().unwrap_or_default()
    }

    pub fn player(&self, address: Address) -> AnswerTally {
        self.players.get(&address).copied().unwrap_or_default()
    }
}

/// Rounded `correct / total` in percent, 0 for an empty tally.
pub fn accuracy_pct(correct: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let (correct, total) = (u128::from(correct), u128::from(total));
    ((correct * 100 + total / 2) / total) as u64
}

pub async fn fetch_quiz_stats<C>(chain: &C, config: &QuizConfig) -> IndexerResult<QuizStats>
where
    C: QuizChain + ?Sized,
{
    let fetcher = LogFetcher::new(chain, config.log_window);
    let from_block = fetcher
        .resolve_from_block(config.lookback_blocks, config.start_block)
        .await?;
    let query = LogQuery::new(config.contract_address, ANSWER_EVALUATED).from_block(from_block);
    let stats = tally_evaluations(&fetcher.fetch(&query).await?);
    info!(
        from_block,
        answers = stats.overall.total,
        questions = stats.questions.len(),
        "tallied evaluated answers"
    );
    Ok(stats)
}

pub fn tally_evaluations(logs: &[RawLog]) -> QuizStats {
    let mut stats = QuizStats::default();
    for log in decode_logs(logs) {
        if let QuizEvent::AnswerEvaluated {
            player,
            question_id,
            is_correct,
        } = log.event
        {
            stats.questions.entry(question_id).or_default().record(is_correct);
            stats.players.entry(player).or_default().record(is_correct);
            stats.overall.record(is_correct);
        }
    }
    stats
}

/// Headline numbers printed under the leaderboard.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LeaderboardSummary {
    pub total_players: usize,
    pub total_answers: u64,
    pub accuracy_pct: u64,
    pub average_score: u64,
    pub top_scorer: Option<LeaderboardEntry>,
}

/// `entries` must already be ranked.
pub fn summarize(entries: &[LeaderboardEntry], stats: &QuizStats) -> LeaderboardSummary {
    let players = entries.len() as u128;
    let score_sum: u128 = entries.iter().map(|e| u128::from(e.score)).sum();
    let average_score = if players == 0 {
        0
    } else {
        ((score_sum + players / 2) / players) as u64
    };
    LeaderboardSummary {
        total_players: entries.len(),
        total_answers: stats.overall.total,
        accuracy_pct: stats.overall.accuracy_pct(),
        average_score,
        top_scorer: entries.first().cloned(),
    }
}
