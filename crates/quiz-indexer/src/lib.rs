//! # Quiz Indexer
//!
//! Off-chain client for the `QuizGame` contract: reads contract state,
//! scans its event logs, and rebuilds the views the game front end shows.
//!
//! ## Features
//! - Environment-driven configuration with a bounded log horizon
//! - `QuizChain` read surface with an alloy RPC backend and a signing writer
//! - `getLogs` with fallback to fixed windows, halving on repeated rejection
//! - Typed decoding of all six contract events; undecodable logs are skipped
//! - Leaderboard built from registrations and renames, excluding owner and blacklist
//! - Per-player score breakdown, including creator tallies from `AnswerSubmitted`
//! - Response and accuracy statistics per question and per player from `AnswerEvaluated`
//! - Polling event subscriptions and a per-session score cache
//! - Contract reverts mapped to readable reasons
//!
//! ## Log horizon
//! Every scan starts at `max(start_block, head - lookback + 1)`. A wide
//! range rejected by the provider is re-requested as consecutive
//! `[start, start + window - 1]` windows up to the head.

pub mod abi;
pub mod chain;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fetcher;
pub mod leaderboard;
#[cfg(any(test, feature = "testutils"))]
pub mod mock;
pub mod rpc;
pub mod score;
pub mod session;
pub mod stats;
pub mod watcher;

pub use chain::{LogQuery, QuestionData, QuestionState, QuizChain, RawLog};
pub use config::QuizConfig;
pub use decoder::{decode_log, decode_logs, DecodedLog, QuizEvent};
pub use error::{ChainError, IndexerError, IndexerResult, RevertReason};
pub use fetcher::LogFetcher;
pub use leaderboard::fetch_leaderboard;
#[cfg(any(test, feature = "testutils"))]
pub use mock::MockQuizChain;
pub use rpc::{QuizWriter, RpcQuizChain};
pub use score::{fetch_score_breakdown, fetch_submissions, ScoreBreakdown, Submission};
pub use session::{ScoreCache, Session};
pub use stats::{fetch_quiz_stats, summarize, AnswerTally, LeaderboardSummary, QuizStats};
pub use watcher::{EventWatcher, Subscription};

#[cfg(test)]
mod test;
