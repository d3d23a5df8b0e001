//! # Quiz Rules
//!
//! Pure scoring and commitment logic shared by every QuizGame client.
//! Nothing in here touches the network: the same functions back the
//! off-chain score breakdown and the operational tooling.
//!
//! ## Features
//! - Player reward table (correct / wrong, only once revealed)
//! - Creator reward tiers keyed on how balanced the respondents were
//! - `keccak256(abi.encode(uint8 index, bytes32 salt))` answer commitments
//! - Leaderboard ordering (score desc, then name asc)

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::SolValue;
use rand::RngCore;
use serde::Serialize;

// ═══════════════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════════════

pub const PLAYER_REWARD_CORRECT: u64 = 7;
pub const PLAYER_REWARD_WRONG: u64 = 3;

pub const CREATOR_REWARD_BEST: u64 = 10; // balanced band or exact tie
pub const CREATOR_REWARD_HIGH: u64 = 6; // correct outnumber wrong
pub const CREATOR_REWARD_LOW: u64 = 4; // wrong outnumber correct

/// Inclusive bounds of the balanced band, in percent of correct answers.
pub const BALANCED_BAND_MIN_PCT: u64 = 40;
pub const BALANCED_BAND_MAX_PCT: u64 = 70;

/// Every question carries exactly four options.
pub const OPTIONS_PER_QUESTION: u8 = 4;

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RulesError {
    #[error("answer index {0} is out of range (expected 0..=3)")]
    InvalidAnswerIndex(u8),
    #[error("salt must be a 32-byte hex string (66 chars with 0x): {0}")]
    InvalidSalt(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Scoring
// ═══════════════════════════════════════════════════════════════════════════════

/// Points a player earns on a single question.
/// Unrevealed questions are worth nothing yet.
pub fn calc_player_reward(is_correct: bool, is_revealed: bool) -> u64 {
    if !is_revealed {
        return 0;
    }
    if is_correct {
        PLAYER_REWARD_CORRECT
    } else {
        PLAYER_REWARD_WRONG
    }
}

/// True when the correct share sits in `[40%, 70%]` or the split is an
/// exact tie. Integer form of `40 <= correct * 100 / total <= 70`.
pub fn is_balanced_band(correct_count: u64, wrong_count: u64) -> bool {
    // u128 keeps `count * 100` exact for any pair of u64 counts.
    let correct = u128::from(correct_count);
    let total = correct + u128::from(wrong_count);
    if total == 0 {
        return false;
    }
    let scaled = correct * 100;
    correct_count == wrong_count
        || (scaled >= u128::from(BALANCED_BAND_MIN_PCT) * total
            && scaled <= u128::from(BALANCED_BAND_MAX_PCT) * total)
}

/// Points a question creator earns once the answer is revealed.
pub fn calc_creator_reward(correct_count: u64, wrong_count: u64) -> u64 {
    if correct_count == 0 && wrong_count == 0 {
        return 0;
    }
    if is_balanced_band(correct_count, wrong_count) {
        return CREATOR_REWARD_BEST;
    }
    if correct_count > wrong_count {
        CREATOR_REWARD_HIGH
    } else {
        CREATOR_REWARD_LOW
    }
}

/// Reward table for display.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ScoreRules {
    pub player_correct: u64,
    pub player_wrong: u64,
    pub creator_best: u64,
    pub creator_high: u64,
    pub creator_low: u64,
}

pub const SCORE_RULES: ScoreRules = ScoreRules {
    player_correct: PLAYER_REWARD_CORRECT,
    player_wrong: PLAYER_REWARD_WRONG,
    creator_best: CREATOR_REWARD_BEST,
    creator_high: CREATOR_REWARD_HIGH,
    creator_low: CREATOR_REWARD_LOW,
};

// ═══════════════════════════════════════════════════════════════════════════════
//  Commit-reveal
// ═══════════════════════════════════════════════════════════════════════════════

/// `keccak256(abi.encode(uint8 index, bytes32 salt))`.
///
/// The encoding is the 64-byte ABI tuple (index left-padded to a word,
/// then the salt), which is what the contract recomputes on reveal.
pub fn answer_commitment(correct_index: u8, salt: B256) -> B256 {
    keccak256((U256::from(correct_index), salt).abi_encode())
}

/// Check a reveal against a stored commitment.
pub fn verify_reveal(commitment: B256, correct_index: u8, salt: B256) -> bool {
    answer_commitment(correct_index, salt) == commitment
}

pub fn check_answer_index(index: u8) -> Result<u8, RulesError> {
    if index >= OPTIONS_PER_QUESTION {
        return Err(RulesError::InvalidAnswerIndex(index));
    }
    Ok(index)
}

/// Parse a 32-byte salt written as hex, `0x` prefix optional.
pub fn parse_salt(raw: &str) -> Result<B256, RulesError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.len() != 64 {
        return Err(RulesError::InvalidSalt(raw.to_string()));
    }
    format!("0x{hex}")
        .parse::<B256>()
        .map_err(|_| RulesError::InvalidSalt(raw.to_string()))
}

pub fn random_salt() -> B256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    B256::from(bytes)
}

/// A question's sealed answer. Keep `salt` private until reveal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Commitment {
    pub index: u8,
    pub salt: B256,
    pub hash: B256,
}

impl Commitment {
    pub fn new(index: u8, salt: B256) -> Result<Self, RulesError> {
        let index = check_answer_index(index)?;
        Ok(Self {
            index,
            salt,
            hash: answer_commitment(index, salt),
        })
    }

    /// Commit with a fresh random salt.
    pub fn generate(index: u8) -> Result<Self, RulesError> {
        Self::new(index, random_salt())
    }

    pub fn opens_with(&self, index: u8, salt: B256) -> bool {
        verify_reveal(self.hash, index, salt)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Leaderboard ordering
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub address: Address,
    pub name: String,
    pub score: u64,
}

/// Sort by score (descending), then name (ascending).
/// Address breaks the last tie so the order is total.
pub fn rank_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.address.cmp(&b.address))
    });
}
