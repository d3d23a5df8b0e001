use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;
use serde::Serialize;
use tracing::debug;

use crate::abi::QuizGame;
use crate::chain::{u256_to_u64, RawLog};
use crate::error::ChainError;

/// Typed view of every event the client consumes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum QuizEvent {
    PlayerRegistered {
        player: Address,
        name: String,
    },
    NameChanged {
        player: Address,
        new_name: String,
    },
    AnswerSubmitted {
        player: Address,
        question_id: u64,
        answer: u8,
    },
    AnswerEvaluated {
        player: Address,
        question_id: u64,
        is_correct: bool,
    },
    ScoreUpdated {
        player: Address,
        new_score: u64,
    },
    AnswerRevealed {
        question_id: u64,
        correct_answer: u8,
        salt: B256,
    },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DecodedLog {
    pub block_number: u64,
    pub log_index: u64,
    pub event: QuizEvent,
}

pub const PLAYER_REGISTERED: B256 = QuizGame::PlayerRegistered::SIGNATURE_HASH;
pub const NAME_CHANGED: B256 = QuizGame::NameChanged::SIGNATURE_HASH;
pub const ANSWER_SUBMITTED: B256 = QuizGame::AnswerSubmitted::SIGNATURE_HASH;
pub const ANSWER_EVALUATED: B256 = QuizGame::AnswerEvaluated::SIGNATURE_HASH;
pub const SCORE_UPDATED: B256 = QuizGame::ScoreUpdated::SIGNATURE_HASH;
pub const ANSWER_REVEALED: B256 = QuizGame::AnswerRevealed::SIGNATURE_HASH;

pub const ALL_EVENT_SIGNATURES: [B256; 6] = [
    PLAYER_REGISTERED,
    NAME_CHANGED,
    ANSWER_SUBMITTED,
    ANSWER_EVALUATED,
    SCORE_UPDATED,
    ANSWER_REVEALED,
];

fn decode_as<E: SolEvent>(log: &RawLog) -> Result<E, ChainError> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data)
        .map_err(|e| ChainError::Decode(format!("{}: {e}", E::SIGNATURE)))
}

pub fn decode_log(log: &RawLog) -> Result<DecodedLog, ChainError> {
    let topic0 = log
        .topics
        .first()
        .copied()
        .ok_or_else(|| ChainError::Decode("log without topics".into()))?;

    let event = if topic0 == PLAYER_REGISTERED {
        let ev = decode_as::<QuizGame::PlayerRegistered>(log)?;
        QuizEvent::PlayerRegistered {
            player: ev.player,
            name: ev.name,
        }
    } else if topic0 == NAME_CHANGED {
        let ev = decode_as::<QuizGame::NameChanged>(log)?;
        QuizEvent::NameChanged {
            player: ev.player,
            new_name: ev.newName,
        }
    } else if topic0 == ANSWER_SUBMITTED {
        let ev = decode_as::<QuizGame::AnswerSubmitted>(log)?;
        QuizEvent::AnswerSubmitted {
            player: ev.player,
            question_id: u256_to_u64(ev.questionId)?,
            answer: ev.answer,
        }
    } else if topic0 == ANSWER_EVALUATED {
        let ev = decode_as::<QuizGame::AnswerEvaluated>(log)?;
        QuizEvent::AnswerEvaluated {
            player: ev.player,
            question_id: u256_to_u64(ev.questionId)?,
            is_correct: ev.isCorrect,
        }
    } else if topic0 == SCORE_UPDATED {
        let ev = decode_as::<QuizGame::ScoreUpdated>(log)?;
        QuizEvent::ScoreUpdated {
            player: ev.player,
            new_score: u256_to_u64(ev.newScore)?,
        }
    } else if topic0 == ANSWER_REVEALED {
        let ev = decode_as::<QuizGame::AnswerRevealed>(log)?;
        QuizEvent::AnswerRevealed {
            question_id: u256_to_u64(ev.questionId)?,
            correct_answer: ev.correctAnswer,
            salt: ev.salt,
        }
    } else {
        return Err(ChainError::Decode(format!("unknown event topic {topic0}")));
    };

    Ok(DecodedLog {
        block_number: log.block_number,
        log_index: log.log_index,
        event,
    })
}

/// Decode what can be decoded. Entries that do not match the ABI are
/// skipped so one bad log never sinks an aggregation pass.
pub fn decode_logs(logs: &[RawLog]) -> Vec<DecodedLog> {
    logs.iter()
        .filter_map(|log| match decode_log(log) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                debug!(block = log.block_number, index = log.log_index, %err, "skipping log");
                None
            }
        })
        .collect()
}

/// Sort into chain order.
pub fn sort_chain_order(logs: &mut [DecodedLog]) {
    logs.sort_by_key(|l| (l.block_number, l.log_index));
}
