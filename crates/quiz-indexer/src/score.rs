use alloy::primitives::Address;
use quiz_rules::{calc_creator_reward, calc_player_reward};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chain::{address_topic, id_topic, LogQuery, QuizChain, RawLog};
use crate::config::QuizConfig;
use crate::decoder::{decode_logs, sort_chain_order, QuizEvent, ANSWER_SUBMITTED};
use crate::error::IndexerResult;
use crate::fetcher::LogFetcher;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AnsweredRow {
    pub question_id: u64,
    pub question_text: String,
    pub my_answer: Option<u8>,
    pub correct_answer: Option<u8>,
    pub is_revealed: bool,
    pub earned: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreatedRow {
    pub question_id: u64,
    pub question_text: String,
    pub is_revealed: bool,
    pub correct_answer: Option<u8>,
    pub correct_count: u64,
    pub wrong_count: u64,
    pub earned: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub answered: Vec<AnsweredRow>,
    pub created: Vec<CreatedRow>,
    pub total_score: u64,
}

impl ScoreBreakdown {
    /// Sum of the recomputed rows. Display value only, the contract's
    /// `total_score` stays authoritative.
    pub fn recomputed_total(&self) -> u64 {
        self.answered.iter().map(|r| r.earned).sum::<u64>()
            + self.created.iter().map(|r| r.earned).sum::<u64>()
    }
}

/// Questions the player answered and questions the player created, with
/// points re-derived off-chain, plus the contract's own total.
pub async fn fetch_score_breakdown<C>(
    chain: &C,
    config: &QuizConfig,
    player: Address,
) -> IndexerResult<ScoreBreakdown>
where
    C: QuizChain + ?Sized,
{
    let fetcher = LogFetcher::new(chain, config.log_window);
    let question_count = chain.question_count().await?;
    info!(%player, question_count, "building score breakdown");

    let mut breakdown = ScoreBreakdown::default();
    // Resolved lazily: only creators of revealed questions need a log scan.
    let mut from_block: Option<u64> = None;

    for id in 0..question_count {
        let (state, question) =
            tokio::try_join!(chain.question_state(id), chain.question(id))?;
        let has_answered = chain.has_player_answered(id, player).await?;

        if has_answered {
            let my_answer = match chain.player_answer(id, player).await {
                Ok(answer) => Some(answer),
                Err(err) => {
                    debug!(id, %err, "own answer unavailable");
                    None
                }
            };
            let correct_answer = if state.is_revealed {
                read_correct_answer(chain, id).await
            } else {
                None
            };
            let earned = match (my_answer, correct_answer) {
                (Some(mine), Some(correct)) => calc_player_reward(mine == correct, true),
                _ => 0,
            };
            breakdown.answered.push(AnsweredRow {
                question_id: id,
                question_text: question.text.clone(),
                my_answer,
                correct_answer,
                is_revealed: state.is_revealed,
                earned,
            });
        }

        if state.creator == player {
            let mut row = CreatedRow {
                question_id: id,
                question_text: question.text,
                is_revealed: state.is_revealed,
                correct_answer: None,
                correct_count: 0,
                wrong_count: 0,
                earned: 0,
            };
            if state.is_revealed {
                row.correct_answer = read_correct_answer(chain, id).await;
                if let Some(correct) = row.correct_answer {
                    let from = match from_block {
                        Some(block) => block,
                        None => {
                            let block = fetcher
                                .resolve_from_block(config.lookback_blocks, config.start_block)
                                .await?;
                            from_block = Some(block);
                            block
                        }
                    };
                    let (correct_count, wrong_count) =
                        tally_answers(&fetcher, config, id, correct, from).await?;
                    row.correct_count = correct_count;
                    row.wrong_count = wrong_count;
                    row.earned = calc_creator_reward(correct_count, wrong_count);
                }
            }
            breakdown.created.push(row);
        }
    }

    breakdown.answered.sort_by_key(|r| r.question_id);
    breakdown.created.sort_by_key(|r| r.question_id);

    breakdown.total_score = match chain.player_score(player).await {
        Ok(score) => score,
        Err(err) => {
            warn!(%player, %err, "could not read total score");
            0
        }
    };
    Ok(breakdown)
}

async fn read_correct_answer<C>(chain: &C, id: u64) -> Option<u8>
where
    C: QuizChain + ?Sized,
{
    match chain.correct_answer(id).await {
        Ok(answer) => Some(answer),
        Err(err) => {
            debug!(id, %err, "correct answer unavailable");
            None
        }
    }
}

/// Count `AnswerSubmitted` logs for one question against the revealed
/// answer. Client-side tally, independent of the contract's own scoring.
async fn tally_answers<C>(
    fetcher: &LogFetcher<'_, C>,
    config: &QuizConfig,
    question_id: u64,
    correct: u8,
    from_block: u64,
) -> IndexerResult<(u64, u64)>
where
    C: QuizChain + ?Sized,
{
    let query = LogQuery::new(config.contract_address, ANSWER_SUBMITTED)
        .topic2(id_topic(question_id))
        .from_block(from_block);
    let logs = fetcher.fetch(&query).await?;
    Ok(count_answers(&logs, question_id, correct))
}

/// `(correct, wrong)` among decodable `AnswerSubmitted` logs for `question_id`.
pub fn count_answers(logs: &[RawLog], question_id: u64, correct: u8) -> (u64, u64) {
    decode_logs(logs)
        .into_iter()
        .filter_map(|log| match log.event {
            QuizEvent::AnswerSubmitted {
                question_id: id,
                answer,
                ..
            } if id == question_id => Some(answer),
            _ => None,
        })
        .fold((0, 0), |(right, wrong), answer| {
            if answer == correct {
                (right + 1, wrong)
            } else {
                (right, wrong + 1)
            }
        })
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Submission {
    pub question_id: u64,
    pub answer: u8,
    pub block_number: u64,
}

/// Every `AnswerSubmitted` log for one player within the scan horizon,
/// oldest first.
pub async fn fetch_submissions<C>(
    chain: &C,
    config: &QuizConfig,
    player: Address,
) -> IndexerResult<Vec<Submission>>
where
    C: QuizChain + ?Sized,
{
    let fetcher = LogFetcher::new(chain, config.log_window);
    let from_block = fetcher
        .resolve_from_block(config.lookback_blocks, config.start_block)
        .await?;
    let query = LogQuery::new(config.contract_address, ANSWER_SUBMITTED)
        .topic1(address_topic(player))
        .from_block(from_block);
    let mut logs = decode_logs(&fetcher.fetch(&query).await?);
    sort_chain_order(&mut logs);
    Ok(logs
        .into_iter()
        .filter_map(|log| match log.event {
            QuizEvent::AnswerSubmitted {
                player: who,
                question_id,
                answer,
            } if who == player => Some(Submission {
                question_id,
                answer,
                block_number: log.block_number,
            }),
            _ => None,
        })
        .collect())
}
