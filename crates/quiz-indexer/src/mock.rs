//! In-memory `QuizChain` for tests and local tooling.
//!
//! State sits behind a mutex so a test can keep mutating the chain while a
//! watcher holds an `Arc` to it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

use crate::abi::QuizGame;
use crate::chain::{LogQuery, QuestionData, QuestionState, QuizChain, RawLog};
use crate::error::ChainError;

#[derive(Clone, Debug)]
struct MockQuestion {
    data: QuestionData,
    state: QuestionState,
    correct: Option<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    head: u64,
    owner: Address,
    questions: Vec<MockQuestion>,
    names: BTreeMap<Address, String>,
    scores: BTreeMap<Address, u64>,
    answers: BTreeMap<(u64, Address), u8>,
    logs: Vec<RawLog>,
    max_log_range: Option<u64>,
    owner_unreadable: bool,
    rate_limited: bool,
    failing: BTreeSet<Address>,
}

#[derive(Debug, Default)]
pub struct MockQuizChain {
    state: Mutex<MockState>,
    queries: Mutex<Vec<(u64, Option<u64>)>>,
}

impl MockQuizChain {
    pub fn new(owner: Address) -> Self {
        let chain = Self::default();
        chain.state().owner = owner;
        chain
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ─── Provider knobs ──────────────────────────────────────────────────

    pub fn set_head(&self, block: u64) {
        self.state().head = block;
    }

    pub fn head(&self) -> u64 {
        self.state().head
    }

    /// Reject any `getLogs` spanning more than `blocks` blocks.
    pub fn set_max_log_range(&self, blocks: Option<u64>) {
        self.state().max_log_range = blocks;
    }

    pub fn set_rate_limited(&self, limited: bool) {
        self.state().rate_limited = limited;
    }

    pub fn set_owner_unreadable(&self, unreadable: bool) {
        self.state().owner_unreadable = unreadable;
    }

    /// Name and score reads for `player` fail with a transport error.
    pub fn fail_reads_for(&self, player: Address) {
        self.state().failing.insert(player);
    }

    /// `(from_block, to_block)` of every `getLogs` call so far.
    pub fn queries(&self) -> Vec<(u64, Option<u64>)> {
        self.queries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_queries(&self) {
        self.queries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    // ─── Contract state ──────────────────────────────────────────────────

    /// Append a log for `event` at `block`, advancing the head if needed.
    pub fn emit<E: SolEvent>(&self, block: u64, event: &E) {
        let data = event.encode_log_data();
        let mut state = self.state();
        let log_index = state
            .logs
            .iter()
            .filter(|l| l.block_number == block)
            .count() as u64;
        state.logs.push(RawLog {
            block_number: block,
            log_index,
            topics: data.topics().to_vec(),
            data: data.data.clone(),
        });
        state.head = state.head.max(block);
    }

    /// Push a raw log as-is, for feeding malformed entries.
    pub fn push_raw_log(&self, log: RawLog) {
        let mut state = self.state();
        state.head = state.head.max(log.block_number);
        state.logs.push(log);
    }

    pub fn register_player(&self, block: u64, player: Address, name: &str) {
        {
            let mut state = self.state();
            state.names.insert(player, name.to_string());
            state.scores.entry(player).or_insert(0);
        }
        self.emit(
            block,
            &QuizGame::PlayerRegistered {
                player,
                name: name.to_string(),
            },
        );
    }

    pub fn rename_player(&self, block: u64, player: Address, new_name: &str) {
        if let Some(slot) = self.state().names.get_mut(&player) {
            *slot = new_name.to_string();
        }
        self.emit(
            block,
            &QuizGame::NameChanged {
                player,
                newName: new_name.to_string(),
            },
        );
    }

    pub fn set_score(&self, player: Address, score: u64) {
        self.state().scores.insert(player, score);
    }

    /// Returns the new question id.
    pub fn add_question(&self, creator: Address, text: &str, options: [&str; 4]) -> u64 {
        let mut state = self.state();
        state.questions.push(MockQuestion {
            data: QuestionData {
                text: text.to_string(),
                options: options.map(str::to_string),
            },
            state: QuestionState {
                is_active: true,
                is_revealed: false,
                creator,
            },
            correct: None,
        });
        state.questions.len() as u64 - 1
    }

    pub fn reveal(&self, block: u64, question_id: u64, correct: u8, salt: B256) {
        {
            let mut state = self.state();
            if let Some(q) = state.questions.get_mut(question_id as usize) {
                q.state.is_revealed = true;
                q.correct = Some(correct);
            }
        }
        self.emit(
            block,
            &QuizGame::AnswerRevealed {
                questionId: U256::from(question_id),
                correctAnswer: correct,
                salt,
            },
        );
    }

    pub fn submit(&self, block: u64, question_id: u64, player: Address, answer: u8) {
        self.state().answers.insert((question_id, player), answer);
        self.emit(
            block,
            &QuizGame::AnswerSubmitted {
                player,
                questionId: U256::from(question_id),
                answer,
            },
        );
    }

    pub fn evaluate(&self, block: u64, question_id: u64, player: Address, is_correct: bool) {
        self.emit(
            block,
            &QuizGame::AnswerEvaluated {
                player,
                questionId: U256::from(question_id),
                isCorrect: is_correct,
            },
        );
    }

    fn question_entry(&self, id: u64) -> Result<MockQuestion, ChainError> {
        self.state()
            .questions
            .get(id as usize)
            .cloned()
            .ok_or_else(|| ChainError::Revert(format!("question {id} does not exist")))
    }

    fn check_readable(&self, player: Address) -> Result<(), ChainError> {
        if self.state().failing.contains(&player) {
            return Err(ChainError::Transport(format!("read failed for {player}")));
        }
        Ok(())
    }
}

#[async_trait]
impl QuizChain for MockQuizChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.state().head)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, ChainError> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((query.from_block, query.to_block));

        let state = self.state();
        if state.rate_limited {
            return Err(ChainError::RateLimited("Too Many Requests".into()));
        }
        let to = query.to_block.unwrap_or(state.head);
        if let Some(max) = state.max_log_range {
            let span = to.saturating_sub(query.from_block).saturating_add(1);
            if span > max {
                return Err(ChainError::RangeTooLarge(format!(
                    "eth_getLogs is limited to a {max} block range"
                )));
            }
        }
        Ok(state
            .logs
            .iter()
            .filter(|l| l.block_number >= query.from_block && l.block_number <= to)
            .filter(|l| query.matches(l))
            .cloned()
            .collect())
    }

    async fn owner(&self) -> Result<Address, ChainError> {
        let state = self.state();
        if state.owner_unreadable {
            return Err(ChainError::Transport("owner() unavailable".into()));
        }
        Ok(state.owner)
    }

    async fn question_count(&self) -> Result<u64, ChainError> {
        Ok(self.state().questions.len() as u64)
    }

    async fn question(&self, id: u64) -> Result<QuestionData, ChainError> {
        Ok(self.question_entry(id)?.data)
    }

    async fn question_state(&self, id: u64) -> Result<QuestionState, ChainError> {
        Ok(self.question_entry(id)?.state)
    }

    async fn has_player_answered(&self, id: u64, player: Address) -> Result<bool, ChainError> {
        Ok(self.state().answers.contains_key(&(id, player)))
    }

    async fn player_answer(&self, id: u64, player: Address) -> Result<u8, ChainError> {
        self.state()
            .answers
            .get(&(id, player))
            .copied()
            .ok_or_else(|| ChainError::Revert("NotRegistered".into()))
    }

    async fn correct_answer(&self, id: u64) -> Result<u8, ChainError> {
        self.question_entry(id)?
            .correct
            .ok_or_else(|| ChainError::Revert("QuestionNotRevealed".into()))
    }

    async fn player_score(&self, player: Address) -> Result<u64, ChainError> {
        self.check_readable(player)?;
        Ok(self.state().scores.get(&player).copied().unwrap_or(0))
    }

    async fn player_name(&self, player: Address) -> Result<String, ChainError> {
        self.check_readable(player)?;
        Ok(self.state().names.get(&player).cloned().unwrap_or_default())
    }
}
