use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::error::ChainError;

/// Question body as returned by `getQuestion`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuestionData {
    pub text: String,
    pub options: [String; 4],
}

/// Question lifecycle flags as returned by `getQuestionState`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QuestionState {
    pub is_active: bool,
    pub is_revealed: bool,
    pub creator: Address,
}

/// A `getLogs` request. `to_block: None` means the chain head.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogQuery {
    pub address: Address,
    pub event_signature: B256,
    pub topic1: Option<B256>,
    pub topic2: Option<B256>,
    pub from_block: u64,
    pub to_block: Option<u64>,
}

impl LogQuery {
    pub fn new(address: Address, event_signature: B256) -> Self {
        Self {
            address,
            event_signature,
            topic1: None,
            topic2: None,
            from_block: 0,
            to_block: None,
        }
    }

    pub fn topic1(mut self, topic: B256) -> Self {
        self.topic1 = Some(topic);
        self
    }

    pub fn topic2(mut self, topic: B256) -> Self {
        self.topic2 = Some(topic);
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = block;
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    pub fn window(&self, from: u64, to: u64) -> Self {
        Self {
            from_block: from,
            to_block: Some(to),
            ..self.clone()
        }
    }

    pub fn matches(&self, log: &RawLog) -> bool {
        let topic = |i: usize| log.topics.get(i).copied();
        topic(0) == Some(self.event_signature)
            && self.topic1.map_or(true, |t| topic(1) == Some(t))
            && self.topic2.map_or(true, |t| topic(2) == Some(t))
    }
}

/// Undecoded log entry, stripped down to what the decoder needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawLog {
    pub block_number: u64,
    pub log_index: u64,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Read surface of the quiz contract plus the two provider calls the
/// aggregators need. Every numeric value is normalised to `u64` / `u8`.
#[async_trait]
pub trait QuizChain: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainError>;
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, ChainError>;

    async fn owner(&self) -> Result<Address, ChainError>;
    async fn question_count(&self) -> Result<u64, ChainError>;
    async fn question(&self, id: u64) -> Result<QuestionData, ChainError>;
    async fn question_state(&self, id: u64) -> Result<QuestionState, ChainError>;
    async fn has_player_answered(&self, id: u64, player: Address) -> Result<bool, ChainError>;
    async fn player_answer(&self, id: u64, player: Address) -> Result<u8, ChainError>;
    async fn correct_answer(&self, id: u64) -> Result<u8, ChainError>;
    async fn player_score(&self, player: Address) -> Result<u64, ChainError>;
    async fn player_name(&self, player: Address) -> Result<String, ChainError>;
}

// ─── Numeric normalisation ─────────────────────────────────────────────────

pub fn u256_to_u64(value: U256) -> Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| ChainError::Overflow(value.to_string()))
}

/// Topic encoding of a `uint256 indexed` argument.
pub fn id_topic(id: u64) -> B256 {
    B256::from(U256::from(id).to_be_bytes::<32>())
}

/// Topic encoding of an `address indexed` argument.
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}
