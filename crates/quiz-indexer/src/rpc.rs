//! alloy-backed implementation of the quiz contract surface.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::abi::QuizGame;
use crate::chain::{u256_to_u64, LogQuery, QuestionData, QuestionState, QuizChain, RawLog};
use crate::config::QuizConfig;
use crate::error::{ChainError, IndexerError, IndexerResult};

/// Custom errors the contract is known to raise.
const CUSTOM_ERRORS: [&str; 6] = [
    "AlreadyRegistered()",
    "EmptyName()",
    "NotRegistered()",
    "AlreadyAnswered()",
    "QuestionNotRevealed()",
    "InvalidAnswer()",
];

// ═══════════════════════════════════════════════════════════════════════════════
//  Error classification
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn custom_error_name(data: &[u8]) -> Option<&'static str> {
    let selector = data.get(..4)?;
    CUSTOM_ERRORS
        .iter()
        .find(|sig| &keccak256(sig.as_bytes())[..4] == selector)
        .map(|sig| sig.trim_end_matches("()"))
}

pub(crate) fn classify_transport(err: TransportError) -> ChainError {
    if let Some(payload) = err.as_error_resp() {
        if let Some(data) = payload.as_revert_data() {
            let reason = custom_error_name(&data)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} ({data})", payload.message));
            return ChainError::Revert(reason);
        }
        return ChainError::from_rpc(payload.code, &payload.message);
    }
    ChainError::Transport(err.to_string())
}

pub(crate) fn classify_contract(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(inner) => classify_transport(inner),
        other => ChainError::Decode(other.to_string()),
    }
}

fn to_raw_log(log: Log) -> RawLog {
    RawLog {
        block_number: log.block_number.unwrap_or_default(),
        log_index: log.log_index.unwrap_or_default(),
        topics: log.inner.data.topics().to_vec(),
        data: log.inner.data.data.clone(),
    }
}

fn to_filter(query: &LogQuery) -> Filter {
    let mut filter = Filter::new()
        .address(query.address)
        .event_signature(query.event_signature)
        .from_block(query.from_block);
    if let Some(topic) = query.topic1 {
        filter = filter.topic1(topic);
    }
    if let Some(topic) = query.topic2 {
        filter = filter.topic2(topic);
    }
    match query.to_block {
        Some(block) => filter.to_block(block),
        None => filter.to_block(BlockNumberOrTag::Latest),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Read-only chain
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct RpcQuizChain {
    provider: DynProvider,
    contract: QuizGame::QuizGameInstance<DynProvider>,
}

impl RpcQuizChain {
    pub async fn connect(config: &QuizConfig) -> IndexerResult<Self> {
        let provider = ProviderBuilder::new()
            .connect(&config.rpc_url)
            .await
            .map_err(classify_transport)?
            .erased();
        info!(contract = %config.contract_address, "connected read-only quiz client");
        Ok(Self::with_provider(provider, config.contract_address))
    }

    pub fn with_provider(provider: DynProvider, contract_address: Address) -> Self {
        let contract = QuizGame::new(contract_address, provider.clone());
        Self { provider, contract }
    }

    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}

#[async_trait]
impl QuizChain for RpcQuizChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(classify_transport)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, ChainError> {
        debug!(from = query.from_block, to = ?query.to_block, "eth_getLogs");
        let logs = self
            .provider
            .get_logs(&to_filter(query))
            .await
            .map_err(classify_transport)?;
        Ok(logs.into_iter().map(to_raw_log).collect())
    }

    async fn owner(&self) -> Result<Address, ChainError> {
        self.contract.owner().call().await.map_err(classify_contract)
    }

    async fn question_count(&self) -> Result<u64, ChainError> {
        let count = self
            .contract
            .questionCount()
            .call()
            .await
            .map_err(classify_contract)?;
        u256_to_u64(count)
    }

    async fn question(&self, id: u64) -> Result<QuestionData, ChainError> {
        let q = self
            .contract
            .getQuestion(U256::from(id))
            .call()
            .await
            .map_err(classify_contract)?;
        Ok(QuestionData {
            text: q.questionText,
            options: q.options,
        })
    }

    async fn question_state(&self, id: u64) -> Result<QuestionState, ChainError> {
        let s = self
            .contract
            .getQuestionState(U256::from(id))
            .call()
            .await
            .map_err(classify_contract)?;
        Ok(QuestionState {
            is_active: s.isActive,
            is_revealed: s.isRevealed,
            creator: s.creator,
        })
    }

    async fn has_player_answered(&self, id: u64, player: Address) -> Result<bool, ChainError> {
        self.contract
            .hasPlayerAnswered(U256::from(id), player)
            .call()
            .await
            .map_err(classify_contract)
    }

    async fn player_answer(&self, id: u64, player: Address) -> Result<u8, ChainError> {
        self.contract
            .playerAnswers(U256::from(id), player)
            .call()
            .await
            .map_err(classify_contract)
    }

    async fn correct_answer(&self, id: u64) -> Result<u8, ChainError> {
        self.contract
            .getCorrectAnswer(U256::from(id))
            .call()
            .await
            .map_err(classify_contract)
    }

    async fn player_score(&self, player: Address) -> Result<u64, ChainError> {
        let score = self
            .contract
            .getPlayerScore(player)
            .call()
            .await
            .map_err(classify_contract)?;
        u256_to_u64(score)
    }

    async fn player_name(&self, player: Address) -> Result<String, ChainError> {
        self.contract
            .getPlayerName(player)
            .call()
            .await
            .map_err(classify_contract)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Writer
// ═══════════════════════════════════════════════════════════════════════════════

/// Signs and sends the contract's state-changing calls.
/// Every method waits for the receipt and returns the transaction hash.
pub struct QuizWriter {
    sender: Address,
    contract: QuizGame::QuizGameInstance<DynProvider>,
}

impl QuizWriter {
    pub async fn connect(config: &QuizConfig, private_key: &str) -> IndexerResult<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| IndexerError::Signer(format!("invalid private key: {e}")))?;
        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect(&config.rpc_url)
            .await
            .map_err(classify_transport)?
            .erased();
        info!(%sender, contract = %config.contract_address, "connected quiz writer");
        Ok(Self {
            sender,
            contract: QuizGame::new(config.contract_address, provider),
        })
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub async fn register(&self, name: &str) -> IndexerResult<B256> {
        let pending = self
            .contract
            .register(name.to_string())
            .send()
            .await
            .map_err(classify_contract)?;
        self.finish("register", pending).await
    }

    pub async fn add_question(
        &self,
        text: &str,
        options: [String; 4],
        answer_hash: B256,
    ) -> IndexerResult<B256> {
        let pending = self
            .contract
            .addQuestion(text.to_string(), options, answer_hash)
            .send()
            .await
            .map_err(classify_contract)?;
        self.finish("addQuestion", pending).await
    }

    pub async fn reveal_answer(
        &self,
        question_id: u64,
        correct_index: u8,
        salt: B256,
    ) -> IndexerResult<B256> {
        let pending = self
            .contract
            .revealAnswer(U256::from(question_id), correct_index, salt)
            .send()
            .await
            .map_err(classify_contract)?;
        self.finish("revealAnswer", pending).await
    }

    pub async fn submit_answer(&self, question_id: u64, answer_index: u8) -> IndexerResult<B256> {
        let pending = self
            .contract
            .submitAnswer(U256::from(question_id), answer_index)
            .send()
            .await
            .map_err(classify_contract)?;
        self.finish("submitAnswer", pending).await
    }

    pub async fn question_count(&self) -> IndexerResult<u64> {
        let count = self
            .contract
            .questionCount()
            .call()
            .await
            .map_err(classify_contract)?;
        Ok(u256_to_u64(count)?)
    }

    async fn finish(
        &self,
        call: &'static str,
        pending: alloy::providers::PendingTransactionBuilder<alloy::network::Ethereum>,
    ) -> IndexerResult<B256> {
        let tx_hash = *pending.tx_hash();
        info!(call, %tx_hash, "transaction sent");
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transport(format!("{call} pending failed: {e}")))?;
        if !receipt.status() {
            return Err(ChainError::Revert(format!("{call} reverted in {tx_hash}")).into());
        }
        info!(call, %tx_hash, block = ?receipt.block_number, "transaction mined");
        Ok(tx_hash)
    }
}
