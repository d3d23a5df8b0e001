use quiz_rules::RulesError;

/// Provider-side failure, classified so callers can react to the
/// recoverable classes (oversized range, rate limit).
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ChainError {
    #[error("block range too large: {0}")]
    RangeTooLarge(String),
    #[error("rpc rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("contract reverted: {0}")]
    Revert(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("abi decode failed: {0}")]
    Decode(String),
    #[error("numeric value does not fit in 64 bits: {0}")]
    Overflow(String),
}

pub const RPC_CODE_LIMIT_EXCEEDED: i64 = -32005;
pub const RPC_CODE_INVALID_REQUEST: i64 = -32600;

impl ChainError {
    /// Classify a JSON-RPC error payload.
    pub fn from_rpc(code: i64, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if code == RPC_CODE_LIMIT_EXCEEDED {
            return ChainError::RateLimited(message.to_string());
        }
        if code == RPC_CODE_INVALID_REQUEST || lower.contains("block range") {
            return ChainError::RangeTooLarge(message.to_string());
        }
        if lower.contains("execution reverted") || lower.contains("revert") {
            return ChainError::Revert(message.to_string());
        }
        ChainError::Transport(format!("rpc error {code}: {message}"))
    }
}

/// Known `QuizGame` custom errors, with the text shown to a player.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RevertReason {
    #[error("This address is already registered.")]
    AlreadyRegistered,
    #[error("Name must not be empty.")]
    EmptyName,
    #[error("Register a name before playing.")]
    NotRegistered,
    #[error("You have already answered this question.")]
    AlreadyAnswered,
    #[error("This question has not been revealed yet. Wait for the creator to reveal the answer.")]
    QuestionNotRevealed,
    #[error("The revealed answer and salt do not match the committed hash.")]
    InvalidAnswer,
    #[error("Transaction reverted: {0}")]
    Other(String),
}

impl RevertReason {
    pub fn from_message(message: &str) -> Self {
        const KNOWN: [(&str, RevertReason); 6] = [
            ("AlreadyRegistered", RevertReason::AlreadyRegistered),
            ("EmptyName", RevertReason::EmptyName),
            ("NotRegistered", RevertReason::NotRegistered),
            ("AlreadyAnswered", RevertReason::AlreadyAnswered),
            ("QuestionNotRevealed", RevertReason::QuestionNotRevealed),
            ("InvalidAnswer", RevertReason::InvalidAnswer),
        ];
        KNOWN
            .into_iter()
            .find(|(name, _)| message.contains(name))
            .map(|(_, reason)| reason)
            .unwrap_or_else(|| RevertReason::Other(message.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("{0} is not configured")]
    MissingConfig(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
    #[error("RPC rate limit exceeded. Retry later or configure a dedicated RPC key.")]
    RateLimited,
    #[error(transparent)]
    Chain(ChainError),
    #[error(transparent)]
    Revert(#[from] RevertReason),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error("signer error: {0}")]
    Signer(String),
}

impl IndexerError {
    /// Lift a chain error, keeping rate limiting and reverts distinguishable.
    pub fn from_chain(err: ChainError) -> Self {
        match err {
            ChainError::RateLimited(_) => IndexerError::RateLimited,
            ChainError::Revert(msg) => IndexerError::Revert(RevertReason::from_message(&msg)),
            other => IndexerError::Chain(other),
        }
    }
}

impl From<ChainError> for IndexerError {
    fn from(err: ChainError) -> Self {
        IndexerError::from_chain(err)
    }
}

pub type IndexerResult<T> = Result<T, IndexerError>;
