use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] clashcast_store::StoreError),

    #[error("judge error: {0}")]
    Judge(#[from] clashcast_judge::JudgeError),

    #[error("oracle error: {0}")]
    Oracle(#[from] clashcast_oracle::OracleError),

    #[error("battle not found: {0}")]
    BattleNotFound(String),

    /// The battle exists but is past its end time or already
    /// completed. A distinct, non-retryable outcome for callers.
    #[error("battle is not active")]
    BattleNotActive,

    #[error("invalid cast content: {0}")]
    InvalidContent(String),

    #[error("topic source error: {0}")]
    TopicSource(String),

    #[error("moderation error: {0}")]
    Moderation(String),

    #[error("config error: {0}")]
    Config(String),
}

/// Outcome of a join attempt. `AlreadyJoined` is a conflict, not a
/// failure; callers map it to their own 409-style response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}
