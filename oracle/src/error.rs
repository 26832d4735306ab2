use thiserror::Error;

/// Failures surfaced by the escrow chain (gateway or contract).
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("debate not found: {0}")]
    DebateNotFound(u64),

    /// The contract's completed-debate guard fired. The oracle treats
    /// this as a benign no-op, never a fatal error.
    #[error("debate {0} is already completed")]
    DebateCompleted(u64),

    #[error("signature rejected by the contract")]
    InvalidSignature,

    #[error("payout amount rejected: {0}")]
    InvalidAmount(String),

    /// Network-level failure; retryable.
    #[error("chain transport error: {0}")]
    Transport(String),

    /// The gateway answered with an unexpected status or body.
    #[error("chain gateway error: {0}")]
    Gateway(String),
}

impl ChainError {
    /// Whether a retry on a later sweep can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChainError::Transport(_) | ChainError::Gateway(_))
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("prize computation overflowed")]
    PrizeOverflow,
}
