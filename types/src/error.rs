use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid side: {0} (expected SUPPORT or OPPOSE)")]
    InvalidSide(String),

    #[error("amount overflow")]
    AmountOverflow,
}
