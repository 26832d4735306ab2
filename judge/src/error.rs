use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// The caller passed an empty cast list. Zero-cast battles are the
    /// lifecycle manager's responsibility and never reach the judge.
    #[error("no eligible casts to judge")]
    NoEligibleCasts,
}
