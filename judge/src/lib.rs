//! Winner selection for completed battles.
//!
//! A pure library: given the topic, the eligible casts, and whatever
//! moderation scores exist, produce exactly one winner with an
//! auditable rationale. No I/O and, apart from the explicitly random
//! method, no nondeterminism: identical inputs rank identically.

pub mod error;
pub mod scoring;
pub mod selection;

pub use error::JudgeError;
pub use scoring::{CandidateScore, CompositeWeights, JudgeCast, ModerationScores};
pub use selection::{Judge, SelectionMethod, SideTotals, Verdict};
