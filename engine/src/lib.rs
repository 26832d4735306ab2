//! Battle lifecycle orchestration.
//!
//! The engine owns the `Active -> Completed` state machine: it creates
//! battles from supplied topics, accepts joins and casts while the
//! timer runs, sweeps expired battles on a fixed interval, judges
//! winners, writes history, fans out live events, and hands judged
//! winners to the payout oracle. Every process instance is stateless:
//! "the current battle" is a store query, and concurrent sweepers are
//! arbitrated by the store's conditional status flip.

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod moderation;
pub mod shutdown;
pub mod sweep;
pub mod topic;

pub use config::EngineConfig;
pub use error::{EngineError, JoinOutcome};
pub use manager::BattleManager;
pub use metrics::EngineMetrics;
pub use moderation::{Moderator, ModerationVerdict};
pub use shutdown::ShutdownController;
pub use sweep::{spawn_sweep, spawn_timer_sync, CompletedBattle};
pub use topic::{TopicBrief, TopicSource};
