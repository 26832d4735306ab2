//! Denormalized completion snapshots for fast historical listing.

use crate::StoreError;
use clashcast_types::{Address, BattleId, Timestamp};
use serde::{Deserialize, Serialize};

/// A read-optimized projection written once when a battle completes.
/// Not a source of truth: the battle, cast, and winner tables are.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleHistory {
    pub battle_id: BattleId,
    pub topic: String,
    pub total_participants: u64,
    pub total_casts: u64,
    /// `None` when the battle completed without an eligible winner.
    pub winner_address: Option<Address>,
    pub completed_at: Timestamp,
}

/// Trait for history storage operations.
pub trait HistoryStore {
    /// Insert the snapshot for a completed battle. Unique per battle.
    fn insert_history(&self, history: BattleHistory) -> Result<(), StoreError>;

    /// Most recent snapshots, newest first, at most `limit`.
    fn recent_history(&self, limit: usize) -> Result<Vec<BattleHistory>, StoreError>;
}
