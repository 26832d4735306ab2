//! Cast record and storage trait.

use crate::StoreError;
use clashcast_types::{BattleId, CastId, Side, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Minimum cast content length in characters.
pub const MIN_CONTENT_CHARS: usize = 10;
/// Maximum cast content length in characters.
pub const MAX_CONTENT_CHARS: usize = 140;

/// A single user-submitted argument on one side of a battle.
/// Immutable once created except for the derived like count.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cast {
    pub id: CastId,
    pub battle_id: BattleId,
    pub user_id: UserId,
    pub side: Side,
    pub content: String,
    pub like_count: u64,
    pub created_at: Timestamp,
}

/// Parameters for appending a cast. The store assigns the id.
#[derive(Clone, Debug)]
pub struct NewCast {
    pub battle_id: BattleId,
    pub user_id: UserId,
    pub side: Side,
    pub content: String,
    pub created_at: Timestamp,
}

/// Trait for cast storage operations.
pub trait CastStore {
    /// Append a cast. This is an insert-only path with no
    /// read-modify-write on shared counters, so thousands of
    /// submissions can interleave without lost writes.
    fn insert_cast(&self, new: NewCast) -> Result<Cast, StoreError>;

    fn get_cast(&self, id: CastId) -> Result<Cast, StoreError>;

    /// Casts for a battle in submission order.
    fn casts_for_battle(&self, battle: BattleId) -> Result<Vec<Cast>, StoreError>;

    fn cast_count(&self, battle: BattleId) -> Result<u64, StoreError>;

    /// Toggle the (user, cast) like pair: insert it if absent, remove
    /// it if present, adjusting the cast's like count atomically.
    /// Returns whether the like exists after the call. The pair's
    /// presence is the only like state, there is no separate flag.
    fn toggle_like(&self, user: &UserId, cast: CastId) -> Result<bool, StoreError>;
}
