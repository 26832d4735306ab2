//! Participant record and storage trait.

use crate::StoreError;
use clashcast_types::{Address, BattleId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A user's membership in one battle. Unique per (battle, user) and
/// immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub battle_id: BattleId,
    pub user_id: UserId,
    /// Settlement address for payouts.
    pub address: Address,
    pub joined_at: Timestamp,
}

/// Trait for participant storage operations.
pub trait ParticipantStore {
    /// Insert a participant row. The (battle, user) pair is a unique
    /// constraint: a second insert for the same pair must return
    /// [`StoreError::Duplicate`], including under concurrent callers.
    /// This constraint, not a read-then-write, is the join guard.
    fn insert_participant(&self, p: Participant) -> Result<(), StoreError>;

    fn is_participant(&self, battle: BattleId, user: &UserId) -> Result<bool, StoreError>;

    fn participant_count(&self, battle: BattleId) -> Result<u64, StoreError>;

    fn participants_for_battle(&self, battle: BattleId) -> Result<Vec<Participant>, StoreError>;

    /// Look up one participant (for winner address resolution).
    fn get_participant(
        &self,
        battle: BattleId,
        user: &UserId,
    ) -> Result<Option<Participant>, StoreError>;
}
