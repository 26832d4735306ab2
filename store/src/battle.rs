//! Battle record and storage trait.

use crate::StoreError;
use clashcast_types::{BattleId, BattleStatus, DebateId, Timestamp};
use serde::{Deserialize, Serialize};

/// A time-bounded two-sided debate event.
///
/// Battles are append-only history: they are never physically deleted,
/// and the only status transition is `Active -> Completed`, performed
/// exactly once by whichever sweeper wins the conditional update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub topic: String,
    pub description: String,
    pub category: String,
    /// Talking points for the SUPPORT side.
    pub side_a_points: Vec<String>,
    /// Talking points for the OPPOSE side.
    pub side_b_points: Vec<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub status: BattleStatus,
    /// On-chain escrow debate this battle settles through, if any.
    pub debate_id: Option<DebateId>,
    /// Free-text summary generated at completion.
    pub insights: Option<String>,
}

impl Battle {
    /// Whether the battle accepts joins and casts at `now`.
    /// Both conditions matter: a battle past its end time is closed to
    /// submissions even before the sweep flips its status.
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.status.is_active() && !now.has_passed(self.ends_at)
    }

    /// Whether the sweep should complete this battle at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.status.is_active() && now.has_passed(self.ends_at)
    }
}

/// Parameters for creating a battle. The store assigns the id.
#[derive(Clone, Debug)]
pub struct NewBattle {
    pub topic: String,
    pub description: String,
    pub category: String,
    pub side_a_points: Vec<String>,
    pub side_b_points: Vec<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub debate_id: Option<DebateId>,
}

/// Trait for battle storage operations.
pub trait BattleStore {
    /// Insert a new battle as `Active` and return it with its assigned
    /// id. Fails if `ends_at <= starts_at`.
    fn insert_battle(&self, new: NewBattle) -> Result<Battle, StoreError>;

    fn get_battle(&self, id: BattleId) -> Result<Battle, StoreError>;

    /// The most recently started battle that is still `Active`, if any.
    /// Absence is a normal state, not an error.
    fn current_active(&self) -> Result<Option<Battle>, StoreError>;

    /// All `Active` battles whose end time has passed at `now`.
    fn expired_active(&self, now: Timestamp) -> Result<Vec<Battle>, StoreError>;

    /// Conditionally flip `Active -> Completed`. Returns `true` only
    /// for the single caller that performed the flip; every other
    /// concurrent caller sees `false`. This is the ordering anchor for
    /// the whole completion transaction.
    fn complete_battle(&self, id: BattleId) -> Result<bool, StoreError>;

    /// Attach generated insight text to a battle.
    fn set_insights(&self, id: BattleId, insights: String) -> Result<(), StoreError>;

    /// Link a battle to its on-chain escrow debate.
    fn link_debate(&self, id: BattleId, debate: DebateId) -> Result<(), StoreError>;
}
