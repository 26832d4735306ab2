//! Winner record and storage trait.

use crate::StoreError;
use clashcast_types::{Address, BattleId, UserId};
use serde::{Deserialize, Serialize};

/// A judged win, created exactly once per battle at completion time
/// for position 1. The schema allows further positions for future
/// multi-prize battles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleWin {
    pub battle_id: BattleId,
    pub user_id: UserId,
    pub address: Address,
    /// 1 = first place.
    pub position: u32,
    /// Human-readable prize description (e.g. "4 USDC").
    pub prize: String,
}

/// Trait for winner storage operations.
pub trait WinnerStore {
    /// Insert a win row. (battle, position) is a unique constraint:
    /// a second position-1 insert for the same battle must return
    /// [`StoreError::Duplicate`]. Together with the conditional status
    /// flip this guarantees at most one winner per battle.
    fn insert_win(&self, win: BattleWin) -> Result<(), StoreError>;

    fn wins_for_battle(&self, battle: BattleId) -> Result<Vec<BattleWin>, StoreError>;
}
