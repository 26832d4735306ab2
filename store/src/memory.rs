//! Thread-safe in-memory store, the reference backend.
//!
//! Every trait method takes a lock, performs its read-or-mutate, and
//! releases; the unique-constraint and conditional-update guarantees
//! hold because the check and the write happen under the same lock.
//! Suitable for tests, development, and single-node deployments; a
//! database backend implements the same traits for anything larger.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use clashcast_types::{BattleId, BattleStatus, CastId, DebateId, Timestamp, UserId};

use crate::battle::{Battle, BattleStore, NewBattle};
use crate::cast::{Cast, CastStore, NewCast};
use crate::history::{BattleHistory, HistoryStore};
use crate::participant::{Participant, ParticipantStore};
use crate::winner::{BattleWin, WinnerStore};
use crate::StoreError;

#[derive(Default)]
struct BattleTable {
    rows: BTreeMap<u64, Battle>,
    next_id: u64,
}

#[derive(Default)]
struct CastTable {
    rows: BTreeMap<u64, Cast>,
    by_battle: HashMap<u64, Vec<u64>>,
    /// (user, cast) like pairs; presence is the only like state.
    likes: HashSet<(String, u64)>,
    next_id: u64,
}

/// In-memory implementation of every store trait.
pub struct MemoryStore {
    battles: Mutex<BattleTable>,
    participants: Mutex<HashMap<(u64, String), Participant>>,
    casts: Mutex<CastTable>,
    winners: Mutex<HashMap<(u64, u32), BattleWin>>,
    history: Mutex<Vec<BattleHistory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            battles: Mutex::new(BattleTable::default()),
            participants: Mutex::new(HashMap::new()),
            casts: Mutex::new(CastTable::default()),
            winners: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    fn lock_poisoned(what: &str) -> StoreError {
        StoreError::Backend(format!("{what} lock poisoned"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BattleStore for MemoryStore {
    fn insert_battle(&self, new: NewBattle) -> Result<Battle, StoreError> {
        if new.ends_at <= new.starts_at {
            return Err(StoreError::Backend(
                "battle end time must be after start time".into(),
            ));
        }
        let mut table = self
            .battles
            .lock()
            .map_err(|_| Self::lock_poisoned("battles"))?;
        table.next_id += 1;
        let battle = Battle {
            id: BattleId(table.next_id),
            topic: new.topic,
            description: new.description,
            category: new.category,
            side_a_points: new.side_a_points,
            side_b_points: new.side_b_points,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            status: BattleStatus::Active,
            debate_id: new.debate_id,
            insights: None,
        };
        table.rows.insert(battle.id.0, battle.clone());
        Ok(battle)
    }

    fn get_battle(&self, id: BattleId) -> Result<Battle, StoreError> {
        self.battles
            .lock()
            .map_err(|_| Self::lock_poisoned("battles"))?
            .rows
            .get(&id.0)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn current_active(&self) -> Result<Option<Battle>, StoreError> {
        let table = self
            .battles
            .lock()
            .map_err(|_| Self::lock_poisoned("battles"))?;
        Ok(table
            .rows
            .values()
            .rev()
            .find(|b| b.status.is_active())
            .cloned())
    }

    fn expired_active(&self, now: Timestamp) -> Result<Vec<Battle>, StoreError> {
        let table = self
            .battles
            .lock()
            .map_err(|_| Self::lock_poisoned("battles"))?;
        Ok(table
            .rows
            .values()
            .filter(|b| b.is_expired(now))
            .cloned()
            .collect())
    }

    fn complete_battle(&self, id: BattleId) -> Result<bool, StoreError> {
        let mut table = self
            .battles
            .lock()
            .map_err(|_| Self::lock_poisoned("battles"))?;
        let battle = table
            .rows
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if battle.status != BattleStatus::Active {
            return Ok(false);
        }
        battle.status = BattleStatus::Completed;
        Ok(true)
    }

    fn set_insights(&self, id: BattleId, insights: String) -> Result<(), StoreError> {
        let mut table = self
            .battles
            .lock()
            .map_err(|_| Self::lock_poisoned("battles"))?;
        let battle = table
            .rows
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        battle.insights = Some(insights);
        Ok(())
    }

    fn link_debate(&self, id: BattleId, debate: DebateId) -> Result<(), StoreError> {
        let mut table = self
            .battles
            .lock()
            .map_err(|_| Self::lock_poisoned("battles"))?;
        let battle = table
            .rows
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        battle.debate_id = Some(debate);
        Ok(())
    }
}

impl ParticipantStore for MemoryStore {
    fn insert_participant(&self, p: Participant) -> Result<(), StoreError> {
        let key = (p.battle_id.0, p.user_id.as_str().to_string());
        let mut rows = self
            .participants
            .lock()
            .map_err(|_| Self::lock_poisoned("participants"))?;
        if rows.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "{} already joined {}",
                p.user_id, p.battle_id
            )));
        }
        rows.insert(key, p);
        Ok(())
    }

    fn is_participant(&self, battle: BattleId, user: &UserId) -> Result<bool, StoreError> {
        let rows = self
            .participants
            .lock()
            .map_err(|_| Self::lock_poisoned("participants"))?;
        Ok(rows.contains_key(&(battle.0, user.as_str().to_string())))
    }

    fn participant_count(&self, battle: BattleId) -> Result<u64, StoreError> {
        let rows = self
            .participants
            .lock()
            .map_err(|_| Self::lock_poisoned("participants"))?;
        Ok(rows.keys().filter(|(b, _)| *b == battle.0).count() as u64)
    }

    fn participants_for_battle(&self, battle: BattleId) -> Result<Vec<Participant>, StoreError> {
        let rows = self
            .participants
            .lock()
            .map_err(|_| Self::lock_poisoned("participants"))?;
        let mut out: Vec<Participant> = rows
            .values()
            .filter(|p| p.battle_id == battle)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.joined_at);
        Ok(out)
    }

    fn get_participant(
        &self,
        battle: BattleId,
        user: &UserId,
    ) -> Result<Option<Participant>, StoreError> {
        let rows = self
            .participants
            .lock()
            .map_err(|_| Self::lock_poisoned("participants"))?;
        Ok(rows.get(&(battle.0, user.as_str().to_string())).cloned())
    }
}

impl CastStore for MemoryStore {
    fn insert_cast(&self, new: NewCast) -> Result<Cast, StoreError> {
        let mut table = self
            .casts
            .lock()
            .map_err(|_| Self::lock_poisoned("casts"))?;
        table.next_id += 1;
        let cast = Cast {
            id: CastId(table.next_id),
            battle_id: new.battle_id,
            user_id: new.user_id,
            side: new.side,
            content: new.content,
            like_count: 0,
            created_at: new.created_at,
        };
        table.rows.insert(cast.id.0, cast.clone());
        table
            .by_battle
            .entry(new.battle_id.0)
            .or_default()
            .push(cast.id.0);
        Ok(cast)
    }

    fn get_cast(&self, id: CastId) -> Result<Cast, StoreError> {
        self.casts
            .lock()
            .map_err(|_| Self::lock_poisoned("casts"))?
            .rows
            .get(&id.0)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn casts_for_battle(&self, battle: BattleId) -> Result<Vec<Cast>, StoreError> {
        let table = self
            .casts
            .lock()
            .map_err(|_| Self::lock_poisoned("casts"))?;
        let ids = table.by_battle.get(&battle.0).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| table.rows.get(id).cloned())
            .collect())
    }

    fn cast_count(&self, battle: BattleId) -> Result<u64, StoreError> {
        let table = self
            .casts
            .lock()
            .map_err(|_| Self::lock_poisoned("casts"))?;
        Ok(table
            .by_battle
            .get(&battle.0)
            .map(|v| v.len() as u64)
            .unwrap_or(0))
    }

    fn toggle_like(&self, user: &UserId, cast: CastId) -> Result<bool, StoreError> {
        let mut table = self
            .casts
            .lock()
            .map_err(|_| Self::lock_poisoned("casts"))?;
        if !table.rows.contains_key(&cast.0) {
            return Err(StoreError::NotFound(cast.to_string()));
        }
        let key = (user.as_str().to_string(), cast.0);
        let liked_now = if table.likes.remove(&key) {
            false
        } else {
            table.likes.insert(key);
            true
        };
        if let Some(row) = table.rows.get_mut(&cast.0) {
            row.like_count = if liked_now {
                row.like_count + 1
            } else {
                row.like_count.saturating_sub(1)
            };
        }
        Ok(liked_now)
    }
}

impl WinnerStore for MemoryStore {
    fn insert_win(&self, win: BattleWin) -> Result<(), StoreError> {
        let key = (win.battle_id.0, win.position);
        let mut rows = self
            .winners
            .lock()
            .map_err(|_| Self::lock_poisoned("winners"))?;
        if rows.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "{} already has a position-{} winner",
                win.battle_id, win.position
            )));
        }
        rows.insert(key, win);
        Ok(())
    }

    fn wins_for_battle(&self, battle: BattleId) -> Result<Vec<BattleWin>, StoreError> {
        let rows = self
            .winners
            .lock()
            .map_err(|_| Self::lock_poisoned("winners"))?;
        let mut out: Vec<BattleWin> = rows
            .values()
            .filter(|w| w.battle_id == battle)
            .cloned()
            .collect();
        out.sort_by_key(|w| w.position);
        Ok(out)
    }
}

impl HistoryStore for MemoryStore {
    fn insert_history(&self, history: BattleHistory) -> Result<(), StoreError> {
        let mut rows = self
            .history
            .lock()
            .map_err(|_| Self::lock_poisoned("history"))?;
        if rows.iter().any(|h| h.battle_id == history.battle_id) {
            return Err(StoreError::Duplicate(format!(
                "history already written for {}",
                history.battle_id
            )));
        }
        rows.push(history);
        Ok(())
    }

    fn recent_history(&self, limit: usize) -> Result<Vec<BattleHistory>, StoreError> {
        let rows = self
            .history
            .lock()
            .map_err(|_| Self::lock_poisoned("history"))?;
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clashcast_types::{Address, Side};

    fn new_battle(starts: u64, ends: u64) -> NewBattle {
        NewBattle {
            topic: "Test topic".into(),
            description: "desc".into(),
            category: "tech".into(),
            side_a_points: vec!["a".into()],
            side_b_points: vec!["b".into()],
            starts_at: Timestamp::new(starts),
            ends_at: Timestamp::new(ends),
            debate_id: None,
        }
    }

    fn participant(battle: BattleId, user: &str, joined: u64) -> Participant {
        Participant {
            battle_id: battle,
            user_id: UserId::new(user),
            address: Address::from_bytes([1; 20]),
            joined_at: Timestamp::new(joined),
        }
    }

    #[test]
    fn battle_ids_are_sequential() {
        let store = MemoryStore::new();
        let b1 = store.insert_battle(new_battle(0, 100)).unwrap();
        let b2 = store.insert_battle(new_battle(0, 100)).unwrap();
        assert_eq!(b1.id, BattleId(1));
        assert_eq!(b2.id, BattleId(2));
    }

    #[test]
    fn rejects_inverted_time_range() {
        let store = MemoryStore::new();
        assert!(store.insert_battle(new_battle(100, 100)).is_err());
        assert!(store.insert_battle(new_battle(100, 50)).is_err());
    }

    #[test]
    fn current_active_prefers_latest() {
        let store = MemoryStore::new();
        let b1 = store.insert_battle(new_battle(0, 100)).unwrap();
        let b2 = store.insert_battle(new_battle(10, 100)).unwrap();
        assert_eq!(store.current_active().unwrap().unwrap().id, b2.id);

        assert!(store.complete_battle(b2.id).unwrap());
        assert_eq!(store.current_active().unwrap().unwrap().id, b1.id);
        assert!(store.complete_battle(b1.id).unwrap());
        assert!(store.current_active().unwrap().is_none());
    }

    #[test]
    fn complete_battle_flips_exactly_once() {
        let store = MemoryStore::new();
        let b = store.insert_battle(new_battle(0, 100)).unwrap();
        assert!(store.complete_battle(b.id).unwrap());
        assert!(!store.complete_battle(b.id).unwrap());
        assert_eq!(
            store.get_battle(b.id).unwrap().status,
            BattleStatus::Completed
        );
    }

    #[test]
    fn complete_battle_race_has_single_winner() {
        use std::sync::Arc;
        let store = Arc::new(MemoryStore::new());
        let b = store.insert_battle(new_battle(0, 100)).unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                store.complete_battle(b.id).unwrap()
            }));
        }
        let flips = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(flips, 1);
    }

    #[test]
    fn duplicate_join_rejected() {
        let store = MemoryStore::new();
        let b = store.insert_battle(new_battle(0, 100)).unwrap();
        store.insert_participant(participant(b.id, "alice", 1)).unwrap();
        let err = store
            .insert_participant(participant(b.id, "alice", 2))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.participant_count(b.id).unwrap(), 1);
    }

    #[test]
    fn same_user_may_join_different_battles() {
        let store = MemoryStore::new();
        let b1 = store.insert_battle(new_battle(0, 100)).unwrap();
        let b2 = store.insert_battle(new_battle(0, 100)).unwrap();
        store.insert_participant(participant(b1.id, "alice", 1)).unwrap();
        store.insert_participant(participant(b2.id, "alice", 1)).unwrap();
        assert!(store.is_participant(b1.id, &UserId::new("alice")).unwrap());
        assert!(store.is_participant(b2.id, &UserId::new("alice")).unwrap());
    }

    #[test]
    fn casts_preserve_submission_order() {
        let store = MemoryStore::new();
        let b = store.insert_battle(new_battle(0, 100)).unwrap();
        for i in 0..3u64 {
            store
                .insert_cast(NewCast {
                    battle_id: b.id,
                    user_id: UserId::new(format!("user{i}")),
                    side: Side::Support,
                    content: format!("argument number {i}"),
                    created_at: Timestamp::new(10 + i),
                })
                .unwrap();
        }
        let casts = store.casts_for_battle(b.id).unwrap();
        assert_eq!(casts.len(), 3);
        assert!(casts.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(store.cast_count(b.id).unwrap(), 3);
    }

    #[test]
    fn like_toggle_roundtrip() {
        let store = MemoryStore::new();
        let b = store.insert_battle(new_battle(0, 100)).unwrap();
        let cast = store
            .insert_cast(NewCast {
                battle_id: b.id,
                user_id: UserId::new("alice"),
                side: Side::Oppose,
                content: "a decent argument".into(),
                created_at: Timestamp::new(5),
            })
            .unwrap();

        let bob = UserId::new("bob");
        assert!(store.toggle_like(&bob, cast.id).unwrap());
        assert_eq!(store.get_cast(cast.id).unwrap().like_count, 1);
        assert!(!store.toggle_like(&bob, cast.id).unwrap());
        assert_eq!(store.get_cast(cast.id).unwrap().like_count, 0);
    }

    #[test]
    fn like_unknown_cast_is_not_found() {
        let store = MemoryStore::new();
        let err = store.toggle_like(&UserId::new("bob"), CastId(99)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn duplicate_position_one_win_rejected() {
        let store = MemoryStore::new();
        let b = store.insert_battle(new_battle(0, 100)).unwrap();
        let win = BattleWin {
            battle_id: b.id,
            user_id: UserId::new("alice"),
            address: Address::from_bytes([2; 20]),
            position: 1,
            prize: "4 USDC".into(),
        };
        store.insert_win(win.clone()).unwrap();
        assert!(matches!(
            store.insert_win(win).unwrap_err(),
            StoreError::Duplicate(_)
        ));
    }

    #[test]
    fn history_is_newest_first_and_unique() {
        let store = MemoryStore::new();
        for i in 1..=3u64 {
            store
                .insert_history(BattleHistory {
                    battle_id: BattleId(i),
                    topic: format!("topic {i}"),
                    total_participants: i,
                    total_casts: i * 2,
                    winner_address: None,
                    completed_at: Timestamp::new(i * 100),
                })
                .unwrap();
        }
        let recent = store.recent_history(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].battle_id, BattleId(3));
        assert_eq!(recent[1].battle_id, BattleId(2));

        let dup = store.insert_history(BattleHistory {
            battle_id: BattleId(1),
            topic: "again".into(),
            total_participants: 0,
            total_casts: 0,
            winner_address: None,
            completed_at: Timestamp::new(999),
        });
        assert!(matches!(dup.unwrap_err(), StoreError::Duplicate(_)));
    }

    #[test]
    fn expired_active_filters_by_deadline() {
        let store = MemoryStore::new();
        let b1 = store.insert_battle(new_battle(0, 50)).unwrap();
        let _b2 = store.insert_battle(new_battle(0, 200)).unwrap();
        let expired = store.expired_active(Timestamp::new(100)).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, b1.id);
    }
}
