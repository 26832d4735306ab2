//! The battle lifecycle manager.
//!
//! One instance per process, but nothing here is process-local state:
//! "the current battle" is a store query and every concurrency guard
//! lives in the store (unique-constraint inserts, the conditional
//! status flip), so any number of replicas can run the same code
//! against shared persistence.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use clashcast_broadcast::{Broadcaster, LiveEvent};
use clashcast_judge::Judge;
use clashcast_oracle::PayoutOracle;
use clashcast_store::cast::{NewCast, MAX_CONTENT_CHARS, MIN_CONTENT_CHARS};
use clashcast_store::{Battle, BattleHistory, Cast, Participant, Store};
use clashcast_store::battle::NewBattle;
use clashcast_store::StoreError;
use clashcast_types::{Address, BattleId, CastId, Clock, DebateId, Side, SystemClock, UserId};

use crate::config::EngineConfig;
use crate::error::{EngineError, JoinOutcome};
use crate::metrics::EngineMetrics;
use crate::moderation::Moderator;
use crate::topic::TopicSource;

/// A payout that could not be submitted yet; retried at the start of
/// every sweep. The chain's completed guard makes retries safe.
#[derive(Clone, Debug)]
pub(crate) struct PendingPayout {
    pub battle_id: BattleId,
    pub debate_id: DebateId,
    pub winner: Address,
    pub participants: u64,
}

/// Orchestrates the battle state machine.
pub struct BattleManager {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) topics: Arc<dyn TopicSource>,
    pub(crate) broadcaster: Arc<Broadcaster>,
    pub(crate) judge: Judge,
    pub(crate) moderator: Option<Arc<dyn Moderator>>,
    pub(crate) oracle: Option<Arc<PayoutOracle>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<EngineMetrics>,
    pub(crate) config: EngineConfig,
    pub(crate) pending_payouts: Mutex<Vec<PendingPayout>>,
}

impl BattleManager {
    pub fn new(
        store: Arc<dyn Store>,
        topics: Arc<dyn TopicSource>,
        broadcaster: Arc<Broadcaster>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            topics,
            broadcaster,
            judge: Judge::new(config.selection_method),
            moderator: None,
            oracle: None,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(EngineMetrics::new()),
            config,
            pending_payouts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_moderator(mut self, moderator: Arc<dyn Moderator>) -> Self {
        self.moderator = Some(moderator);
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<PayoutOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }

    // ── Battle creation ─────────────────────────────────────────────────

    /// Create a battle from the next supplied topic, running from now
    /// for the configured duration.
    pub async fn create_battle(&self) -> Result<Battle, EngineError> {
        let brief = self.topics.next_topic().await?;
        let now = self.clock.now();
        let battle = self.store.insert_battle(NewBattle {
            topic: brief.title,
            description: brief.description,
            category: brief.category,
            side_a_points: brief.side_a_points,
            side_b_points: brief.side_b_points,
            starts_at: now,
            ends_at: now.plus_secs(self.config.battle_duration_secs),
            debate_id: None,
        })?;
        info!(battle = %battle.id, topic = %battle.topic, ends_at = %battle.ends_at, "battle created");
        Ok(battle)
    }

    /// Make sure an active battle exists, creating one if needed.
    /// Returns the battle that is now current.
    pub async fn ensure_active_battle(&self) -> Result<Battle, EngineError> {
        if let Some(battle) = self.store.current_active()? {
            return Ok(battle);
        }
        self.create_battle().await
    }

    /// Link a battle to its on-chain escrow debate.
    pub fn link_debate(&self, battle: BattleId, debate: DebateId) -> Result<(), EngineError> {
        self.store.link_debate(battle, debate)?;
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// The most recent active battle, if any. A pure read: even when
    /// the battle's end time has passed, no completion side effects
    /// run here; only the sweep completes battles.
    pub fn current_battle(&self) -> Result<Option<Battle>, EngineError> {
        Ok(self.store.current_active()?)
    }

    pub fn get_casts(&self, battle: BattleId) -> Result<Vec<Cast>, EngineError> {
        Ok(self.store.casts_for_battle(battle)?)
    }

    pub fn get_history(&self, limit: usize) -> Result<Vec<BattleHistory>, EngineError> {
        Ok(self.store.recent_history(limit)?)
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Join a battle. The store's (battle, user) unique constraint is
    /// the concurrency guard: two simultaneous joins by the same user
    /// produce exactly one row, one `Joined`, and one `AlreadyJoined`.
    pub fn join(
        &self,
        battle_id: BattleId,
        user_id: UserId,
        address: Address,
    ) -> Result<JoinOutcome, EngineError> {
        let battle = self.fetch_battle(battle_id)?;
        if !battle.is_open(self.clock.now()) {
            return Err(EngineError::BattleNotActive);
        }

        match self.store.insert_participant(Participant {
            battle_id,
            user_id,
            address,
            joined_at: self.clock.now(),
        }) {
            Ok(()) => {
                self.metrics.joins_accepted.inc();
                Ok(JoinOutcome::Joined)
            }
            Err(StoreError::Duplicate(_)) => Ok(JoinOutcome::AlreadyJoined),
            Err(e) => Err(e.into()),
        }
    }

    /// Submit a cast to one side of a battle.
    ///
    /// Validates content length and liveness, auto-joins the author on
    /// their first cast, appends the cast, and pushes a sentiment
    /// update to live viewers. Submissions arriving after the end time
    /// are rejected outright: the countdown the viewers saw is the
    /// contract, even in the window before the sweep fires.
    pub fn submit_cast(
        &self,
        battle_id: BattleId,
        user_id: UserId,
        side: Side,
        content: String,
        address: Option<Address>,
    ) -> Result<Cast, EngineError> {
        let chars = content.chars().count();
        if !(MIN_CONTENT_CHARS..=MAX_CONTENT_CHARS).contains(&chars) {
            return Err(EngineError::InvalidContent(format!(
                "content must be {MIN_CONTENT_CHARS}-{MAX_CONTENT_CHARS} characters, got {chars}"
            )));
        }

        let battle = self.fetch_battle(battle_id)?;
        let now = self.clock.now();
        if !battle.is_open(now) {
            return Err(EngineError::BattleNotActive);
        }

        // Auto-join on first cast; racing with an explicit join is
        // fine, the duplicate loses silently.
        match self.store.insert_participant(Participant {
            battle_id,
            user_id: user_id.clone(),
            address: address.unwrap_or_else(Address::zero),
            joined_at: now,
        }) {
            Ok(()) => self.metrics.joins_accepted.inc(),
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let cast = self.store.insert_cast(NewCast {
            battle_id,
            user_id,
            side,
            content,
            created_at: now,
        })?;
        self.metrics.casts_submitted.inc();
        debug!(battle = %battle_id, cast = %cast.id, side = %side, "cast accepted");

        self.broadcast_sentiment(battle_id);
        Ok(cast)
    }

    /// Toggle a like on a cast. Returns whether the like exists after
    /// the call.
    pub fn toggle_like(&self, user: UserId, cast: CastId) -> Result<bool, EngineError> {
        Ok(self.store.toggle_like(&user, cast)?)
    }

    // ── Internal helpers ────────────────────────────────────────────────

    pub(crate) fn fetch_battle(&self, id: BattleId) -> Result<Battle, EngineError> {
        match self.store.get_battle(id) {
            Ok(battle) => Ok(battle),
            Err(StoreError::NotFound(what)) => Err(EngineError::BattleNotFound(what)),
            Err(e) => Err(e.into()),
        }
    }

    /// Push current per-side cast tallies to live viewers. Best-effort:
    /// a failed count read only costs the update.
    pub(crate) fn broadcast_sentiment(&self, battle_id: BattleId) {
        let casts = match self.store.casts_for_battle(battle_id) {
            Ok(casts) => casts,
            Err(e) => {
                warn!(battle = %battle_id, error = %e, "sentiment tally failed");
                return;
            }
        };
        let support = casts.iter().filter(|c| c.side == Side::Support).count() as u64;
        let oppose = casts.len() as u64 - support;
        self.broadcaster.broadcast(
            &LiveEvent::SentimentUpdate {
                battle_id,
                support_casts: support,
                oppose_casts: oppose,
            },
            self.clock.now(),
        );
    }
}
