//! The completion sweep.
//!
//! Runs on a fixed interval, finds expired battles, and drives each
//! through the completion transaction: moderation filter, judging,
//! winner/history writes, live-event fan-out, and payout. All of it is
//! gated on winning the store's conditional status flip, so any number
//! of concurrent sweepers complete a battle exactly once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use clashcast_broadcast::LiveEvent;
use clashcast_judge::{JudgeCast, ModerationScores, Verdict};
use clashcast_oracle::{OracleError, SettleOutcome};
use clashcast_store::{Battle, BattleHistory, BattleWin, Cast};
use clashcast_types::{Address, BattleId, CastId, Side, Timestamp, UserId};

use crate::error::EngineError;
use crate::manager::{BattleManager, PendingPayout};
use crate::moderation::ModerationVerdict;

/// Summary of one completed battle, returned by the sweep.
#[derive(Clone, Debug)]
pub struct CompletedBattle {
    pub battle_id: BattleId,
    pub winner_user: Option<UserId>,
    pub winner_address: Option<Address>,
    pub winning_side: Option<Side>,
    pub method: Option<String>,
}

impl BattleManager {
    /// Complete every expired battle.
    ///
    /// Idempotent under concurrent sweepers: losing the status flip
    /// for a battle skips it silently. One battle's failure never
    /// aborts the others.
    pub async fn sweep_and_complete(&self) -> Result<Vec<CompletedBattle>, EngineError> {
        let started = Instant::now();
        self.metrics.sweep_runs.inc();
        let now = self.clock.now();

        self.retry_pending_payouts().await;

        let expired = self.store.expired_active(now)?;
        let mut completed = Vec::new();
        for battle in expired {
            match self.complete_one(&battle, now).await {
                Ok(Some(summary)) => completed.push(summary),
                Ok(None) => {
                    debug!(battle = %battle.id, "lost completion race, skipping");
                }
                Err(e) => {
                    // Isolate: the next battle still gets its sweep.
                    error!(battle = %battle.id, error = %e, "battle completion failed");
                }
            }
        }

        if self.config.auto_restart {
            if let Err(e) = self.ensure_active_battle().await {
                warn!(error = %e, "could not start the next battle");
            }
        }

        self.metrics
            .active_battles
            .set(self.store.current_active()?.is_some() as i64);
        self.metrics
            .live_connections
            .set(self.broadcaster.connection_count() as i64);
        self.metrics
            .sweep_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        Ok(completed)
    }

    /// The completion transaction for one battle. Returns `None` when
    /// another sweeper won the status flip.
    async fn complete_one(
        &self,
        battle: &Battle,
        now: Timestamp,
    ) -> Result<Option<CompletedBattle>, EngineError> {
        // The ordering anchor: every effect below is causally after a
        // successful flip and never runs for the losing sweeper.
        if !self.store.complete_battle(battle.id)? {
            return Ok(None);
        }
        info!(battle = %battle.id, topic = %battle.topic, "completing battle");

        let casts = self.store.casts_for_battle(battle.id)?;
        let verdicts = self.moderate_casts(battle, &casts).await;
        let eligible: Vec<&Cast> = casts
            .iter()
            .filter(|c| {
                verdicts
                    .get(&c.id)
                    .map(|v| v.is_appropriate)
                    .unwrap_or(true)
            })
            .collect();
        let dropped = casts.len() - eligible.len();
        if dropped > 0 {
            info!(battle = %battle.id, dropped, "moderation dropped casts before judging");
        }

        if eligible.is_empty() {
            let reason = if casts.is_empty() {
                "battle expired with no casts"
            } else {
                "no casts passed moderation"
            };
            return self
                .finish_without_winner(battle, now, reason)
                .map(Some);
        }

        // Judging. A judge failure degrades to "no winner"; the
        // battle must never stay stuck because scoring threw.
        let verdict = match self.run_judge(battle, &eligible, &verdicts) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(battle = %battle.id, error = %e, "judging failed, completing without winner");
                return self
                    .finish_without_winner(battle, now, "judging failed")
                    .map(Some);
            }
        };

        let prize = match battle.debate_id {
            Some(_) => "80% of the escrow pool".to_string(),
            None => "community honors".to_string(),
        };
        if let Err(e) = self.store.insert_win(BattleWin {
            battle_id: battle.id,
            user_id: verdict.winning_user_id.clone(),
            address: verdict.winning_address.clone(),
            position: 1,
            prize,
        }) {
            // Duplicate here means a previous partial completion left
            // a winner behind; keep it and log the anomaly.
            warn!(battle = %battle.id, error = %e, "winner row insert failed");
        }

        let insights = format!(
            "Winner: {} on {} via {}. {}",
            verdict.winning_user_id, verdict.side, verdict.method, verdict.rationale
        );
        if let Err(e) = self.store.set_insights(battle.id, insights) {
            warn!(battle = %battle.id, error = %e, "insight write failed");
        }

        self.write_history(battle, now, Some(verdict.winning_address.clone()))?;

        self.broadcaster.broadcast(
            &LiveEvent::BattleCompleted {
                battle_id: battle.id,
                winning_side: Some(verdict.side),
                winner_address: Some(verdict.winning_address.clone()),
                method: Some(verdict.method.clone()),
                prize: battle.debate_id.map(|_| "80% of the escrow pool".to_string()),
            },
            now,
        );
        self.metrics.battles_completed.inc();

        self.settle_payout(battle, &verdict).await;

        Ok(Some(CompletedBattle {
            battle_id: battle.id,
            winner_user: Some(verdict.winning_user_id),
            winner_address: Some(verdict.winning_address),
            winning_side: Some(verdict.side),
            method: Some(verdict.method),
        }))
    }

    /// Moderate all casts of a battle. Failures degrade per cast to
    /// the permissive fallback verdict; with no moderator configured
    /// the map stays empty and every cast is eligible.
    async fn moderate_casts(
        &self,
        battle: &Battle,
        casts: &[Cast],
    ) -> HashMap<CastId, ModerationVerdict> {
        let mut verdicts = HashMap::new();
        let Some(moderator) = &self.moderator else {
            return verdicts;
        };
        for cast in casts {
            let verdict = match moderator.moderate(&cast.content, &battle.topic).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!(cast = %cast.id, error = %e, "moderation failed, using fallback verdict");
                    ModerationVerdict::fallback()
                }
            };
            verdicts.insert(cast.id, verdict);
        }
        verdicts
    }

    fn run_judge(
        &self,
        battle: &Battle,
        eligible: &[&Cast],
        verdicts: &HashMap<CastId, ModerationVerdict>,
    ) -> Result<Verdict, EngineError> {
        let judge_casts: Vec<JudgeCast> = eligible
            .iter()
            .map(|cast| JudgeCast {
                id: cast.id,
                user_id: cast.user_id.clone(),
                address: self.participant_address(battle.id, &cast.user_id),
                side: cast.side,
                content: cast.content.clone(),
                like_count: cast.like_count,
                created_at: cast.created_at,
            })
            .collect();
        let scores: HashMap<CastId, ModerationScores> = verdicts
            .iter()
            .map(|(id, v)| (*id, v.scores()))
            .collect();
        Ok(self.judge.select(&battle.topic, &judge_casts, &scores)?)
    }

    fn participant_address(&self, battle: BattleId, user: &UserId) -> Address {
        match self.store.get_participant(battle, user) {
            Ok(Some(p)) => p.address,
            _ => Address::zero(),
        }
    }

    fn finish_without_winner(
        &self,
        battle: &Battle,
        now: Timestamp,
        reason: &str,
    ) -> Result<CompletedBattle, EngineError> {
        info!(battle = %battle.id, reason, "completed without winner");
        if let Err(e) = self
            .store
            .set_insights(battle.id, format!("No winner: {reason}."))
        {
            warn!(battle = %battle.id, error = %e, "insight write failed");
        }
        self.write_history(battle, now, None)?;
        self.broadcaster.broadcast(
            &LiveEvent::BattleCompleted {
                battle_id: battle.id,
                winning_side: None,
                winner_address: None,
                method: None,
                prize: None,
            },
            now,
        );
        self.metrics.battles_completed.inc();
        Ok(CompletedBattle {
            battle_id: battle.id,
            winner_user: None,
            winner_address: None,
            winning_side: None,
            method: None,
        })
    }

    fn write_history(
        &self,
        battle: &Battle,
        now: Timestamp,
        winner_address: Option<Address>,
    ) -> Result<(), EngineError> {
        self.store.insert_history(BattleHistory {
            battle_id: battle.id,
            topic: battle.topic.clone(),
            total_participants: self.store.participant_count(battle.id)?,
            total_casts: self.store.cast_count(battle.id)?,
            winner_address,
            completed_at: now,
        })?;
        Ok(())
    }

    /// Attempt on-chain settlement for a judged winner. A chain
    /// failure never un-completes the battle: the payout is queued and
    /// retried at the start of every later sweep.
    async fn settle_payout(&self, battle: &Battle, verdict: &Verdict) {
        let (Some(debate_id), Some(oracle)) = (battle.debate_id, &self.oracle) else {
            return;
        };
        if verdict.winning_address.is_zero() {
            warn!(
                battle = %battle.id,
                user = %verdict.winning_user_id,
                "winner has no settlement address, skipping payout"
            );
            return;
        }
        let participants = self
            .store
            .participant_count(battle.id)
            .unwrap_or_default();

        match oracle
            .settle(debate_id, &verdict.winning_address, participants)
            .await
        {
            Ok(SettleOutcome::Paid(receipt)) => {
                self.metrics.payouts_submitted.inc();
                info!(battle = %battle.id, tx = %receipt.tx_hash, "payout settled");
            }
            Ok(SettleOutcome::AlreadyCompleted) | Ok(SettleOutcome::ZeroPrize) => {}
            Err(OracleError::Chain(e)) if e.is_retryable() => {
                self.metrics.payout_failures.inc();
                warn!(battle = %battle.id, error = %e, "payout failed, queued for retry");
                self.queue_payout(PendingPayout {
                    battle_id: battle.id,
                    debate_id,
                    winner: verdict.winning_address.clone(),
                    participants,
                });
            }
            Err(e) => {
                self.metrics.payout_failures.inc();
                error!(battle = %battle.id, error = %e, "payout failed with non-retryable error");
            }
        }
    }

    fn queue_payout(&self, pending: PendingPayout) {
        self.pending_payouts
            .lock()
            .expect("payout queue lock poisoned")
            .push(pending);
    }

    /// Retry every queued payout once. Still-failing entries go back
    /// on the queue for the next sweep.
    async fn retry_pending_payouts(&self) {
        let Some(oracle) = &self.oracle else { return };
        let pending: Vec<PendingPayout> = {
            let mut queue = self
                .pending_payouts
                .lock()
                .expect("payout queue lock poisoned");
            std::mem::take(&mut *queue)
        };
        for p in pending {
            match oracle.settle(p.debate_id, &p.winner, p.participants).await {
                Ok(SettleOutcome::Paid(receipt)) => {
                    self.metrics.payouts_submitted.inc();
                    info!(battle = %p.battle_id, tx = %receipt.tx_hash, "queued payout settled");
                }
                Ok(_) => {}
                Err(e) => {
                    self.metrics.payout_failures.inc();
                    warn!(battle = %p.battle_id, error = %e, "queued payout still failing");
                    self.queue_payout(p);
                }
            }
        }
    }
}

/// Spawn the periodic sweep task. Runs until shutdown.
pub fn spawn_sweep(
    manager: Arc<BattleManager>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(manager.config.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match manager.sweep_and_complete().await {
                        Ok(completed) if !completed.is_empty() => {
                            info!(count = completed.len(), "sweep completed battles");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "sweep iteration failed"),
                    }
                }
                _ = shutdown.recv() => {
                    debug!("sweep task stopping");
                    break;
                }
            }
        }
    })
}

/// Spawn the periodic timer-sync task: broadcasts the remaining time
/// of the current battle so client countdowns stay accurate without
/// polling.
pub fn spawn_timer_sync(
    manager: Arc<BattleManager>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(manager.config.timer_sync_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = manager.clock.now();
                    match manager.current_battle() {
                        Ok(Some(battle)) => {
                            manager.broadcaster.broadcast(
                                &LiveEvent::TimerUpdate {
                                    battle_id: battle.id,
                                    ends_at: battle.ends_at,
                                    remaining_secs: now.remaining_until(battle.ends_at),
                                },
                                now,
                            );
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "timer sync read failed"),
                    }
                }
                _ = shutdown.recv() => {
                    debug!("timer sync task stopping");
                    break;
                }
            }
        }
    })
}
