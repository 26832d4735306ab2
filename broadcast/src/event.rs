//! Wire format for live updates.
//!
//! One JSON object per message:
//! `{ "type": "...", "data": {...}, "timestamp": RFC3339 }`.

use clashcast_types::{Address, BattleId, Side, Timestamp};
use serde::Serialize;

/// A message fanned out to every live subscriber.
#[derive(Clone, Debug)]
pub enum LiveEvent {
    /// Connection confirmation, sent to a single new subscriber.
    Connected { connection_id: u64 },
    /// Countdown synchronization for the active battle.
    TimerUpdate {
        battle_id: BattleId,
        ends_at: Timestamp,
        remaining_secs: u64,
    },
    /// Per-side cast tallies, pushed after each submission.
    SentimentUpdate {
        battle_id: BattleId,
        support_casts: u64,
        oppose_casts: u64,
    },
    /// Terminal lifecycle event for a battle.
    BattleCompleted {
        battle_id: BattleId,
        winning_side: Option<Side>,
        winner_address: Option<Address>,
        method: Option<String>,
        prize: Option<String>,
    },
    /// Liveness signal so clients can detect silent connection death.
    Heartbeat,
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    #[serde(rename = "type")]
    event_type: &'a str,
    data: serde_json::Value,
    timestamp: String,
}

impl LiveEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LiveEvent::Connected { .. } => "CONNECTED",
            LiveEvent::TimerUpdate { .. } => "TIMER_UPDATE",
            LiveEvent::SentimentUpdate { .. } => "SENTIMENT_UPDATE",
            LiveEvent::BattleCompleted { .. } => "BATTLE_COMPLETED",
            LiveEvent::Heartbeat => "HEARTBEAT",
        }
    }

    fn data(&self) -> serde_json::Value {
        match self {
            LiveEvent::Connected { connection_id } => {
                serde_json::json!({ "connection_id": connection_id })
            }
            LiveEvent::TimerUpdate {
                battle_id,
                ends_at,
                remaining_secs,
            } => serde_json::json!({
                "battle_id": battle_id,
                "ends_at": ends_at.to_rfc3339(),
                "remaining_secs": remaining_secs,
            }),
            LiveEvent::SentimentUpdate {
                battle_id,
                support_casts,
                oppose_casts,
            } => serde_json::json!({
                "battle_id": battle_id,
                "support_casts": support_casts,
                "oppose_casts": oppose_casts,
            }),
            LiveEvent::BattleCompleted {
                battle_id,
                winning_side,
                winner_address,
                method,
                prize,
            } => serde_json::json!({
                "battle_id": battle_id,
                "winning_side": winning_side,
                "winner_address": winner_address,
                "method": method,
                "prize": prize,
            }),
            LiveEvent::Heartbeat => serde_json::json!({}),
        }
    }

    /// Serialize to the wire envelope, stamped at `now`.
    pub fn to_wire(&self, now: Timestamp) -> String {
        let envelope = WireEnvelope {
            event_type: self.event_type(),
            data: self.data(),
            timestamp: now.to_rfc3339(),
        };
        serde_json::to_string(&envelope)
            .expect("wire envelope serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_has_type_data_timestamp() {
        let event = LiveEvent::TimerUpdate {
            battle_id: BattleId(7),
            ends_at: Timestamp::new(1_700_000_000),
            remaining_secs: 42,
        };
        let wire = event.to_wire(Timestamp::new(1_699_999_958));
        let parsed: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed["type"], "TIMER_UPDATE");
        assert_eq!(parsed["data"]["remaining_secs"], 42);
        assert_eq!(parsed["timestamp"], "2023-11-14T22:12:38+00:00");
    }

    #[test]
    fn completed_event_carries_nulls_when_no_winner() {
        let event = LiveEvent::BattleCompleted {
            battle_id: BattleId(1),
            winning_side: None,
            winner_address: None,
            method: None,
            prize: None,
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&event.to_wire(Timestamp::new(0))).unwrap();
        assert_eq!(parsed["type"], "BATTLE_COMPLETED");
        assert!(parsed["data"]["winner_address"].is_null());
    }

    #[test]
    fn heartbeat_has_empty_data() {
        let parsed: serde_json::Value =
            serde_json::from_str(&LiveEvent::Heartbeat.to_wire(Timestamp::new(0))).unwrap();
        assert_eq!(parsed["type"], "HEARTBEAT");
        assert_eq!(parsed["data"], serde_json::json!({}));
    }
}
