//! Connection registry and fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use clashcast_types::{Clock, Timestamp};

use crate::event::LiveEvent;

/// Identifier of one subscriber connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    sender: mpsc::UnboundedSender<String>,
    connected_at: Timestamp,
    last_activity: Timestamp,
    active: bool,
}

/// Registry of live subscriber connections.
///
/// The lock is only held to snapshot or mutate the registry, never
/// while writing to a connection: each connection has its own
/// unbounded channel drained by a single writer task, which also
/// preserves per-connection message order.
pub struct Broadcaster {
    connections: RwLock<HashMap<u64, Connection>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Add a subscriber. Returns its id and the channel to drain into
    /// the actual transport. The confirmation message is already
    /// queued on the channel when this returns.
    pub fn register(&self, now: Timestamp) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();

        let hello = LiveEvent::Connected { connection_id: id }.to_wire(now);
        // The receiver is still in hand, so this cannot fail.
        let _ = tx.send(hello);

        let mut conns = self.connections.write().expect("registry lock poisoned");
        conns.insert(
            id,
            Connection {
                sender: tx,
                connected_at: now,
                last_activity: now,
                active: true,
            },
        );
        debug!(connection = id, total = conns.len(), "subscriber registered");
        (ConnectionId(id), rx)
    }

    /// Fan an event out to every active connection.
    ///
    /// The payload is serialized once. Any connection whose channel is
    /// closed is evicted immediately (no retry, no queueing). Returns
    /// the number of connections the message was handed to.
    pub fn broadcast(&self, event: &LiveEvent, now: Timestamp) -> usize {
        let wire = event.to_wire(now);

        // Snapshot under the read lock, write outside it.
        let targets: Vec<(u64, mpsc::UnboundedSender<String>)> = {
            let conns = self.connections.read().expect("registry lock poisoned");
            conns
                .iter()
                .filter(|(_, c)| c.active)
                .map(|(id, c)| (*id, c.sender.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        let mut delivered = 0usize;
        for (id, sender) in targets {
            if sender.send(wire.clone()).is_err() {
                dead.push(id);
            } else {
                delivered += 1;
            }
        }

        if !dead.is_empty() {
            let mut conns = self.connections.write().expect("registry lock poisoned");
            for id in &dead {
                conns.remove(id);
            }
            warn!(
                evicted = dead.len(),
                remaining = conns.len(),
                event = event.event_type(),
                "evicted dead subscriber connections"
            );
        }

        trace!(event = event.event_type(), delivered, "broadcast complete");
        delivered
    }

    /// Record activity on a connection (inbound frame from the client).
    pub fn touch(&self, id: ConnectionId, now: Timestamp) {
        let mut conns = self.connections.write().expect("registry lock poisoned");
        if let Some(c) = conns.get_mut(&id.0) {
            c.last_activity = now;
        }
    }

    /// Mark a connection inactive: it stays registered but stops
    /// receiving broadcasts until unregistered.
    pub fn mark_inactive(&self, id: ConnectionId) {
        let mut conns = self.connections.write().expect("registry lock poisoned");
        if let Some(c) = conns.get_mut(&id.0) {
            c.active = false;
            debug!(connection = id.0, "subscriber marked inactive");
        }
    }

    /// Remove a connection entirely.
    pub fn unregister(&self, id: ConnectionId) {
        let mut conns = self.connections.write().expect("registry lock poisoned");
        if conns.remove(&id.0).is_some() {
            debug!(connection = id.0, total = conns.len(), "subscriber unregistered");
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().expect("registry lock poisoned").len()
    }

    /// Seconds since the oldest registered connection was opened.
    /// Diagnostic only.
    pub fn oldest_connection_age(&self, now: Timestamp) -> Option<u64> {
        let conns = self.connections.read().expect("registry lock poisoned");
        conns
            .values()
            .map(|c| now.as_secs().saturating_sub(c.connected_at.as_secs()))
            .max()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the periodic heartbeat task. Runs until the shutdown receiver
/// fires. Clients use the heartbeat to detect silent connection death.
pub fn spawn_heartbeat(
    broadcaster: std::sync::Arc<Broadcaster>,
    clock: std::sync::Arc<dyn Clock>,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    broadcaster.broadcast(&LiveEvent::Heartbeat, clock.now());
                }
                _ = shutdown.recv() => {
                    debug!("heartbeat task stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::new(1_000)
    }

    #[test]
    fn register_sends_confirmation_first() {
        let b = Broadcaster::new();
        let (_id, mut rx) = b.register(now());
        let first = rx.try_recv().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed["type"], "CONNECTED");
        assert_eq!(b.connection_count(), 1);
    }

    #[test]
    fn broadcast_reaches_all_active() {
        let b = Broadcaster::new();
        let (_i1, mut r1) = b.register(now());
        let (_i2, mut r2) = b.register(now());
        r1.try_recv().unwrap();
        r2.try_recv().unwrap();

        let delivered = b.broadcast(&LiveEvent::Heartbeat, now());
        assert_eq!(delivered, 2);
        assert!(r1.try_recv().unwrap().contains("HEARTBEAT"));
        assert!(r2.try_recv().unwrap().contains("HEARTBEAT"));
    }

    #[test]
    fn dead_connection_is_evicted_and_rest_still_served() {
        let b = Broadcaster::new();
        let n = 5;
        let mut receivers = Vec::new();
        for _ in 0..n {
            let (_id, rx) = b.register(now());
            receivers.push(rx);
        }
        // Kill connection 2 by dropping its receiver.
        drop(receivers.remove(2));

        let delivered = b.broadcast(&LiveEvent::Heartbeat, now());
        assert_eq!(delivered, n - 1);
        assert_eq!(b.connection_count(), n - 1);

        // A second broadcast reaches the same survivors.
        let delivered = b.broadcast(&LiveEvent::Heartbeat, now());
        assert_eq!(delivered, n - 1);
    }

    #[test]
    fn inactive_connections_are_skipped_but_kept() {
        let b = Broadcaster::new();
        let (id, mut rx) = b.register(now());
        rx.try_recv().unwrap();

        b.mark_inactive(id);
        let delivered = b.broadcast(&LiveEvent::Heartbeat, now());
        assert_eq!(delivered, 0);
        assert_eq!(b.connection_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unregister_removes() {
        let b = Broadcaster::new();
        let (id, _rx) = b.register(now());
        b.unregister(id);
        assert_eq!(b.connection_count(), 0);
        // Unregistering twice is a no-op.
        b.unregister(id);
    }

    #[test]
    fn per_connection_order_is_preserved() {
        let b = Broadcaster::new();
        let (_id, mut rx) = b.register(now());
        rx.try_recv().unwrap();

        for i in 0..10u64 {
            b.broadcast(
                &LiveEvent::SentimentUpdate {
                    battle_id: clashcast_types::BattleId(1),
                    support_casts: i,
                    oppose_casts: 0,
                },
                now(),
            );
        }
        for i in 0..10u64 {
            let msg = rx.try_recv().unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
            assert_eq!(parsed["data"]["support_casts"], i);
        }
    }

    #[tokio::test]
    async fn heartbeat_task_stops_on_shutdown() {
        let b = std::sync::Arc::new(Broadcaster::new());
        let clock: std::sync::Arc<dyn Clock> =
            std::sync::Arc::new(clashcast_types::SystemClock);
        let (tx, rx) = tokio::sync::broadcast::channel(1);
        let handle = spawn_heartbeat(b, clock, Duration::from_secs(60), rx);
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
