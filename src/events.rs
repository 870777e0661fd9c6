//! The event manager: channel registry, subscription sets, per-channel
//! sequence counters, and concurrent fan-out (`spec.md` §4.6).
//!
//! A single `RwLock` covers both the channel table and each channel's
//! subscriber set, per §5's locking discipline ("Channel table and
//! subscriber sets: one mutex covers both, held only for structural
//! mutation and snapshotting — not across I/O"). This collapses the
//! teacher's `_channels[...].Subscribers` / per-connection `_subscriptions`
//! duplication (flagged in §9 REDESIGN FLAGS) into one authoritative map.
//!
//! Each channel additionally carries its own `emit_lock`, held across the
//! full increment-then-fan-out sequence in [`EventManager::emit`]. Two
//! concurrent `emit` calls on the same channel would otherwise be free to
//! race past each other after the atomic increment, delivering seq=2 to a
//! subscriber before seq=1 — this lock is what makes the per-subscriber
//! ordering guarantee in §4.6 hold under concurrent emitters, not just the
//! atomic counter by itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::connection::ConnectionHandle;

struct ChannelState {
    description: Option<String>,
    sequence: AtomicU64,
    subscribers: RwLock<HashMap<String, ConnectionHandle>>,
    // Serializes a channel's increment-then-fan-out sequence end to end, so
    // two concurrent `emit` calls can't have their sends race past each
    // other and deliver seq=2 before seq=1 to the same subscriber.
    emit_lock: tokio::sync::Mutex<()>,
}

/// Channel registry, subscription bookkeeping, and event emission.
pub struct EventManager {
    channels: RwLock<HashMap<String, Arc<ChannelState>>>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `name`, or overwrites its description if already
    /// registered. Re-registration resets neither the sequence counter nor
    /// the subscriber set (`spec.md` §4.6, §9 open question left as stated).
    pub async fn register_channel(&self, name: impl Into<String>, description: Option<String>) {
        let name = name.into();
        let mut channels = self.channels.write().await;
        match channels.get(&name) {
            Some(existing) => {
                // Description is the only mutable field on re-registration;
                // replace the Arc's contents via a fresh state that carries
                // over the counter and subscribers.
                let carried_subscribers = existing.subscribers.read().await.clone();
                let carried = Arc::new(ChannelState {
                    description,
                    sequence: AtomicU64::new(existing.sequence.load(Ordering::SeqCst)),
                    subscribers: RwLock::new(carried_subscribers),
                    emit_lock: tokio::sync::Mutex::new(()),
                });
                channels.insert(name, carried);
            }
            None => {
                channels.insert(
                    name,
                    Arc::new(ChannelState {
                        description,
                        sequence: AtomicU64::new(0),
                        subscribers: RwLock::new(HashMap::new()),
                        emit_lock: tokio::sync::Mutex::new(()),
                    }),
                );
            }
        }
    }

    pub async fn unregister_channel(&self, name: &str) {
        self.channels.write().await.remove(name);
    }

    pub async fn list_channels(&self) -> Vec<String> {
        self.channels.read().await.keys().cloned().collect()
    }

    pub async fn subscriber_count(&self, name: &str) -> usize {
        match self.channels.read().await.get(name) {
            Some(state) => state.subscribers.read().await.len(),
            None => 0,
        }
    }

    /// Adds `connection` as a subscriber to each channel in `names` that
    /// exists. Returns the subset that exist, in the order given.
    pub async fn subscribe(&self, connection: &ConnectionHandle, names: &[String]) -> Vec<String> {
        let channels = self.channels.read().await;
        let mut subscribed = Vec::with_capacity(names.len());
        for name in names {
            if let Some(state) = channels.get(name) {
                state
                    .subscribers
                    .write()
                    .await
                    .insert(connection.id().to_owned(), connection.clone());
                subscribed.push(name.clone());
            }
        }
        subscribed
    }

    /// Removes `connection` from each channel in `names`. Returns the
    /// subset from which the connection was actually removed.
    pub async fn unsubscribe(&self, connection_id: &str, names: &[String]) -> Vec<String> {
        let channels = self.channels.read().await;
        let mut unsubscribed = Vec::with_capacity(names.len());
        for name in names {
            if let Some(state) = channels.get(name) {
                if state
                    .subscribers
                    .write()
                    .await
                    .remove(connection_id)
                    .is_some()
                {
                    unsubscribed.push(name.clone());
                }
            }
        }
        unsubscribed
    }

    /// Removes `connection_id` from every channel. Run exactly once per
    /// connection, from its disconnect hook (`spec.md` §8 property 4).
    pub async fn on_disconnect(&self, connection_id: &str) {
        let channels = self.channels.read().await;
        for state in channels.values() {
            state.subscribers.write().await.remove(connection_id);
        }
    }

    /// Publishes `payload` on `channel`. A no-op if `channel` is not
    /// registered. Returns the assigned `seq`, or `None` for the no-op case.
    pub async fn emit(
        &self,
        channel: &str,
        payload: Value,
        timestamp: Option<String>,
    ) -> Option<u64> {
        let state = self.channels.read().await.get(channel).cloned()?;

        // Held across the whole increment-through-enqueue sequence: without
        // it, two concurrent `emit` calls can interleave their sends so a
        // subscriber observes seq=2 before seq=1 (spec.md §4.6 ordering
        // guarantee).
        let _emit_guard = state.emit_lock.lock().await;

        // Post-increment: the first ever event on a channel carries seq=1.
        let seq = state.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let timestamp = timestamp.or_else(|| Some(Utc::now().to_rfc3339()));
        let message =
            gabp_protocol::Message::event(channel.to_owned(), seq, payload, timestamp);

        // Snapshot under the lock, then fan out without holding it.
        let snapshot: Vec<ConnectionHandle> = {
            let subscribers = state.subscribers.read().await;
            subscribers.values().cloned().collect()
        };

        let sends = snapshot.iter().map(|conn| {
            let message = message.clone();
            async move {
                if !conn.is_connected() || !conn.send(message) {
                    warn!(connection_id = conn.id(), channel, "dropping disconnected subscriber");
                    return Some(conn.id().to_owned());
                }
                None
            }
        });

        let stale: Vec<String> = join_all(sends).await.into_iter().flatten().collect();
        for connection_id in stale {
            self.on_disconnect(&connection_id).await;
        }

        Some(seq)
    }
}
