//! Room-keyed mailbox actor — the REDESIGN named in spec.md §9/§4.G.
//!
//! The teacher's `ws::broadcast::broadcast_room` helper spawns one send
//! task per subscriber per call, so two broadcasts issued back-to-back
//! for the same room race each other on the network: nothing orders
//! the second spawn's sends after the first's. Spec testable property
//! #4 requires every subscriber to observe room events in emission
//! order, so each room instead gets a single task owning an `mpsc`
//! receiver; callers enqueue and return immediately, and the task
//! drains strictly in order, resolving the room's current subscriber
//! set from the Connection Registry at send time.

use axum::extract::ws::Message;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::RoomEvent;
use crate::registry::ConnectionRegistry;

enum Envelope {
    Broadcast(RoomEvent),
    /// `gameStarted` and similar events are per-socket (distinct
    /// payload per recipient) but still must interleave correctly with
    /// room broadcasts, so they go through the same queue.
    Unicast(Uuid, RoomEvent),
}

/// Handle held by callers (the room engine, grace timers, launch
/// service) to enqueue events for a room without ever touching the
/// room's subscriber set directly.
#[derive(Clone)]
pub struct RoomMailboxHandle {
    room_id: Uuid,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl RoomMailboxHandle {
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    /// Enqueue a room-wide broadcast. Stamps nothing itself — the
    /// `room_version` field is expected to already be set by the
    /// caller via `RoomMailbox::next_version`, since only the mailbox
    /// task knows the last version it handed out.
    pub fn broadcast(&self, event: RoomEvent) {
        let _ = self.tx.send(Envelope::Broadcast(event));
    }

    pub fn unicast(&self, socket_id: Uuid, event: RoomEvent) {
        let _ = self.tx.send(Envelope::Unicast(socket_id, event));
    }
}

/// Owns the `mpsc` receiver for one room; `spawn` hands back a
/// `RoomMailboxHandle` and starts the drain task on the current
/// runtime. The room id never changes for the lifetime of a mailbox —
/// a reopened (abandoned→lobby) room gets a fresh mailbox.
pub struct RoomMailbox;

impl RoomMailbox {
    /// Spawns the drain task and returns a handle callers can clone
    /// freely. `registry` resolves the room's current sockets at the
    /// moment each envelope is drained, not at enqueue time, so a
    /// socket that joins mid-flight still gets everything queued after
    /// it registered.
    pub fn spawn(room_id: Uuid, registry: ConnectionRegistry) -> RoomMailboxHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                match envelope {
                    Envelope::Broadcast(event) => {
                        let Ok(json) = serde_json::to_string(&event) else {
                            tracing::error!(room_id = %room_id, "failed to serialize room event");
                            continue;
                        };
                        let sockets = registry.sockets_for_room(room_id).await;
                        for socket_id in sockets {
                            registry
                                .send_to(socket_id, Message::Text(json.clone().into()))
                                .await;
                        }
                    }
                    Envelope::Unicast(socket_id, event) => {
                        let Ok(json) = serde_json::to_string(&event) else {
                            tracing::error!(room_id = %room_id, "failed to serialize room event");
                            continue;
                        };
                        registry.send_to(socket_id, Message::Text(json.into())).await;
                    }
                }
            }
            tracing::debug!(room_id = %room_id, "room mailbox drained, exiting");
        });

        RoomMailboxHandle { room_id, tx }
    }
}

/// Monotonic epoch-millis stamp for `room_version` (spec §4.G). Callers
/// fetch one per outgoing event; wall-clock collisions across distinct
/// events are acceptable since clients only use it to drop stale
/// updates, not to totally order events themselves.
pub fn next_room_version() -> i64 {
    Utc::now().timestamp_millis()
}

/// Owns one `RoomMailboxHandle` per live room id, lazily spawning on
/// first use and dropping the entry (and with it the drain task, once
/// its sender side is gone) when a room is torn down. Held by
/// `AppState` behind a single `Mutex`, the way the teacher holds
/// `ConnectionIndices`.
#[derive(Clone, Default)]
pub struct MailboxRegistry {
    inner: std::sync::Arc<tokio::sync::Mutex<std::collections::HashMap<Uuid, RoomMailboxHandle>>>,
}

impl MailboxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn handle_for(&self, room_id: Uuid, registry: &ConnectionRegistry) -> RoomMailboxHandle {
        let mut inner = self.inner.lock().await;
        inner
            .entry(room_id)
            .or_insert_with(|| RoomMailbox::spawn(room_id, registry.clone()))
            .clone()
    }

    /// Drops this room's mailbox handle; the drain task exits on its
    /// own once the channel's last sender is dropped (spec.md's
    /// abandonment/cleanup sweep calls this).
    pub async fn remove(&self, room_id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner.remove(&room_id);
    }
}
