use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

const LOCK_TTL: Duration = Duration::from_secs(30);
const STALE_THRESHOLD: Duration = Duration::from_secs(5 * 60);
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Actions the per-socket rate limiter tracks separately (spec §4.C).
/// Anything not listed here falls back to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitedAction {
    CreateRoom,
    JoinRoom,
    SendMessage,
    StartGame,
    Default,
}

impl RateLimitedAction {
    fn max_per_minute(self) -> u32 {
        match self {
            RateLimitedAction::CreateRoom => 5,
            RateLimitedAction::JoinRoom => 10,
            RateLimitedAction::SendMessage => 30,
            RateLimitedAction::StartGame => 3,
            RateLimitedAction::Default => 60,
        }
    }
}

/// `{socketId, userId?, roomId?, roomCode?, lastActivity, lastDBUpdate?}`
/// (spec §3's "Connection" entity). Transient, in-memory only — never
/// persisted.
#[derive(Debug, Clone)]
pub struct Connection {
    pub socket_id: Uuid,
    pub user_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub room_code: Option<String>,
    pub last_activity: Instant,
    /// Open Question (c): a first-class field rather than an ad hoc
    /// attachment, updated whenever the presence throttle (§4.E) commits
    /// a heartbeat write to Postgres.
    pub last_db_update: Option<DateTime<Utc>>,
}

impl Connection {
    fn new(socket_id: Uuid) -> Self {
        Self {
            socket_id,
            user_id: None,
            room_id: None,
            room_code: None,
            last_activity: Instant::now(),
            last_db_update: None,
        }
    }
}

#[derive(Debug, Default)]
struct LockTable {
    // keyed on (name, room_code); value is (holder socket, expiry).
    locks: HashMap<(String, String), (Uuid, Instant)>,
}

#[derive(Debug, Default)]
struct RateTable {
    // socket -> action -> timestamps within the sliding window.
    attempts: HashMap<Uuid, HashMap<RateLimitedAction, Vec<Instant>>>,
}

#[derive(Default)]
struct Inner {
    by_socket: HashMap<Uuid, Connection>,
    by_user: HashMap<Uuid, HashSet<Uuid>>,
    by_room: HashMap<Uuid, HashSet<Uuid>>,
    locks: LockTable,
    rates: RateTable,
    senders: HashMap<Uuid, mpsc::UnboundedSender<Message>>,
}

/// Process-wide registry: socket↔user↔room maps, advisory join locks,
/// and per-socket rate-limit counters (spec §4.C). Cheaply `Clone`-able;
/// all mutation goes through the single internal `Mutex`.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: std::sync::Arc<Mutex<Inner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a socket along with the channel the WebSocket write
    /// task drains — the in-process analogue of the teacher's
    /// `ConnectionInfo::sender`, minus the shared-mutex-around-a-sink
    /// indirection since each socket owns exactly one writer task here.
    pub async fn register(&self, socket_id: Uuid, sender: mpsc::UnboundedSender<Message>) {
        let mut inner = self.inner.lock().await;
        inner.by_socket.insert(socket_id, Connection::new(socket_id));
        inner.senders.insert(socket_id, sender);
    }

    pub async fn unregister(&self, socket_id: Uuid) -> Option<Connection> {
        let mut inner = self.inner.lock().await;
        let conn = inner.by_socket.remove(&socket_id)?;
        inner.senders.remove(&socket_id);
        if let Some(user_id) = conn.user_id {
            if let Some(set) = inner.by_user.get_mut(&user_id) {
                set.remove(&socket_id);
                if set.is_empty() {
                    inner.by_user.remove(&user_id);
                }
            }
        }
        if let Some(room_id) = conn.room_id {
            if let Some(set) = inner.by_room.get_mut(&room_id) {
                set.remove(&socket_id);
                if set.is_empty() {
                    inner.by_room.remove(&room_id);
                }
            }
        }
        Some(conn)
    }

    /// Best-effort direct send to one socket's write task; a closed or
    /// unknown socket is silently dropped (the socket is already gone or
    /// about to be reaped by the stale sweep).
    pub async fn send_to(&self, socket_id: Uuid, message: Message) {
        let inner = self.inner.lock().await;
        if let Some(sender) = inner.senders.get(&socket_id) {
            let _ = sender.send(message);
        }
    }

    pub async fn bind_identity(&self, socket_id: Uuid, user_id: Uuid) {
        let mut inner = self.inner.lock().await;
        if let Some(conn) = inner.by_socket.get_mut(&socket_id) {
            conn.user_id = Some(user_id);
        }
        inner.by_user.entry(user_id).or_default().insert(socket_id);
    }

    pub async fn bind_room(&self, socket_id: Uuid, room_id: Uuid, room_code: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(conn) = inner.by_socket.get_mut(&socket_id) {
            conn.room_id = Some(room_id);
            conn.room_code = Some(room_code.to_string());
        }
        inner.by_room.entry(room_id).or_default().insert(socket_id);
    }

    /// Clears a socket's room binding without dropping the connection
    /// itself — used when a player is kicked or explicitly leaves a
    /// room but keeps the socket open (e.g. to browse other rooms).
    pub async fn unbind_room(&self, socket_id: Uuid) {
        let mut inner = self.inner.lock().await;
        let room_id = inner.by_socket.get_mut(&socket_id).and_then(|conn| {
            conn.room_code = None;
            conn.room_id.take()
        });
        if let Some(room_id) = room_id {
            if let Some(set) = inner.by_room.get_mut(&room_id) {
                set.remove(&socket_id);
                if set.is_empty() {
                    inner.by_room.remove(&room_id);
                }
            }
        }
    }

    pub async fn touch(&self, socket_id: Uuid) {
        let mut inner = self.inner.lock().await;
        if let Some(conn) = inner.by_socket.get_mut(&socket_id) {
            conn.last_activity = Instant::now();
        }
    }

    pub async fn mark_db_update(&self, socket_id: Uuid, at: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        if let Some(conn) = inner.by_socket.get_mut(&socket_id) {
            conn.last_db_update = Some(at);
        }
    }

    pub async fn get(&self, socket_id: Uuid) -> Option<Connection> {
        let inner = self.inner.lock().await;
        inner.by_socket.get(&socket_id).cloned()
    }

    pub async fn sockets_for_user(&self, user_id: Uuid) -> Vec<Uuid> {
        let inner = self.inner.lock().await;
        inner
            .by_user
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn sockets_for_room(&self, room_id: Uuid) -> Vec<Uuid> {
        let inner = self.inner.lock().await;
        inner
            .by_room
            .get(&room_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `acquireLock(name, roomCode, socketId)` (spec §5 "Locks"):
    /// advisory, self-expiring after 30s. Returns `false` if currently
    /// held by a different socket within the TTL.
    pub async fn acquire_lock(&self, name: &str, room_code: &str, socket_id: Uuid) -> bool {
        let mut inner = self.inner.lock().await;
        let key = (name.to_string(), room_code.to_string());
        let now = Instant::now();
        if let Some((holder, expiry)) = inner.locks.locks.get(&key) {
            if *holder != socket_id && *expiry > now {
                return false;
            }
        }
        inner.locks.locks.insert(key, (socket_id, now + LOCK_TTL));
        true
    }

    pub async fn release_lock(&self, name: &str, room_code: &str, socket_id: Uuid) {
        let mut inner = self.inner.lock().await;
        let key = (name.to_string(), room_code.to_string());
        if let Some((holder, _)) = inner.locks.locks.get(&key) {
            if *holder == socket_id {
                inner.locks.locks.remove(&key);
            }
        }
    }

    /// `trackAttempt(socket, action)`: records an attempt in the
    /// sliding 60s window.
    pub async fn track_attempt(&self, socket_id: Uuid, action: RateLimitedAction) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let bucket = inner
            .rates
            .attempts
            .entry(socket_id)
            .or_default()
            .entry(action)
            .or_default();
        bucket.retain(|t| now.duration_since(*t) < RATE_WINDOW);
        bucket.push(now);
    }

    /// `isRateLimited(socket, action, max)`: true if the sliding-window
    /// count for `action` already meets its configured per-minute cap.
    pub async fn is_rate_limited(&self, socket_id: Uuid, action: RateLimitedAction) -> bool {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let count = inner
            .rates
            .attempts
            .get_mut(&socket_id)
            .and_then(|actions| actions.get_mut(&action))
            .map(|bucket| {
                bucket.retain(|t| now.duration_since(*t) < RATE_WINDOW);
                bucket.len()
            })
            .unwrap_or(0);
        count as u32 >= action.max_per_minute()
    }

    /// Stale-connection sweep (spec §4.C): every 60s, drop sockets idle
    /// past `STALE_THRESHOLD` and return the dropped connections so the
    /// caller can run the same disconnect side effects (grace timers,
    /// broadcasts, friend-offline announcements) a normal socket close
    /// runs, for each one.
    pub async fn sweep_stale(&self) -> Vec<Connection> {
        let stale_ids: Vec<Uuid> = {
            let inner = self.inner.lock().await;
            let now = Instant::now();
            inner
                .by_socket
                .values()
                .filter(|c| now.duration_since(c.last_activity) >= STALE_THRESHOLD)
                .map(|c| c.socket_id)
                .collect()
        };
        let mut dropped = Vec::with_capacity(stale_ids.len());
        for socket_id in stale_ids {
            if let Some(conn) = self.unregister(socket_id).await {
                dropped.push(conn);
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> mpsc::UnboundedSender<Message> {
        mpsc::unbounded_channel().0
    }

    #[tokio::test]
    async fn bind_and_lookup_round_trips() {
        let registry = ConnectionRegistry::new();
        let socket = Uuid::new_v4();
        let user = Uuid::new_v4();
        let room = Uuid::new_v4();

        registry.register(socket, sender()).await;
        registry.bind_identity(socket, user).await;
        registry.bind_room(socket, room, "ABC123").await;

        let conn = registry.get(socket).await.expect("connection present");
        assert_eq!(conn.user_id, Some(user));
        assert_eq!(conn.room_id, Some(room));
        assert_eq!(conn.room_code.as_deref(), Some("ABC123"));
        assert_eq!(registry.sockets_for_user(user).await, vec![socket]);
        assert_eq!(registry.sockets_for_room(room).await, vec![socket]);
    }

    #[tokio::test]
    async fn unbind_room_clears_reverse_index_but_keeps_identity() {
        let registry = ConnectionRegistry::new();
        let socket = Uuid::new_v4();
        let user = Uuid::new_v4();
        let room = Uuid::new_v4();

        registry.register(socket, sender()).await;
        registry.bind_identity(socket, user).await;
        registry.bind_room(socket, room, "ABC123").await;
        registry.unbind_room(socket).await;

        assert!(registry.sockets_for_room(room).await.is_empty());
        assert_eq!(registry.sockets_for_user(user).await, vec![socket]);
        let conn = registry.get(socket).await.unwrap();
        assert_eq!(conn.room_id, None);
        assert_eq!(conn.room_code, None);
    }

    #[tokio::test]
    async fn unregister_removes_socket_from_both_indices() {
        let registry = ConnectionRegistry::new();
        let socket = Uuid::new_v4();
        let user = Uuid::new_v4();
        let room = Uuid::new_v4();

        registry.register(socket, sender()).await;
        registry.bind_identity(socket, user).await;
        registry.bind_room(socket, room, "ABC123").await;

        let removed = registry.unregister(socket).await;
        assert!(removed.is_some());
        assert!(registry.get(socket).await.is_none());
        assert!(registry.sockets_for_user(user).await.is_empty());
        assert!(registry.sockets_for_room(room).await.is_empty());
    }

    #[tokio::test]
    async fn multiple_sockets_per_user_supported() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();

        registry.register(s1, sender()).await;
        registry.register(s2, sender()).await;
        registry.bind_identity(s1, user).await;
        registry.bind_identity(s2, user).await;

        let mut sockets = registry.sockets_for_user(user).await;
        sockets.sort();
        let mut expected = vec![s1, s2];
        expected.sort();
        assert_eq!(sockets, expected);

        registry.unregister(s1).await;
        assert_eq!(registry.sockets_for_user(user).await, vec![s2]);
    }

    #[tokio::test]
    async fn lock_denies_a_second_holder_until_released() {
        let registry = ConnectionRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(registry.acquire_lock("Alice", "ABC123", a).await);
        assert!(!registry.acquire_lock("Alice", "ABC123", b).await);
        // the same holder can re-acquire (refreshes the TTL)
        assert!(registry.acquire_lock("Alice", "ABC123", a).await);

        registry.release_lock("Alice", "ABC123", a).await;
        assert!(registry.acquire_lock("Alice", "ABC123", b).await);
    }

    #[tokio::test]
    async fn release_lock_is_a_noop_for_non_holder() {
        let registry = ConnectionRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(registry.acquire_lock("Alice", "ABC123", a).await);
        registry.release_lock("Alice", "ABC123", b).await;
        // still held by a
        assert!(!registry.acquire_lock("Alice", "ABC123", b).await);
    }

    #[tokio::test]
    async fn rate_limit_enforces_per_action_caps() {
        let registry = ConnectionRegistry::new();
        let socket = Uuid::new_v4();

        for _ in 0..3 {
            assert!(!registry.is_rate_limited(socket, RateLimitedAction::StartGame).await);
            registry.track_attempt(socket, RateLimitedAction::StartGame).await;
        }
        assert!(registry.is_rate_limited(socket, RateLimitedAction::StartGame).await);

        // a distinct action for the same socket has its own counter
        assert!(!registry.is_rate_limited(socket, RateLimitedAction::SendMessage).await);
    }

    #[tokio::test]
    async fn sweep_stale_drops_idle_sockets() {
        let registry = ConnectionRegistry::new();
        let socket = Uuid::new_v4();
        registry.register(socket, sender()).await;

        // freshly registered sockets are never stale
        assert!(registry.sweep_stale().await.is_empty());
        assert!(registry.get(socket).await.is_some());
    }
}
