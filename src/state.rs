//! Process-wide shared state. Grounded on the teacher's `state::AppState`
//! (pool construction knobs, one struct handed to every axum handler via
//! `with_state`); the Redis-backed `Connections`/`ConnectionIndices` pair
//! is replaced by `registry::ConnectionRegistry` per the redesign in
//! DESIGN.md, and `active_games`/`game_registry`/`bot` are dropped since
//! in-process plugin games and the Telegram bot are out of scope here.

use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::db::friendship::FriendshipRepository;
use crate::db::game::GameRepository;
use crate::db::game_session::GameSessionRepository;
use crate::db::room::RoomRepository;
use crate::db::room_event::RoomEventRepository;
use crate::db::user::UserRepository;
use crate::errors::AppError;
use crate::events::MailboxRegistry;
use crate::friends::FriendPresence;
use crate::launch::LaunchService;
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::room::engine::RoomEngine;
use crate::room::grace::GraceManager;

#[derive(Clone)]
pub struct AppState {
    pub config: std::sync::Arc<AppConfig>,
    pub pool: PgPool,
    pub rooms: RoomRepository,
    pub users: UserRepository,
    pub games: GameRepository,
    pub sessions: GameSessionRepository,
    pub room_events: RoomEventRepository,
    pub friendships: FriendshipRepository,
    pub registry: ConnectionRegistry,
    pub mailboxes: MailboxRegistry,
    pub grace: GraceManager,
    pub presence: PresenceTracker,
    pub launch: LaunchService,
    pub friends: FriendPresence,
    pub room_engine: RoomEngine,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(50)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.database_url)
            .await?;

        let rooms = RoomRepository::new(pool.clone());
        let users = UserRepository::new(pool.clone());
        let games = GameRepository::new(pool.clone());
        let sessions = GameSessionRepository::new(pool.clone());
        let room_events = RoomEventRepository::new(pool.clone());
        let friendships = FriendshipRepository::new(pool.clone());

        let registry = ConnectionRegistry::new();
        let mailboxes = MailboxRegistry::new();
        let grace = GraceManager::new(config.host_transfer_grace_secs, config.room_abandon_grace_secs);
        let presence = PresenceTracker::new(rooms.clone(), registry.clone());
        let launch = LaunchService::new(
            rooms.clone(),
            sessions.clone(),
            games.clone(),
            registry.clone(),
            mailboxes.clone(),
        );
        let friends = FriendPresence::new(friendships.clone(), registry.clone());
        let room_engine = RoomEngine::new(
            rooms.clone(),
            users.clone(),
            games.clone(),
            room_events.clone(),
            registry.clone(),
            mailboxes.clone(),
            grace.clone(),
        );

        Ok(Self {
            config: std::sync::Arc::new(config),
            pool,
            rooms,
            users,
            games,
            sessions,
            room_events,
            friendships,
            registry,
            mailboxes,
            grace,
            presence,
            launch,
            friends,
            room_engine,
        })
    }

    /// Spawns the periodic sweep for sockets that went away without a
    /// clean close (network drop, crashed client) — `ConnectionRegistry`
    /// only notices these once `lastActivity` goes stale, so this runs
    /// the same disconnect side effects `ws::handler`'s normal close path
    /// runs, for each connection the sweep drops.
    pub fn spawn_stale_sweeper(&self) {
        const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
        let state = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                for conn in state.registry.sweep_stale().await {
                    let socket_id: Uuid = conn.socket_id;
                    if let (Some(room_id), Some(user_id)) = (conn.room_id, conn.user_id) {
                        if let Err(err) = state.room_engine.handle_disconnect(room_id, user_id).await {
                            tracing::warn!(%socket_id, error = %err, "stale-sweep disconnect handling failed");
                        }
                    }
                    if let Some(user_id) = conn.user_id {
                        if let Err(err) = state.friends.announce_offline(user_id).await {
                            tracing::warn!(%socket_id, error = %err, "stale-sweep friend offline announce failed");
                        }
                    }
                }
            }
        });
    }
}
