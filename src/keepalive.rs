//! Keep-Alive & Cleanup Supervisor (spec §4.I/§6). Grounded on the
//! teacher's Stacks-chain RPC usage via `reqwest` (repurposed here for
//! external game-server health checks) and its `tokio::spawn` interval-
//! loop background-task shape (the lobby `Starting`-countdown task).

use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Timelike, Utc};

use crate::db::game::GameRepository;
use crate::db::room::RoomRepository;

const HEALTH_PING_INTERVAL: StdDuration = StdDuration::from_secs(5 * 60);
const HEALTH_PING_TIMEOUT: StdDuration = StdDuration::from_secs(30);
const CLEANUP_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(15 * 60);

const DEFAULT_LOBBY_IDLE: ChronoDuration = ChronoDuration::hours(1);
const DEFAULT_IN_GAME_IDLE: ChronoDuration = ChronoDuration::hours(4);
const DEFAULT_MAX_AGE: ChronoDuration = ChronoDuration::hours(24);

const AGGRESSIVE_LOBBY_IDLE: ChronoDuration = ChronoDuration::minutes(30);
const AGGRESSIVE_IN_GAME_IDLE: ChronoDuration = ChronoDuration::hours(12);
const AGGRESSIVE_MAX_AGE: ChronoDuration = ChronoDuration::hours(12);

#[derive(Clone)]
pub struct KeepAliveSupervisor {
    games: GameRepository,
    rooms: RoomRepository,
    http: reqwest::Client,
}

impl KeepAliveSupervisor {
    pub fn new(games: GameRepository, rooms: RoomRepository) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("lobby-core-keepalive/1.0")
            .timeout(HEALTH_PING_TIMEOUT)
            .build()
            .expect("reqwest client build is infallible for this config");
        Self { games, rooms, http }
    }

    /// Spawns both background loops. Returns immediately; the loops run
    /// for the lifetime of the process.
    pub fn spawn(self) {
        let health = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_PING_INTERVAL);
            loop {
                interval.tick().await;
                health.ping_external_games().await;
            }
        });

        let cleanup = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                cleanup.sweep_inactive_rooms().await;
            }
        });
    }

    /// §4.I: GET `{server_url}/health` for every active external game,
    /// 30s timeout, distinct user-agent. Results are only logged — this
    /// component has no effect on room state.
    async fn ping_external_games(&self) {
        let games = match self.games.active_external().await {
            Ok(games) => games,
            Err(err) => {
                tracing::warn!(error = %err, "keep-alive: failed to list active external games");
                return;
            }
        };

        for game in games {
            let Some(server_url) = game.server_url.clone() else {
                continue;
            };
            let url = format!("{server_url}/health");
            match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(game = %game.name, %url, "external game server healthy");
                }
                Ok(resp) => {
                    tracing::warn!(game = %game.name, %url, status = %resp.status(), "external game server unhealthy");
                }
                Err(err) => {
                    tracing::warn!(game = %game.name, %url, error = %err, "external game server health ping failed");
                }
            }
        }
    }

    /// §6: the 15-minute sweep, switching to the more aggressive
    /// 02:00–06:00 local-server thresholds when the wall clock falls in
    /// that window.
    async fn sweep_inactive_rooms(&self) {
        let hour = Utc::now().hour();
        let (lobby_idle, in_game_idle, max_age) = if (2..6).contains(&hour) {
            (AGGRESSIVE_LOBBY_IDLE, AGGRESSIVE_IN_GAME_IDLE, AGGRESSIVE_MAX_AGE)
        } else {
            (DEFAULT_LOBBY_IDLE, DEFAULT_IN_GAME_IDLE, DEFAULT_MAX_AGE)
        };

        match self
            .rooms
            .cleanup_inactive_rooms(false, lobby_idle, in_game_idle, max_age)
            .await
        {
            Ok(report) if !report.deleted_room_ids.is_empty() => {
                tracing::info!(count = report.deleted_room_ids.len(), "cleanup sweep deleted inactive rooms");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "cleanup sweep failed");
            }
        }
    }
}
