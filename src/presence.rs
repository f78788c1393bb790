//! Presence & Heartbeat (spec §4.E). Grounded on the teacher's
//! `ws::room::engine` `Ping`/`Pong` handling
//! (`player_repo.update_ping`), generalized with the 60s DB-write
//! throttle (keyed off `Connection::last_db_update`, Open Question (c))
//! and a periodic stale sweep modeled on the teacher's interval-loop
//! background tasks.

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::db::room::RoomRepository;
use crate::errors::AppError;
use crate::registry::ConnectionRegistry;

const HEARTBEAT_DB_THROTTLE: chrono::Duration = chrono::Duration::seconds(60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const STALE_AFTER: chrono::Duration = chrono::Duration::minutes(2);

#[derive(Clone)]
pub struct PresenceTracker {
    rooms: RoomRepository,
    registry: ConnectionRegistry,
}

impl PresenceTracker {
    pub fn new(rooms: RoomRepository, registry: ConnectionRegistry) -> Self {
        Self { rooms, registry }
    }

    /// Handles an inbound `heartbeat`: always touches the in-memory
    /// `lastActivity`, but writes to Postgres at most once per 60s.
    pub async fn heartbeat(&self, socket_id: Uuid, room_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.registry.touch(socket_id).await;

        let should_write = match self.registry.get(socket_id).await.and_then(|c| c.last_db_update) {
            Some(last) => Utc::now() - last >= HEARTBEAT_DB_THROTTLE,
            None => true,
        };

        if should_write {
            self.rooms.update_last_ping(room_id, user_id).await?;
            self.registry.mark_db_update(socket_id, Utc::now()).await;
        }

        Ok(())
    }

    /// Spawns the periodic stale-connection sweep. Returns immediately;
    /// the loop runs for the lifetime of the process.
    pub fn spawn_sweeper(self) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(err) = self.sweep_once().await {
                    tracing::warn!(error = %err, "presence sweep failed");
                }
            }
        });
    }

    async fn sweep_once(&self) -> Result<(), AppError> {
        let cutoff = Utc::now() - STALE_AFTER;
        let flipped = self.rooms.sweep_stale_members(cutoff).await?;
        for (room_id, user_id) in flipped {
            tracing::info!(room_id = %room_id, user_id = %user_id, "presence sweep marked member disconnected");
        }
        Ok(())
    }
}
