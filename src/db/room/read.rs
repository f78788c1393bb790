use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::room::RoomRepository;
use crate::db::user::UserRepository;
use crate::errors::AppError;
use crate::models::{Room, RoomMember, User};

/// Room + every member + each member's user, the shape
/// `getRoomByCode` returns per spec §4.B.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomWithMembers {
    pub room: Room,
    pub members: Vec<(RoomMember, User)>,
}

impl RoomRepository {
    pub async fn find_by_id(&self, room_id: Uuid) -> Result<Room, AppError> {
        sqlx::query_as::<_, Room>(
            r#"SELECT id, room_code, host_id, status, current_game, max_players,
                      is_public, streamer_mode, created_at, last_activity, game_started_at, metadata
               FROM rooms WHERE id = $1"#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::RoomNotFound)
    }

    /// `room_code` is only unique among non-abandoned rooms (the
    /// partial index in `migrations/0001_init.sql` and the collision
    /// check in `create_room` both exclude `abandoned` rows), so more
    /// than one abandoned room can legitimately share a code. The live
    /// (non-abandoned) row always wins when one exists; among rows with
    /// the same priority, the newest wins — deterministic rather than
    /// whatever order Postgres happens to return.
    pub async fn get_room_by_code(&self, room_code: &str) -> Result<RoomWithMembers, AppError> {
        let room = sqlx::query_as::<_, Room>(
            r#"SELECT id, room_code, host_id, status, current_game, max_players,
                      is_public, streamer_mode, created_at, last_activity, game_started_at, metadata
               FROM rooms WHERE room_code = $1
               ORDER BY (status != 'abandoned') DESC, created_at DESC
               LIMIT 1"#,
        )
        .bind(room_code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::RoomNotFound)?;

        let members = self.members_with_users(room.id).await?;
        Ok(RoomWithMembers { room, members })
    }

    pub(crate) async fn members_with_users(
        &self,
        room_id: Uuid,
    ) -> Result<Vec<(RoomMember, User)>, AppError> {
        let members = sqlx::query_as::<_, RoomMember>(
            r#"SELECT id, room_id, user_id, role, is_connected, is_ready, in_game,
                      current_location, custom_lobby_name, socket_id, last_ping,
                      joined_at, left_at
               FROM room_members WHERE room_id = $1 ORDER BY joined_at ASC"#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        let user_repo = UserRepository::new(self.pool.clone());
        let mut out = Vec::with_capacity(members.len());
        for member in members {
            let user = user_repo.find_by_id(member.user_id).await?;
            out.push((member, user));
        }
        Ok(out)
    }

    /// Public rooms with >=1 member pinged within 5 minutes; up to 50,
    /// newest first (spec §4.B `getActiveRooms`).
    pub async fn get_active_rooms(&self, game_type: Option<&str>) -> Result<Vec<Room>, AppError> {
        let cutoff = Utc::now() - Duration::minutes(5);
        let rooms = sqlx::query_as::<_, Room>(
            r#"SELECT DISTINCT r.id, r.room_code, r.host_id, r.status, r.current_game,
                      r.max_players, r.is_public, r.streamer_mode, r.created_at,
                      r.last_activity, r.game_started_at, r.metadata
               FROM rooms r
               JOIN room_members m ON m.room_id = r.id
               WHERE r.is_public = true
                 AND m.last_ping > $1
                 AND ($2::text IS NULL OR r.current_game = $2)
               ORDER BY r.created_at DESC
               LIMIT 50"#,
        )
        .bind(cutoff)
        .bind(game_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(rooms)
    }
}
