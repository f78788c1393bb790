use chrono::Utc;
use uuid::Uuid;

use crate::db::room::RoomRepository;
use crate::errors::AppError;
use crate::models::{Room, RoomMember};
use crate::sanitize::{ROOM_CODE_RETRY_LIMIT, random_room_code_candidate, sanitize_settings};

#[derive(Debug, Clone)]
pub struct CreateRoomOptions {
    pub max_players: i32,
    pub is_public: bool,
    pub streamer_mode: bool,
    pub current_game: Option<String>,
    pub created_by_name: String,
    pub custom_lobby_name: Option<String>,
}

impl RoomRepository {
    /// `createRoom(hostId, opts)` (spec §4.B): inserts `rooms` and the
    /// host `room_members` row in one transaction; fails
    /// `ROOM_CODE_COLLISION` after the retry budget in
    /// `generate_room_code` is exhausted.
    pub async fn create_room(
        &self,
        host_id: Uuid,
        opts: CreateRoomOptions,
    ) -> Result<(Room, RoomMember), AppError> {
        // §6's inbound table bounds `createRoom`'s own `maxPlayers` field
        // to 2-30; §3's room-attribute invariant allows up to 50 for rooms
        // that reach a higher cap by some other path (e.g. a future admin
        // override), so this check only governs the creation request.
        if !(2..=30).contains(&opts.max_players) {
            return Err(AppError::InvalidInput(
                "maxPlayers must be between 2 and 30".to_string(),
            ));
        }

        let metadata = serde_json::json!({
            "created_by_name": opts.created_by_name,
            "original_host_id": host_id,
        });
        sanitize_settings(&metadata).map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        // Rejection-sample a code against live rooms inside the same
        // transaction; the column also carries a UNIQUE constraint as a
        // backstop against a concurrent insert racing us.
        let mut room_code = None;
        for _ in 0..ROOM_CODE_RETRY_LIMIT {
            let candidate = random_room_code_candidate();
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM rooms WHERE room_code = $1 AND status != 'abandoned'",
            )
            .bind(&candidate)
            .fetch_one(&mut *tx)
            .await?;
            if taken == 0 {
                room_code = Some(candidate);
                break;
            }
        }
        let room_code = room_code.ok_or(AppError::RoomCodeCollision)?;

        let now = Utc::now();
        let room = sqlx::query_as::<_, Room>(
            r#"INSERT INTO rooms (id, room_code, host_id, status, current_game, max_players,
                                  is_public, streamer_mode, created_at, last_activity,
                                  game_started_at, metadata)
               VALUES ($1, $2, $3, 'lobby', $4, $5, $6, $7, $8, $8, NULL, $9)
               RETURNING id, room_code, host_id, status, current_game, max_players,
                         is_public, streamer_mode, created_at, last_activity,
                         game_started_at, metadata"#,
        )
        .bind(Uuid::new_v4())
        .bind(&room_code)
        .bind(host_id)
        .bind(&opts.current_game)
        .bind(opts.max_players)
        .bind(opts.is_public)
        .bind(opts.streamer_mode)
        .bind(now)
        .bind(&metadata)
        .fetch_one(&mut *tx)
        .await?;

        let host_member = sqlx::query_as::<_, RoomMember>(
            r#"INSERT INTO room_members (id, room_id, user_id, role, is_connected, is_ready,
                                          in_game, current_location, custom_lobby_name,
                                          last_ping, joined_at)
               VALUES ($1, $2, $3, 'host', true, false, false, 'lobby', $4, $5, $5)
               RETURNING id, room_id, user_id, role, is_connected, is_ready, in_game,
                         current_location, custom_lobby_name, socket_id, last_ping,
                         joined_at, left_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(room.id)
        .bind(host_id)
        .bind(&opts.custom_lobby_name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((room, host_member))
    }
}
