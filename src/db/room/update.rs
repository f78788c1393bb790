use chrono::Utc;
use uuid::Uuid;

use crate::db::room::RoomRepository;
use crate::errors::AppError;
use crate::models::{ConnectionStatus, MemberRole, RoomMember, RoomStatus};

impl RoomRepository {
    /// `addParticipant(roomId, userId, socketId, role, customName)`
    /// (spec §4.B): upsert on (room, user) uniqueness. `is_host_hint` is
    /// only honored when the room currently carries no host (spec
    /// §4.D's host-promotion rule); the caller is expected to have
    /// already checked that via `has_host`.
    pub async fn add_participant(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        socket_id: Uuid,
        role: MemberRole,
        custom_lobby_name: Option<&str>,
    ) -> Result<RoomMember, AppError> {
        let now = Utc::now();
        let member = sqlx::query_as::<_, RoomMember>(
            r#"INSERT INTO room_members
                 (id, room_id, user_id, role, is_connected, is_ready, in_game,
                  current_location, custom_lobby_name, socket_id, last_ping, joined_at)
               VALUES ($1, $2, $3, $4, true, false, false, 'lobby', $5, $6, $7, $7)
               ON CONFLICT (room_id, user_id) DO UPDATE SET
                 is_connected = true,
                 current_location = 'lobby',
                 socket_id = EXCLUDED.socket_id,
                 custom_lobby_name = COALESCE(EXCLUDED.custom_lobby_name, room_members.custom_lobby_name),
                 last_ping = EXCLUDED.last_ping,
                 left_at = NULL
               RETURNING id, room_id, user_id, role, is_connected, is_ready, in_game,
                         current_location, custom_lobby_name, socket_id, last_ping,
                         joined_at, left_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(room_id)
        .bind(user_id)
        .bind(role)
        .bind(custom_lobby_name)
        .bind(socket_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    /// `removeParticipant(roomId, userId)`: deletes the member row,
    /// returns whether the removed row held `role = host`.
    pub async fn remove_participant(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let was_host: Option<MemberRole> = sqlx::query_scalar(
            "DELETE FROM room_members WHERE room_id = $1 AND user_id = $2 RETURNING role",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(matches!(was_host, Some(MemberRole::Host)))
    }

    /// `updateParticipantConnection` (spec §4.B): maps a status string
    /// to `(is_connected, in_game?, current_location)`.
    pub async fn update_participant_connection(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        status: ConnectionStatus,
        custom_lobby_name: Option<&str>,
    ) -> Result<RoomMember, AppError> {
        let (is_connected, in_game, location) = status.effects();
        let now = Utc::now();

        let member = sqlx::query_as::<_, RoomMember>(
            r#"UPDATE room_members SET
                 is_connected = $3,
                 in_game = COALESCE($4, in_game),
                 current_location = $5,
                 last_ping = $6,
                 custom_lobby_name = COALESCE($7, custom_lobby_name)
               WHERE room_id = $1 AND user_id = $2
               RETURNING id, room_id, user_id, role, is_connected, is_ready, in_game,
                         current_location, custom_lobby_name, socket_id, last_ping,
                         joined_at, left_at"#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(is_connected)
        .bind(in_game)
        .bind(location)
        .bind(now)
        .bind(custom_lobby_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::PlayerNotFound)?;
        Ok(member)
    }

    /// `transferHost(roomId, oldHostUserId, newHostUserId)` (spec §4.B):
    /// transactional, fails if `newHostUserId` is not a member.
    pub async fn transfer_host(
        &self,
        room_id: Uuid,
        old_host_user_id: Uuid,
        new_host_user_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let is_member: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM room_members WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(new_host_user_id)
        .fetch_one(&mut *tx)
        .await?;
        if is_member == 0 {
            return Err(AppError::PlayerNotFound);
        }

        sqlx::query(
            "UPDATE room_members SET role = 'player' WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(old_host_user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE room_members SET role = 'host' WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(new_host_user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE rooms SET host_id = $2 WHERE id = $1")
            .bind(room_id)
            .bind(new_host_user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// `autoTransferHost(roomId, leavingHostUserId)` (spec §4.B):
    /// selects the next eligible member — connected, not the leaver,
    /// lowest `joined_at`, ties broken by lowest `user_id` — and
    /// applies `transfer_host`. Returns `None` if no eligible member
    /// exists (room has no one left to promote).
    pub async fn auto_transfer_host(
        &self,
        room_id: Uuid,
        leaving_host_user_id: Uuid,
    ) -> Result<Option<RoomMember>, AppError> {
        let candidate = sqlx::query_as::<_, RoomMember>(
            r#"SELECT id, room_id, user_id, role, is_connected, is_ready, in_game,
                      current_location, custom_lobby_name, socket_id, last_ping,
                      joined_at, left_at
               FROM room_members
               WHERE room_id = $1 AND user_id != $2 AND is_connected = true
               ORDER BY joined_at ASC, user_id ASC
               LIMIT 1"#,
        )
        .bind(room_id)
        .bind(leaving_host_user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(candidate) = candidate else {
            return Ok(None);
        };

        self.transfer_host(room_id, leaving_host_user_id, candidate.user_id)
            .await?;

        Ok(Some(RoomMember {
            role: MemberRole::Host,
            ..candidate
        }))
    }

    pub async fn touch_last_activity(&self, room_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE rooms SET last_activity = $2 WHERE id = $1")
            .bind(room_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Flip `status` (and, for the `lobby` target, null out
    /// `current_game`/`game_started_at` per invariant #3 in spec §3/§8).
    pub async fn set_status(&self, room_id: Uuid, status: RoomStatus) -> Result<(), AppError> {
        if matches!(status, RoomStatus::Lobby) {
            sqlx::query(
                r#"UPDATE rooms SET status = $2, current_game = NULL, game_started_at = NULL,
                     last_activity = $3 WHERE id = $1"#,
            )
            .bind(room_id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE rooms SET status = $2, last_activity = $3 WHERE id = $1")
                .bind(room_id)
                .bind(status)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// `startGame`'s own room-side transition (spec §4.D/§4.H): flips
    /// `status` to `in_game` and stamps `game_started_at`, distinct
    /// from the generic `set_status` since no other status target sets
    /// this column.
    pub async fn mark_game_started(&self, room_id: Uuid) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE rooms SET status = 'in_game', game_started_at = $2, last_activity = $2 WHERE id = $1",
        )
        .bind(room_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_current_game(
        &self,
        room_id: Uuid,
        current_game: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE rooms SET current_game = $2, last_activity = $3 WHERE id = $1")
            .bind(room_id)
            .bind(current_game)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Marks every currently-connected member `in_game=true,
    /// current_location=game`, the member-side effect of `startGame`
    /// step 2 (spec §4.H). Returns the updated rows so the caller can
    /// mint one session per returned member.
    pub async fn mark_all_connected_in_game(
        &self,
        room_id: Uuid,
    ) -> Result<Vec<RoomMember>, AppError> {
        let rows = sqlx::query_as::<_, RoomMember>(
            r#"UPDATE room_members
               SET in_game = true, current_location = 'game'
               WHERE room_id = $1 AND is_connected = true
               RETURNING id, room_id, user_id, role, is_connected, is_ready, in_game,
                         current_location, custom_lobby_name, socket_id, last_ping,
                         joined_at, left_at"#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// `playerReturnToLobby` (spec §4.D): the caller's own member row
    /// drops out of the in-progress game without touching
    /// `is_connected`, distinct from `update_participant_connection`'s
    /// transport-level status strings.
    pub async fn return_to_lobby(&self, room_id: Uuid, user_id: Uuid) -> Result<RoomMember, AppError> {
        sqlx::query_as::<_, RoomMember>(
            r#"UPDATE room_members SET in_game = false, current_location = 'lobby'
               WHERE room_id = $1 AND user_id = $2
               RETURNING id, room_id, user_id, role, is_connected, is_ready, in_game,
                         current_location, custom_lobby_name, socket_id, last_ping,
                         joined_at, left_at"#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::PlayerNotFound)
    }

    /// Updates only the display-name override, leaving connection state
    /// untouched — distinct from `update_participant_connection`, which
    /// also flips `is_connected`/`current_location`.
    pub async fn set_custom_lobby_name(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        custom_lobby_name: &str,
    ) -> Result<RoomMember, AppError> {
        sqlx::query_as::<_, RoomMember>(
            r#"UPDATE room_members SET custom_lobby_name = $3
               WHERE room_id = $1 AND user_id = $2
               RETURNING id, room_id, user_id, role, is_connected, is_ready, in_game,
                         current_location, custom_lobby_name, socket_id, last_ping,
                         joined_at, left_at"#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(custom_lobby_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::PlayerNotFound)
    }

    pub async fn has_host(&self, room_id: Uuid) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM room_members WHERE room_id = $1 AND role = 'host'",
        )
        .bind(room_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn promote_to_host(&self, room_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE room_members SET role = 'host' WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE rooms SET host_id = $2 WHERE id = $1")
            .bind(room_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Throttled heartbeat write (spec §4.E): bumps `last_ping` only;
    /// callers decide whether 60s has elapsed since the last write
    /// before calling this.
    pub async fn update_last_ping(&self, room_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE room_members SET last_ping = $3 WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Periodic stale sweep (spec §4.E): flips any member with
    /// `is_connected=true, in_game=false, current_location != 'game',
    /// last_ping < cutoff` to disconnected, excluding members whose
    /// `current_location = game` (those are reconciled only by explicit
    /// socket events or session expiry). Returns the `(room_id, user_id)`
    /// pairs flipped, so callers can run grace-timer/broadcast effects.
    pub async fn sweep_stale_members(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<Vec<(Uuid, Uuid)>, AppError> {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"UPDATE room_members
               SET is_connected = false, current_location = 'disconnected'
               WHERE is_connected = true
                 AND in_game = false
                 AND current_location != 'game'
                 AND last_ping < $1
               RETURNING room_id, user_id"#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
