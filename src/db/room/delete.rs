use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::db::room::RoomRepository;
use crate::errors::AppError;

/// Outcome of a `cleanupInactiveRooms` pass (spec §6).
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub deleted_room_ids: Vec<Uuid>,
}

impl RoomRepository {
    /// `cleanupInactiveRooms(dryRun)` — the authoritative policy of
    /// spec §6: a room is a candidate when **(a)** `status='lobby'` and
    /// `last_activity` is older than `lobby_idle`, **or** `status=
    /// 'in_game'` and `last_activity` is older than `in_game_idle`,
    /// **or** `created_at` is older than `max_age`; **and** no member
    /// is `is_connected`, `in_game`, or `current_location='game'`.
    /// `dry_run = true` reports the candidates without deleting them.
    /// The default sweep passes `(1h, 4h, 24h)`; the more aggressive
    /// 02:00–06:00 variant passes `(30m, 12h, 12h)`.
    pub async fn cleanup_inactive_rooms(
        &self,
        dry_run: bool,
        lobby_idle: Duration,
        in_game_idle: Duration,
        max_age: Duration,
    ) -> Result<CleanupReport, AppError> {
        let now = Utc::now();

        let candidate_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT r.id FROM rooms r
               WHERE (
                   (r.status = 'lobby' AND r.last_activity < $1)
                   OR (r.status = 'in_game' AND r.last_activity < $2)
                   OR (r.created_at < $3)
               )
               AND r.id NOT IN (
                   SELECT DISTINCT room_id FROM room_members
                   WHERE is_connected = true OR in_game = true OR current_location = 'game'
               )"#,
        )
        .bind(now - lobby_idle)
        .bind(now - in_game_idle)
        .bind(now - max_age)
        .fetch_all(&self.pool)
        .await?;

        if dry_run || candidate_ids.is_empty() {
            return Ok(CleanupReport {
                deleted_room_ids: candidate_ids,
            });
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM room_members WHERE room_id = ANY($1)")
            .bind(&candidate_ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM rooms WHERE id = ANY($1)")
            .bind(&candidate_ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(CleanupReport {
            deleted_room_ids: candidate_ids,
        })
    }

    pub async fn delete_room(&self, room_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM room_members WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::RoomNotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}
