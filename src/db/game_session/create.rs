use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::db::game_session::GameSessionRepository;
use crate::errors::AppError;
use crate::models::GameSession;

/// One row to insert per participant in a launch batch.
pub struct NewGameSession {
    pub session_token: String,
    pub room_id: Uuid,
    pub room_code: String,
    pub player_id: Uuid,
    pub game_type: String,
    pub streamer_mode: bool,
    pub metadata: serde_json::Value,
}

impl GameSessionRepository {
    /// Batch-insert one session row per participant inside a single
    /// round trip, used by the Game Launch Service (spec §4.H) so a
    /// partial failure never hands out a credential for only some
    /// players.
    pub async fn create_batch(
        &self,
        sessions: Vec<NewGameSession>,
    ) -> Result<Vec<GameSession>, AppError> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let expires_at = now + Duration::hours(24);
        let mut tx = self.pool.begin().await?;
        let mut out = Vec::with_capacity(sessions.len());

        for session in sessions {
            let row = sqlx::query_as::<_, GameSession>(
                r#"INSERT INTO game_sessions
                     (id, session_token, room_id, room_code, player_id, game_type,
                      streamer_mode, metadata, created_at, expires_at)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                   RETURNING id, session_token, room_id, room_code, player_id, game_type,
                             streamer_mode, metadata, created_at, expires_at"#,
            )
            .bind(Uuid::new_v4())
            .bind(&session.session_token)
            .bind(session.room_id)
            .bind(&session.room_code)
            .bind(session.player_id)
            .bind(&session.game_type)
            .bind(session.streamer_mode)
            .bind(&session.metadata)
            .bind(now)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?;
            out.push(row);
        }

        tx.commit().await?;
        Ok(out)
    }
}
