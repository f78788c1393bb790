use crate::db::game_session::GameSessionRepository;
use crate::errors::AppError;
use crate::models::GameSession;

impl GameSessionRepository {
    /// Lookup used by the external game server's own auth middleware to
    /// validate a launch credential handed to it by a client (spec
    /// §4.H). Callers are expected to additionally check `expires_at`.
    pub async fn find_by_token(&self, session_token: &str) -> Result<GameSession, AppError> {
        sqlx::query_as::<_, GameSession>(
            r#"SELECT id, session_token, room_id, room_code, player_id, game_type,
                      streamer_mode, metadata, created_at, expires_at
               FROM game_sessions WHERE session_token = $1"#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::JoinFailed("session token not found".to_string()))
    }
}
