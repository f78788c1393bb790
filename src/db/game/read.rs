use uuid::Uuid;

use crate::db::game::GameRepository;
use crate::errors::AppError;
use crate::models::Game;

impl GameRepository {
    pub async fn find_by_id(&self, game_id: Uuid) -> Result<Game, AppError> {
        sqlx::query_as::<_, Game>(
            r#"SELECT id, name, base_url, server_url, is_external, is_active,
                      min_players, max_players
               FROM games WHERE id = $1"#,
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::InvalidInput("unknown game".to_string()))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Game>, AppError> {
        sqlx::query_as::<_, Game>(
            r#"SELECT id, name, base_url, server_url, is_external, is_active,
                      min_players, max_players
               FROM games WHERE name = $1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// `find_by_name`, additionally requiring `is_active = true` — the
    /// "active games set" `selectGame`/`startGame` must validate
    /// `gameType` against (spec §6's inbound table, §4.H's
    /// preconditions).
    pub async fn find_active_by_name(&self, name: &str) -> Result<Option<Game>, AppError> {
        sqlx::query_as::<_, Game>(
            r#"SELECT id, name, base_url, server_url, is_external, is_active,
                      min_players, max_players
               FROM games WHERE name = $1 AND is_active = true"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Active external games, used by the Keep-Alive Supervisor (§4.I)
    /// to decide what to ping.
    pub async fn active_external(&self) -> Result<Vec<Game>, AppError> {
        sqlx::query_as::<_, Game>(
            r#"SELECT id, name, base_url, server_url, is_external, is_active,
                      min_players, max_players
               FROM games WHERE is_active = true AND is_external = true
                 AND server_url IS NOT NULL"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
