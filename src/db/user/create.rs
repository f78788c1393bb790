use uuid::Uuid;

use crate::db::user::UserRepository;
use crate::errors::AppError;
use crate::models::User;

impl UserRepository {
    /// Upsert a guest user keyed by `username`, used when a socket
    /// creates/joins a room without a resolvable external account
    /// (spec §3: "Created on first authenticated or guest join").
    pub async fn ensure_guest(&self, username: &str, display_name: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, display_name, is_guest, premium_tier, role)
               VALUES ($1, $2, $3, true, 'free', 'user')
               ON CONFLICT (username) DO UPDATE SET display_name = EXCLUDED.display_name
               RETURNING id, username, display_name, is_guest, premium_tier,
                         avatar_url, role, email, oauth_provider"#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
