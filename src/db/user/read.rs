use uuid::Uuid;

use crate::db::user::UserRepository;
use crate::errors::AppError;
use crate::models::User;

impl UserRepository {
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, username, display_name, is_guest, premium_tier,
                      avatar_url, role, email, oauth_provider
               FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::UserNotFound)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, display_name, is_guest, premium_tier,
                      avatar_url, role, email, oauth_provider
               FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Historical-participant matching for rejoin/abandoned-room gating
    /// (spec §4.D): does `candidate` match this user's id, username, or
    /// display name?
    pub fn matches(user: &User, candidate: &str) -> bool {
        user.id.to_string() == candidate
            || user.username.eq_ignore_ascii_case(candidate)
            || user.display_name.eq_ignore_ascii_case(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "bobthebuilder".to_string(),
            display_name: "Bob the Builder".to_string(),
            is_guest: true,
            premium_tier: "free".to_string(),
            avatar_url: None,
            role: UserRole::User,
            email: None,
            oauth_provider: None,
        }
    }

    #[test]
    fn matches_by_user_id() {
        let user = sample_user();
        assert!(UserRepository::matches(&user, &user.id.to_string()));
    }

    #[test]
    fn matches_username_case_insensitively() {
        let user = sample_user();
        assert!(UserRepository::matches(&user, "BobTheBuilder"));
    }

    #[test]
    fn matches_display_name_case_insensitively() {
        let user = sample_user();
        assert!(UserRepository::matches(&user, "bob the builder"));
    }

    #[test]
    fn does_not_match_an_unrelated_candidate() {
        let user = sample_user();
        assert!(!UserRepository::matches(&user, "carol"));
        assert!(!UserRepository::matches(&user, &Uuid::new_v4().to_string()));
    }
}
