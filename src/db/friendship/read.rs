use uuid::Uuid;

use crate::db::friendship::FriendshipRepository;
use crate::errors::AppError;

impl FriendshipRepository {
    /// The ids of every user with an `accepted` friendship edge to
    /// `user_id`, in either direction, used to scope `friend:online` /
    /// `friend:offline` broadcasts (spec §4.J).
    pub async fn accepted_friend_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT friend_id FROM friendships
                 WHERE user_id = $1 AND status = 'accepted'
               UNION
               SELECT user_id FROM friendships
                 WHERE friend_id = $1 AND status = 'accepted'"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
