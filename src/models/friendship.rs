use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `friendships` row. Read-only from this core's perspective; only
/// `accepted` edges drive online/offline broadcasts (spec §4.J).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: FriendshipStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Blocked,
}
