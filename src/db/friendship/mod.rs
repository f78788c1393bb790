mod read;

use sqlx::PgPool;

/// Repository for `friendships` (spec §4.J). Read-only: this core never
/// creates or mutates the social graph, only watches it for presence.
#[derive(Clone)]
pub struct FriendshipRepository {
    pub(crate) pool: PgPool,
}

impl FriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
