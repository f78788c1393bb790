mod create;
mod read;

use sqlx::PgPool;

/// Repository for `room_events` (spec §4.B `logEvent`): an append-only
/// audit trail, never updated or deleted.
#[derive(Clone)]
pub struct RoomEventRepository {
    pub(crate) pool: PgPool,
}

impl RoomEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
