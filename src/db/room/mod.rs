pub mod create;
mod delete;
mod read;
mod update;

pub use create::CreateRoomOptions;
pub use delete::CleanupReport;
pub use read::RoomWithMembers;

use sqlx::PgPool;

/// Repository for `rooms` + `room_members` (spec §4.B). Composite
/// operations (`createRoom`, `transferHost`, `autoTransferHost`) run
/// inside a single transaction.
#[derive(Clone)]
pub struct RoomRepository {
    pub(crate) pool: PgPool,
}

impl RoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
