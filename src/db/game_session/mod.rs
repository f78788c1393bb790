pub mod create;
mod read;

use sqlx::PgPool;

/// Repository for `game_sessions` (spec §4.B/§4.H): ephemeral launch
/// credentials minted by the Game Launch Service.
#[derive(Clone)]
pub struct GameSessionRepository {
    pub(crate) pool: PgPool,
}

impl GameSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
