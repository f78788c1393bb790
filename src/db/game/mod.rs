mod read;

use sqlx::PgPool;

/// Repository for `games` (spec §6): the catalogue this core launches
/// rooms into. Read-only — the catalogue is managed out of band.
#[derive(Clone)]
pub struct GameRepository {
    pub(crate) pool: PgPool,
}

impl GameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
