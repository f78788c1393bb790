mod create;
mod read;

use sqlx::PgPool;

/// Repository for `users` (spec §4.B). Reads are the core's own
/// business; writes beyond guest-user creation belong to the external
/// account subsystem (spec §3).
#[derive(Clone)]
pub struct UserRepository {
    pub(crate) pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
