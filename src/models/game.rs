use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `games` row: the catalogue of external games this core can launch
/// rooms into (spec §6). `server_url`/`is_external` drive the Keep-Alive
/// Supervisor (§4.I); `base_url` is the launch-URL base (§4.H).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    pub server_url: Option<String>,
    pub is_external: bool,
    pub is_active: bool,
    pub min_players: i32,
    pub max_players: i32,
}
