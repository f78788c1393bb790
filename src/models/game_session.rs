use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `game_sessions` row: an ephemeral launch credential (spec §3/§4.H).
/// One row per participant per launch; tokens are never reused.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: Uuid,
    pub session_token: String,
    pub room_id: Uuid,
    pub room_code: String,
    pub player_id: Uuid,
    pub game_type: String,
    pub streamer_mode: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
