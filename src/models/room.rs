use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `rooms` row (spec §3). `room_code` is a 6-char uppercase alphanumeric
/// string, globally unique among non-deleted rooms.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub room_code: String,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub current_game: Option<String>,
    pub max_players: i32,
    pub is_public: bool,
    pub streamer_mode: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Set when `startGame` transitions the room to `in_game` (spec
    /// §4.D/§4.H); cleared whenever the room returns to `lobby`.
    pub game_started_at: Option<DateTime<Utc>>,
    /// `{created_by_name, original_host_id}` plus whatever else callers
    /// choose to stash; sanitized on write per §4.A.
    pub metadata: serde_json::Value,
}

impl Room {
    pub fn created_by_name(&self) -> Option<&str> {
        self.metadata.get("created_by_name").and_then(|v| v.as_str())
    }

    pub fn original_host_id(&self) -> Option<Uuid> {
        self.metadata
            .get("original_host_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    InGame,
    Returning,
    Abandoned,
}

impl std::str::FromStr for RoomStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lobby" => Ok(RoomStatus::Lobby),
            "in_game" => Ok(RoomStatus::InGame),
            "returning" => Ok(RoomStatus::Returning),
            "abandoned" => Ok(RoomStatus::Abandoned),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_metadata(metadata: serde_json::Value) -> Room {
        Room {
            id: Uuid::new_v4(),
            room_code: "ABC123".to_string(),
            host_id: Uuid::new_v4(),
            status: RoomStatus::Lobby,
            current_game: None,
            max_players: 8,
            is_public: true,
            streamer_mode: false,
            created_at: Utc::now(),
            last_activity: Utc::now(),
            game_started_at: None,
            metadata,
        }
    }

    #[test]
    fn created_by_name_reads_from_metadata() {
        let room = room_with_metadata(serde_json::json!({ "created_by_name": "Alice" }));
        assert_eq!(room.created_by_name(), Some("Alice"));
    }

    #[test]
    fn created_by_name_absent_is_none() {
        let room = room_with_metadata(serde_json::json!({}));
        assert_eq!(room.created_by_name(), None);
    }

    #[test]
    fn original_host_id_parses_uuid_string() {
        let id = Uuid::new_v4();
        let room = room_with_metadata(serde_json::json!({ "original_host_id": id.to_string() }));
        assert_eq!(room.original_host_id(), Some(id));
    }

    #[test]
    fn original_host_id_rejects_malformed_value() {
        let room = room_with_metadata(serde_json::json!({ "original_host_id": "not-a-uuid" }));
        assert_eq!(room.original_host_id(), None);
    }

    #[test]
    fn room_status_from_str_accepts_only_the_canonical_set() {
        assert_eq!("lobby".parse::<RoomStatus>(), Ok(RoomStatus::Lobby));
        assert_eq!("in_game".parse::<RoomStatus>(), Ok(RoomStatus::InGame));
        assert_eq!("returning".parse::<RoomStatus>(), Ok(RoomStatus::Returning));
        assert_eq!("abandoned".parse::<RoomStatus>(), Ok(RoomStatus::Abandoned));
        // Open Question (a): client aliases like `waiting_for_players`
        // are rejected rather than silently mapped.
        assert!("waiting_for_players".parse::<RoomStatus>().is_err());
    }
}
