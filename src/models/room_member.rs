use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `room_members` row: the (room, user) relation (spec §3). At most one
/// row per (room, user); `role = host` holds for exactly one connected
/// member per non-abandoned room.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub is_connected: bool,
    pub is_ready: bool,
    pub in_game: bool,
    pub current_location: Location,
    pub custom_lobby_name: Option<String>,
    pub socket_id: Option<Uuid>,
    pub last_ping: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Host,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Lobby,
    Game,
    Disconnected,
}

/// Connection-status strings accepted by
/// `updateParticipantConnection` (spec §4.B), mapped to the
/// `(is_connected, in_game, current_location)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Game,
    Disconnected,
}

impl std::str::FromStr for ConnectionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(ConnectionStatus::Connected),
            "game" => Ok(ConnectionStatus::Game),
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            _ => Err(()),
        }
    }
}

impl ConnectionStatus {
    pub fn effects(self) -> (bool, Option<bool>, Location) {
        match self {
            ConnectionStatus::Connected => (true, None, Location::Lobby),
            ConnectionStatus::Game => (true, Some(true), Location::Game),
            ConnectionStatus::Disconnected => (false, None, Location::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn connected_maps_to_lobby_without_touching_in_game() {
        assert_eq!(
            ConnectionStatus::Connected.effects(),
            (true, None, Location::Lobby)
        );
    }

    #[test]
    fn game_maps_to_in_game_true_and_location_game() {
        assert_eq!(
            ConnectionStatus::Game.effects(),
            (true, Some(true), Location::Game)
        );
    }

    #[test]
    fn disconnected_maps_to_location_disconnected() {
        assert_eq!(
            ConnectionStatus::Disconnected.effects(),
            (false, None, Location::Disconnected)
        );
    }

    #[test]
    fn from_str_rejects_unknown_status_strings() {
        assert!(ConnectionStatus::from_str("idle").is_err());
        assert!(ConnectionStatus::from_str("").is_err());
    }

    #[test]
    fn from_str_accepts_the_canonical_three() {
        assert_eq!(
            ConnectionStatus::from_str("connected").unwrap(),
            ConnectionStatus::Connected
        );
        assert_eq!(
            ConnectionStatus::from_str("game").unwrap(),
            ConnectionStatus::Game
        );
        assert_eq!(
            ConnectionStatus::from_str("disconnected").unwrap(),
            ConnectionStatus::Disconnected
        );
    }
}
