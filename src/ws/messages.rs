//! Inbound socket protocol (spec §6's inbound-event table). Grounded on
//! the teacher's `ws::room::messages::RoomClientMessage` — an internally
//! tagged enum keyed on a `type` discriminant, one variant per accepted
//! event, with everything else ignored by `serde`'s default untagged
//! fallthrough at the call site (§9: "unknown events produce
//! `INVALID_INPUT`", handled explicitly in `handler.rs` rather than
//! relying on a deserialize failure).

use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        player_name: String,
        game_type: Option<String>,
        max_players: Option<i32>,
        #[serde(default)]
        is_public: bool,
        custom_lobby_name: Option<String>,
        #[serde(default)]
        streamer_mode: bool,
        supabase_user_id: Option<Uuid>,
    },
    JoinRoom {
        player_name: String,
        room_code: String,
        custom_lobby_name: Option<String>,
        #[serde(default)]
        is_host_hint: bool,
        supabase_user_id: Option<Uuid>,
    },
    LeaveRoom {
        room_code: String,
    },
    GetPublicRooms {
        game_type: Option<String>,
    },
    JoinSocketRoom {
        room_code: String,
    },
    SelectGame {
        room_code: String,
        game_type: String,
    },
    StartGame {
        room_code: String,
    },
    PlayerReturnToLobby {
        room_code: String,
        player_name: String,
    },
    TransferHost {
        room_code: String,
        target_user_id: Uuid,
    },
    KickPlayer {
        room_code: String,
        target_user_id: Uuid,
    },
    ChangeRoomStatus {
        room_code: String,
        new_status: String,
    },
    AutoUpdateRoomStatus {
        room_code: String,
        new_status: String,
        reason: String,
    },
    #[serde(rename = "profile_updated")]
    ProfileUpdated {
        room_code: String,
        user_id: Uuid,
        custom_lobby_name: Option<String>,
    },
    Heartbeat,
    #[serde(rename = "chat:message")]
    ChatMessage { message: String },
    #[serde(rename = "minigame:click")]
    MinigameClick {
        score: Option<i64>,
        time: Option<i64>,
    },
    #[serde(rename = "tugOfWar:pull")]
    TugOfWarPull,
    #[serde(rename = "user:identify")]
    UserIdentify { user_id: Uuid },
    #[serde(rename = "game:invite")]
    GameInvite {
        target_user_id: Uuid,
        room_code: String,
        game_name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_parses_with_optional_fields_omitted() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"createRoom","playerName":"Alice"}"#).unwrap();
        match msg {
            ClientMessage::CreateRoom { player_name, is_public, streamer_mode, max_players, .. } => {
                assert_eq!(player_name, "Alice");
                assert!(!is_public);
                assert!(!streamer_mode);
                assert_eq!(max_players, None);
            }
            other => panic!("expected CreateRoom, got {other:?}"),
        }
    }

    #[test]
    fn join_room_requires_room_code_and_player_name() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"joinRoom","playerName":"Bob","roomCode":"abc123"}"#).unwrap();
        match msg {
            ClientMessage::JoinRoom { player_name, room_code, is_host_hint, .. } => {
                assert_eq!(player_name, "Bob");
                assert_eq!(room_code, "abc123");
                assert!(!is_host_hint);
            }
            other => panic!("expected JoinRoom, got {other:?}"),
        }
    }

    #[test]
    fn colon_namespaced_events_parse_by_their_literal_tag() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"chat:message","message":"hi"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::ChatMessage { message } if message == "hi"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"user:identify","userId":"00000000-0000-0000-0000-000000000001"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::UserIdentify { .. }));
    }

    #[test]
    fn unknown_event_type_fails_to_parse() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"totallyUnknownEvent"}"#);
        assert!(result.is_err(), "unknown events must not parse into any variant (spec §9)");
    }

    #[test]
    fn heartbeat_and_tug_of_war_carry_no_fields() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Heartbeat));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"tugOfWar:pull"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::TugOfWarPull));
    }
}
