//! Event Bus / Fan-out (spec §4.G) — typed outbound event catalogue plus
//! the per-room mailbox that replaces the teacher's spawn-per-send
//! broadcast helpers. See `mailbox` for the ordering redesign.

mod mailbox;

pub use mailbox::{MailboxRegistry, RoomMailbox, RoomMailboxHandle, next_room_version};

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Room, RoomMember, User};

/// `{role, memberId, user}` used by the `players[]` arrays in room
/// snapshots and deltas (spec §4.G's "full players[]").
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub user_id: Uuid,
    pub display_name: String,
    pub is_host: bool,
    pub is_connected: bool,
    pub in_game: bool,
    pub current_location: crate::models::Location,
    pub custom_lobby_name: Option<String>,
}

impl PlayerView {
    pub fn from_member(member: &RoomMember, user: &User) -> Self {
        Self {
            user_id: member.user_id,
            display_name: user.display_name.clone(),
            is_host: matches!(member.role, crate::models::MemberRole::Host),
            is_connected: member.is_connected,
            in_game: member.in_game,
            current_location: member.current_location,
            custom_lobby_name: member.custom_lobby_name.clone(),
        }
    }
}

/// Server→room, server→user, and server→socket events (spec §4.G's
/// catalogue table), tagged the way the teacher tags
/// `RoomServerMessage`. Every room-scoped variant carries `room_version`
/// — a monotonic epoch-millis stamp clients use to reject stale
/// updates — stamped by the mailbox at enqueue time, not by the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoomEvent {
    RoomCreated {
        room_version: i64,
        room: Room,
        players: Vec<PlayerView>,
        is_host: bool,
    },
    RoomJoined {
        room_version: i64,
        room: Room,
        players: Vec<PlayerView>,
        is_host: bool,
    },
    PlayerJoined {
        room_version: i64,
        player: PlayerView,
        players: Vec<PlayerView>,
    },
    PlayerLeft {
        room_version: i64,
        user_id: Uuid,
        players: Vec<PlayerView>,
    },
    PlayerDisconnected {
        room_version: i64,
        user_id: Uuid,
        players: Vec<PlayerView>,
    },
    PlayerKicked {
        room_version: i64,
        target_user_id: Uuid,
        kicked_by: String,
        players: Vec<PlayerView>,
    },
    HostTransferred {
        room_version: i64,
        old_host_id: Uuid,
        new_host_id: Uuid,
        reason: String,
    },
    RoomStatusChanged {
        room_version: i64,
        old_status: crate::models::RoomStatus,
        new_status: crate::models::RoomStatus,
        is_automatic: bool,
        reason: String,
    },
    GameSelected {
        room_version: i64,
        game_type: String,
        settings: serde_json::Value,
    },
    GameStarted {
        room_version: i64,
        game_url: String,
        game_type: String,
        is_host: bool,
    },
    #[serde(rename = "chat:message")]
    ChatMessage {
        room_version: i64,
        id: Uuid,
        player_name: String,
        message: String,
        ts: i64,
    },
    /// Generic full-roster refresh for state changes with no dedicated
    /// variant of their own (profile updates, return-to-lobby, the
    /// post-launch `playerStatusUpdated` step of §4.H). Grounded on the
    /// teacher's `RoomServerMessage::PlayerUpdated { players }`; wire tag
    /// kept as the spec's own name for the §4.H step rather than a
    /// camelCased variant name.
    #[serde(rename = "playerStatusUpdated")]
    PlayersUpdated {
        room_version: i64,
        players: Vec<PlayerView>,
    },
}

/// Per-user and per-socket events: never ordered against a room
/// channel, so they bypass the mailbox and are sent directly.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DirectEvent {
    #[serde(rename = "friend:online")]
    FriendOnline { user_id: Uuid },
    #[serde(rename = "friend:offline")]
    FriendOffline { user_id: Uuid },
    #[serde(rename = "friend:list-online")]
    FriendListOnline { user_ids: Vec<Uuid> },
    #[serde(rename = "game:invite_received")]
    GameInviteReceived {
        room_id: Uuid,
        game_name: String,
        host_name: String,
        sender_id: Uuid,
    },
    #[serde(rename = "achievement:unlocked")]
    AchievementUnlocked { achievements: Vec<String> },
    Error { message: String, code: String },
    KickFailed { message: String, code: String },
}
