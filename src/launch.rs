//! Game Launch Service (spec §4.H). Grounded on the teacher's
//! batched-insert style in `db/*/create.rs` and the `Starting`-status
//! background task in `ws::room::engine` for the
//! "spawn a task that sleeps then broadcasts" shape.

use rand::RngCore;
use rand::rng;
use uuid::Uuid;

use crate::db::game::GameRepository;
use crate::db::game_session::{GameSessionRepository, create::NewGameSession};
use crate::db::room::RoomRepository;
use crate::errors::AppError;
use crate::events::{MailboxRegistry, RoomEvent, next_room_version};
use crate::models::{MemberRole, RoomMember, RoomStatus};
use crate::registry::ConnectionRegistry;

const HOST_DELAY_OTHERS: std::time::Duration = std::time::Duration::from_millis(2000);

#[derive(Clone)]
pub struct LaunchService {
    rooms: RoomRepository,
    sessions: GameSessionRepository,
    games: GameRepository,
    registry: ConnectionRegistry,
    mailboxes: MailboxRegistry,
}

impl LaunchService {
    pub fn new(
        rooms: RoomRepository,
        sessions: GameSessionRepository,
        games: GameRepository,
        registry: ConnectionRegistry,
        mailboxes: MailboxRegistry,
    ) -> Self {
        Self {
            rooms,
            sessions,
            games,
            registry,
            mailboxes,
        }
    }

    /// `startGame(roomCode)` (spec §4.D/§4.H). Preconditions: caller is
    /// host, room is `lobby` (the transition table has no
    /// `in_game -> startGame` row — a second call while already
    /// launched must not re-mint sessions or re-broadcast), room has
    /// `current_game` set, ≥2 connected members.
    pub async fn start_game(&self, room_id: Uuid, caller_user_id: Uuid) -> Result<(), AppError> {
        let room = self.rooms.find_by_id(room_id).await?;
        if room.host_id != caller_user_id {
            return Err(AppError::NotHost);
        }
        if room.status != RoomStatus::Lobby {
            return Err(AppError::InvalidInput("room is not accepting a launch from its current status".to_string()));
        }
        let Some(game_type) = room.current_game.clone() else {
            return Err(AppError::InvalidInput("no game selected".to_string()));
        };
        let game = self.games.find_active_by_name(&game_type).await?.ok_or_else(|| {
            AppError::InvalidInput(format!("unknown or inactive game type {game_type}"))
        })?;

        let members = self.rooms.members_with_users(room_id).await?;
        let connected: Vec<RoomMember> = members
            .into_iter()
            .filter(|(m, _)| m.is_connected)
            .map(|(m, _)| m)
            .collect();
        if connected.len() < 2 {
            return Err(AppError::InvalidInput(
                "at least 2 connected members required to start".to_string(),
            ));
        }

        let mut new_sessions = Vec::with_capacity(connected.len());
        let mut tokens_by_user = std::collections::HashMap::new();
        for member in &connected {
            let token = random_session_token();
            tokens_by_user.insert(member.user_id, token.clone());
            new_sessions.push(NewGameSession {
                session_token: token,
                room_id,
                room_code: room.room_code.clone(),
                player_id: member.user_id,
                game_type: game_type.clone(),
                streamer_mode: room.streamer_mode,
                metadata: serde_json::json!({ "is_host": member.role == MemberRole::Host }),
            });
        }

        // §4.H: "if any step fails, the room reverts to lobby ... no
        // tokens are issued to clients". Mint sessions before touching
        // room/member state or broadcasting anything, so a failure here
        // leaves the room exactly as it was — still `lobby`, no member
        // flipped to `in_game`, nothing sent to any client.
        self.sessions.create_batch(new_sessions).await?;

        self.rooms.mark_game_started(room_id).await?;
        let updated_members = self.rooms.mark_all_connected_in_game(room_id).await?;

        let mailbox = self.mailboxes.handle_for(room_id, &self.registry).await;
        mailbox.broadcast(RoomEvent::RoomStatusChanged {
            room_version: next_room_version(),
            old_status: RoomStatus::Lobby,
            new_status: RoomStatus::InGame,
            is_automatic: false,
            reason: "game_started".to_string(),
        });

        let players_snapshot: Vec<crate::events::PlayerView> = self
            .rooms
            .members_with_users(room_id)
            .await?
            .iter()
            .map(|(m, u)| crate::events::PlayerView::from_member(m, u))
            .collect();
        mailbox.broadcast(RoomEvent::PlayersUpdated {
            room_version: next_room_version(),
            players: players_snapshot,
        });
        let host_member = updated_members
            .iter()
            .find(|m| m.role == MemberRole::Host)
            .cloned();

        if let Some(host) = host_member {
            // Host receives it first, delay 0 (spec §4.H step 5).
            dispatch_launch_to(&mailbox, &self.registry, &game, &host, &tokens_by_user, true).await;
        }

        let others: Vec<RoomMember> = updated_members
            .into_iter()
            .filter(|m| m.role != MemberRole::Host)
            .collect();
        let game_clone = game.clone();
        let tokens_clone = tokens_by_user.clone();
        let mailbox_clone = mailbox.clone();
        let registry_clone = self.registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(HOST_DELAY_OTHERS).await;
            for member in others {
                dispatch_launch_to(&mailbox_clone, &registry_clone, &game_clone, &member, &tokens_clone, false).await;
            }
        });

        Ok(())
    }
}

async fn dispatch_launch_to(
    mailbox: &crate::events::RoomMailboxHandle,
    registry: &ConnectionRegistry,
    game: &crate::models::Game,
    member: &RoomMember,
    tokens: &std::collections::HashMap<Uuid, String>,
    is_host: bool,
) {
    let Some(token) = tokens.get(&member.user_id) else {
        return;
    };
    let game_url = launch_url(&game.base_url, token, is_host);
    let sockets = registry.sockets_for_user(member.user_id).await;
    let event = RoomEvent::GameStarted {
        room_version: next_room_version(),
        game_url,
        game_type: game.name.clone(),
        is_host,
    };
    for socket_id in sockets {
        mailbox.unicast(socket_id, event.clone());
    }
}

fn launch_url(base_url: &str, session_token: &str, is_host: bool) -> String {
    if is_host {
        format!("{base_url}?session={session_token}&role=gm")
    } else {
        format!("{base_url}?session={session_token}")
    }
}

/// 32 random bytes, hex-encoded (64 hex chars), per spec §4.H.
fn random_session_token() -> String {
    let mut bytes = [0u8; 32];
    rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
