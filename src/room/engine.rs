//! Room State Machine (spec §4.D): the orchestration layer above
//! `db::room::RoomRepository` that applies join/leave/kick/transfer
//! transitions, drives the Lifecycle Grace Manager (§4.F), and keeps
//! `RoomStatus` reconciled against the aggregate connection state of a
//! room's members. Grounded on the teacher's `ws::room::engine::RoomEngine`
//! (same name, same role: the single place that mutates room state and
//! fans the result out over the room's broadcast channel).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::game::GameRepository;
use crate::db::room::RoomRepository;
use crate::db::room::create::CreateRoomOptions;
use crate::db::room_event::RoomEventRepository;
use crate::db::user::UserRepository;
use crate::errors::AppError;
use crate::events::{MailboxRegistry, PlayerView, RoomEvent, RoomMailboxHandle, next_room_version};
use crate::models::{ConnectionStatus, MemberRole, Room, RoomStatus};
use crate::registry::ConnectionRegistry;
use crate::room::grace::GraceManager;
use crate::sanitize::{sanitize_chat_message, sanitize_name, sanitize_room_code};

/// Which grace timer is currently armed for a room and, for the
/// host-transfer case, whose disconnect armed it — a reconnect only
/// cancels the timer when it's the same user coming back (spec §4.F,
/// scenarios S2/S3). `GraceManager` itself only tracks the cancellation
/// channel, not this semantic detail, so the engine keeps its own map.
#[derive(Clone, Copy, Debug)]
enum ArmedGrace {
    HostTransfer { disconnected_user_id: Uuid },
    Abandonment,
}

pub struct CreateRoomRequest {
    pub socket_id: Uuid,
    pub player_name: String,
    pub supabase_user_id: Option<Uuid>,
    pub game_type: Option<String>,
    pub max_players: Option<i32>,
    pub is_public: bool,
    pub custom_lobby_name: Option<String>,
    pub streamer_mode: bool,
}

pub struct JoinRoomRequest {
    pub socket_id: Uuid,
    pub player_name: String,
    pub room_code: String,
    pub supabase_user_id: Option<Uuid>,
    pub custom_lobby_name: Option<String>,
    /// Client's own guess at whether it's the first arrival; only
    /// honored when the room genuinely has no host yet (spec §4.D).
    pub is_host_hint: bool,
}

#[derive(Clone)]
pub struct RoomEngine {
    rooms: RoomRepository,
    users: UserRepository,
    games: GameRepository,
    room_events: RoomEventRepository,
    registry: ConnectionRegistry,
    mailboxes: MailboxRegistry,
    grace: GraceManager,
    armed: Arc<Mutex<HashMap<Uuid, ArmedGrace>>>,
}

impl RoomEngine {
    pub fn new(
        rooms: RoomRepository,
        users: UserRepository,
        games: GameRepository,
        room_events: RoomEventRepository,
        registry: ConnectionRegistry,
        mailboxes: MailboxRegistry,
        grace: GraceManager,
    ) -> Self {
        Self {
            rooms,
            users,
            games,
            room_events,
            registry,
            mailboxes,
            grace,
            armed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn resolve_user(
        &self,
        supabase_user_id: Option<Uuid>,
        player_name: &str,
    ) -> Result<crate::models::User, AppError> {
        if let Some(id) = supabase_user_id {
            return self.users.find_by_id(id).await;
        }
        self.users.ensure_guest(player_name, player_name).await
    }

    async fn snapshot(&self, room_id: Uuid) -> Result<Vec<PlayerView>, AppError> {
        let members = self.rooms.members_with_users(room_id).await?;
        Ok(members.iter().map(|(m, u)| PlayerView::from_member(m, u)).collect())
    }

    async fn mailbox(&self, room_id: Uuid) -> RoomMailboxHandle {
        self.mailboxes.handle_for(room_id, &self.registry).await
    }

    /// `createRoom` (spec §4.B/§4.D): creates the room, seats its caller
    /// as host, and sends them `roomCreated` directly (there is no one
    /// else yet to broadcast to).
    pub async fn create_room(&self, req: CreateRoomRequest) -> Result<Room, AppError> {
        let name = sanitize_name(&req.player_name).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let custom_lobby_name = req
            .custom_lobby_name
            .as_deref()
            .map(sanitize_name)
            .transpose()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let user = self.resolve_user(req.supabase_user_id, &name).await?;

        let opts = CreateRoomOptions {
            max_players: req.max_players.unwrap_or(8),
            is_public: req.is_public,
            streamer_mode: req.streamer_mode,
            current_game: req.game_type,
            created_by_name: name,
            custom_lobby_name,
        };
        let (room, _host_member) = self.rooms.create_room(user.id, opts).await?;

        self.registry.bind_identity(req.socket_id, user.id).await;
        self.registry.bind_room(req.socket_id, room.id, &room.room_code).await;

        let players = self.snapshot(room.id).await?;
        let mailbox = self.mailbox(room.id).await;
        mailbox.unicast(
            req.socket_id,
            RoomEvent::RoomCreated {
                room_version: next_room_version(),
                room: room.clone(),
                players,
                is_host: true,
            },
        );

        let _ = self
            .room_events
            .log(room.id, Some(user.id), "room_created", serde_json::json!({ "roomCode": room.room_code }))
            .await;

        Ok(room)
    }

    /// `joinRoom` (spec §4.B/§4.D): covers fresh joins, rejoins of a
    /// historical participant into an abandoned/non-accepting room, and
    /// the original-host-return auto-transfer.
    pub async fn join_room(&self, req: JoinRoomRequest) -> Result<Room, AppError> {
        let name = sanitize_name(&req.player_name).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let room_code = sanitize_room_code(&req.room_code).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let custom_lobby_name = req
            .custom_lobby_name
            .as_deref()
            .map(sanitize_name)
            .transpose()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let with_members = self.rooms.get_room_by_code(&room_code).await?;
        let room = with_members.room;
        let user = self.resolve_user(req.supabase_user_id, &name).await?;

        let is_historical = with_members
            .members
            .iter()
            .any(|(m, u)| UserRepository::matches(u, &user.id.to_string()) || UserRepository::matches(u, &name) || m.custom_lobby_name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(&name)));
        let created_by_match = room.created_by_name().is_some_and(|n| n.eq_ignore_ascii_case(&name));

        let accepting = matches!(room.status, RoomStatus::Lobby | RoomStatus::InGame);
        if !accepting && !(is_historical || created_by_match) {
            return Err(AppError::RoomNotAccepting);
        }

        let connected_count = with_members.members.iter().filter(|(m, _)| m.is_connected).count();
        if is_room_full(connected_count as i32, room.max_players) {
            return Err(AppError::RoomFull);
        }

        // spec §7 `DUPLICATE_PLAYER`: a *live* (connected) member other
        // than the joiner themself already answers to this display name.
        let duplicate = with_members.members.iter().any(|(m, u)| {
            m.is_connected && m.user_id != user.id && u.display_name.eq_ignore_ascii_case(&name)
        });
        if duplicate {
            return Err(AppError::DuplicatePlayer);
        }

        let has_host = self.rooms.has_host(room.id).await?;
        let role = if !has_host && req.is_host_hint {
            MemberRole::Host
        } else {
            MemberRole::Player
        };

        let member = self
            .rooms
            .add_participant(room.id, user.id, req.socket_id, role, custom_lobby_name.as_deref())
            .await?;

        if matches!(room.status, RoomStatus::Abandoned) {
            self.rooms.set_status(room.id, RoomStatus::Lobby).await?;
        }

        if let Some(original_host_id) = room.original_host_id() {
            if original_host_id == user.id && room.host_id != user.id {
                if let Ok(()) = self.rooms.transfer_host(room.id, room.host_id, user.id).await {
                    let mailbox = self.mailbox(room.id).await;
                    mailbox.broadcast(RoomEvent::HostTransferred {
                        room_version: next_room_version(),
                        old_host_id: room.host_id,
                        new_host_id: user.id,
                        reason: "original_host_returned".to_string(),
                    });
                }
            }
        }

        self.registry.bind_identity(req.socket_id, user.id).await;
        self.registry.bind_room(req.socket_id, room.id, &room.room_code).await;
        self.cancel_grace_on_join(room.id, user.id).await;

        let fresh_room = self.rooms.find_by_id(room.id).await?;
        let players = self.snapshot(room.id).await?;
        let mailbox = self.mailbox(room.id).await;
        let is_host = matches!(member.role, MemberRole::Host) || fresh_room.host_id == user.id;

        mailbox.unicast(
            req.socket_id,
            RoomEvent::RoomJoined {
                room_version: next_room_version(),
                room: fresh_room.clone(),
                players: players.clone(),
                is_host,
            },
        );
        mailbox.broadcast(RoomEvent::PlayerJoined {
            room_version: next_room_version(),
            player: PlayerView::from_member(&member, &user),
            players,
        });

        let _ = self
            .room_events
            .log(room.id, Some(user.id), "player_joined", serde_json::json!({}))
            .await;

        self.reconcile_status(room.id).await?;
        self.rooms.find_by_id(room.id).await
    }

    /// `joinSocketRoom` (spec §4.D/§6): rebinds an existing member's new
    /// socket to a room they already belong to — no membership mutation,
    /// just registry binding (reconnect, or a second browser tab).
    pub async fn join_socket_room(&self, socket_id: Uuid, user_id: Uuid, room_code: &str) -> Result<Room, AppError> {
        let code = sanitize_room_code(room_code).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let with_members = self.rooms.get_room_by_code(&code).await?;
        let is_member = with_members.members.iter().any(|(m, _)| m.user_id == user_id);
        if !is_member {
            return Err(AppError::NotInRoom);
        }

        self.registry.bind_room(socket_id, with_members.room.id, &with_members.room.room_code).await;
        self.cancel_grace_on_join(with_members.room.id, user_id).await;

        let room = with_members.room;
        let is_host = room.host_id == user_id;
        let players: Vec<PlayerView> = with_members
            .members
            .iter()
            .map(|(m, u)| PlayerView::from_member(m, u))
            .collect();
        self.mailbox(room.id).await.unicast(
            socket_id,
            RoomEvent::RoomJoined {
                room_version: next_room_version(),
                room: room.clone(),
                players,
                is_host,
            },
        );
        Ok(room)
    }

    async fn cancel_grace_on_join(&self, room_id: Uuid, user_id: Uuid) {
        let mut armed = self.armed.lock().await;
        let cancel = match armed.get(&room_id) {
            Some(ArmedGrace::Abandonment) => true,
            Some(ArmedGrace::HostTransfer { disconnected_user_id }) => *disconnected_user_id == user_id,
            None => false,
        };
        if cancel {
            armed.remove(&room_id);
            drop(armed);
            self.grace.cancel(room_id).await;
        }
    }

    /// Explicit `leaveRoom`: the member row is kept (`is_connected =
    /// false`) so a later rejoin can still match as a historical
    /// participant, distinct from `kick_player`'s hard delete.
    pub async fn leave_room(&self, room_id: Uuid, user_id: Uuid, socket_id: Uuid) -> Result<(), AppError> {
        self.rooms
            .update_participant_connection(room_id, user_id, ConnectionStatus::Disconnected, None)
            .await?;
        self.registry.unbind_room(socket_id).await;

        let players = self.snapshot(room_id).await?;
        self.mailbox(room_id).await.broadcast(RoomEvent::PlayerLeft {
            room_version: next_room_version(),
            user_id,
            players,
        });

        let _ = self.room_events.log(room_id, Some(user_id), "player_left", serde_json::json!({})).await;

        self.arm_grace_if_needed(room_id, user_id).await?;
        self.reconcile_status(room_id).await?;
        Ok(())
    }

    /// Implicit socket-close disconnect (spec §4.G): same state
    /// transition as `leave_room` but broadcasts `playerDisconnected`
    /// instead of `playerLeft`, letting clients distinguish the two.
    pub async fn handle_disconnect(&self, room_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.rooms
            .update_participant_connection(room_id, user_id, ConnectionStatus::Disconnected, None)
            .await?;

        let players = self.snapshot(room_id).await?;
        self.mailbox(room_id).await.broadcast(RoomEvent::PlayerDisconnected {
            room_version: next_room_version(),
            user_id,
            players,
        });

        self.arm_grace_if_needed(room_id, user_id).await?;
        self.reconcile_status(room_id).await?;
        Ok(())
    }

    async fn arm_grace_if_needed(&self, room_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let room = match self.rooms.find_by_id(room_id).await {
            Ok(room) => room,
            Err(AppError::RoomNotFound) => return Ok(()),
            Err(err) => return Err(err),
        };
        let members = self.rooms.members_with_users(room_id).await?;
        let was_host = room.host_id == user_id;
        let other_connected = members.iter().filter(|(m, _)| m.user_id != user_id && m.is_connected).count();

        match grace_decision(was_host, other_connected) {
            Some(GraceDecision::HostTransfer) => self.arm_host_transfer(room_id, user_id).await,
            Some(GraceDecision::Abandonment) => self.arm_abandonment(room_id).await,
            None => {}
        }
        Ok(())
    }

    async fn arm_host_transfer(&self, room_id: Uuid, disconnected_user_id: Uuid) {
        {
            let mut armed = self.armed.lock().await;
            armed.insert(room_id, ArmedGrace::HostTransfer { disconnected_user_id });
        }

        let rooms = self.rooms.clone();
        let mailboxes = self.mailboxes.clone();
        let registry = self.registry.clone();
        let room_events = self.room_events.clone();
        let armed = self.armed.clone();
        let duration = self.grace.host_transfer_duration();

        self.grace
            .arm(room_id, duration, async move {
                armed.lock().await.remove(&room_id);
                match rooms.auto_transfer_host(room_id, disconnected_user_id).await {
                    Ok(Some(new_host)) => {
                        let mailbox = mailboxes.handle_for(room_id, &registry).await;
                        mailbox.broadcast(RoomEvent::HostTransferred {
                            room_version: next_room_version(),
                            old_host_id: disconnected_user_id,
                            new_host_id: new_host.user_id,
                            reason: "host_disconnect_grace_period_expired".to_string(),
                        });
                        let _ = room_events
                            .log(
                                room_id,
                                Some(new_host.user_id),
                                "host_transferred",
                                serde_json::json!({ "reason": "host_disconnect_grace_period_expired" }),
                            )
                            .await;
                    }
                    Ok(None) => {
                        tracing::debug!(room_id = %room_id, "host-transfer grace expired with no eligible member");
                    }
                    Err(err) => {
                        tracing::warn!(room_id = %room_id, error = %err, "auto host transfer failed");
                    }
                }
            })
            .await;
    }

    async fn arm_abandonment(&self, room_id: Uuid) {
        {
            let mut armed = self.armed.lock().await;
            armed.insert(room_id, ArmedGrace::Abandonment);
        }

        let rooms = self.rooms.clone();
        let mailboxes = self.mailboxes.clone();
        let armed = self.armed.clone();
        let duration = self.grace.abandonment_duration();

        self.grace
            .arm(room_id, duration, async move {
                armed.lock().await.remove(&room_id);
                if let Err(err) = rooms.set_status(room_id, RoomStatus::Abandoned).await {
                    tracing::warn!(room_id = %room_id, error = %err, "failed to mark room abandoned");
                }
                mailboxes.remove(room_id).await;
            })
            .await;
    }

    /// `selectGame(roomCode, gameType)` — host-only (spec §4.D).
    pub async fn select_game(&self, room_id: Uuid, caller_user_id: Uuid, game_type: String) -> Result<(), AppError> {
        let room = self.rooms.find_by_id(room_id).await?;
        if room.host_id != caller_user_id {
            return Err(AppError::NotHost);
        }
        if self.games.find_active_by_name(&game_type).await?.is_none() {
            return Err(AppError::InvalidInput(format!("unknown or inactive game type '{game_type}'")));
        }
        self.rooms.set_current_game(room_id, Some(&game_type)).await?;
        self.mailbox(room_id).await.broadcast(RoomEvent::GameSelected {
            room_version: next_room_version(),
            game_type,
            settings: serde_json::json!({}),
        });
        Ok(())
    }

    /// `playerReturnToLobby` (spec §4.D): the caller drops their own
    /// `in_game`/`current_location`, then the room status is
    /// reconciled — a majority back in the lobby flips the whole room.
    pub async fn player_return_to_lobby(&self, room_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.rooms.return_to_lobby(room_id, user_id).await?;
        let players = self.snapshot(room_id).await?;
        self.mailbox(room_id).await.broadcast(RoomEvent::PlayersUpdated {
            room_version: next_room_version(),
            players,
        });
        self.reconcile_status(room_id).await
    }

    /// `transferHost` (spec §4.B/§4.D) — manual, host-initiated.
    pub async fn transfer_host(&self, room_id: Uuid, caller_user_id: Uuid, target_user_id: Uuid) -> Result<(), AppError> {
        let room = self.rooms.find_by_id(room_id).await?;
        if room.host_id != caller_user_id {
            return Err(AppError::NotHost);
        }
        self.rooms.transfer_host(room_id, caller_user_id, target_user_id).await?;
        self.mailbox(room_id).await.broadcast(RoomEvent::HostTransferred {
            room_version: next_room_version(),
            old_host_id: caller_user_id,
            new_host_id: target_user_id,
            reason: "manual".to_string(),
        });
        let _ = self
            .room_events
            .log(room_id, Some(caller_user_id), "host_transferred", serde_json::json!({ "reason": "manual" }))
            .await;
        Ok(())
    }

    /// `kickPlayer` (spec §4.B/§4.D): host-only, cannot target self
    /// (`CANNOT_KICK_HOST`). The kicked socket(s) get the event unicast
    /// before being unbound so they still learn why their room view
    /// just emptied out.
    pub async fn kick_player(&self, room_id: Uuid, caller_user_id: Uuid, target_user_id: Uuid) -> Result<(), AppError> {
        let room = self.rooms.find_by_id(room_id).await?;
        if room.host_id != caller_user_id {
            return Err(AppError::NotHost);
        }
        if target_user_id == caller_user_id {
            return Err(AppError::CannotKickHost);
        }

        let caller = self.users.find_by_id(caller_user_id).await?;
        self.rooms.remove_participant(room_id, target_user_id).await?;

        let target_sockets = self.registry.sockets_for_user(target_user_id).await;
        let players = self.snapshot(room_id).await?;
        let mailbox = self.mailbox(room_id).await;

        let event = RoomEvent::PlayerKicked {
            room_version: next_room_version(),
            target_user_id,
            kicked_by: caller.display_name.clone(),
            players: players.clone(),
        };
        for socket_id in &target_sockets {
            mailbox.unicast(*socket_id, event.clone());
        }
        for socket_id in target_sockets {
            self.registry.unbind_room(socket_id).await;
        }
        mailbox.broadcast(event);

        let _ = self
            .room_events
            .log(room_id, Some(caller_user_id), "player_kicked", serde_json::json!({ "targetUserId": target_user_id }))
            .await;

        self.reconcile_status(room_id).await
    }

    /// `changeRoomStatus` (spec §4.D): manual, unauthenticated caller
    /// path — any connected member may request it (host-gating applies
    /// only to `autoUpdateRoomStatus`'s host-driven variant below).
    pub async fn change_room_status(&self, room_id: Uuid, new_status: &str) -> Result<(), AppError> {
        self.apply_status_change(room_id, new_status, false, "manual").await
    }

    /// `autoUpdateRoomStatus` (spec §4.D) — host-only, used by clients
    /// to report transitions the server didn't itself observe (e.g. a
    /// client-side "returning" screen).
    pub async fn auto_update_room_status(
        &self,
        room_id: Uuid,
        caller_user_id: Uuid,
        new_status: &str,
        reason: &str,
    ) -> Result<(), AppError> {
        let room = self.rooms.find_by_id(room_id).await?;
        if room.host_id != caller_user_id {
            return Err(AppError::NotHost);
        }
        self.apply_status_change(room_id, new_status, true, reason).await
    }

    /// Open Question (a): only `{lobby, in_game, returning}` are valid
    /// targets for an explicit status-change request; `abandoned` is
    /// reachable only through the grace-timer expiry path above.
    async fn apply_status_change(&self, room_id: Uuid, new_status: &str, is_automatic: bool, reason: &str) -> Result<(), AppError> {
        let status: RoomStatus = new_status
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("unknown room status '{new_status}'")))?;
        if !matches!(status, RoomStatus::Lobby | RoomStatus::InGame | RoomStatus::Returning) {
            return Err(AppError::InvalidInput("status must be lobby, in_game, or returning".to_string()));
        }

        let room = self.rooms.find_by_id(room_id).await?;
        let old_status = room.status;
        self.rooms.set_status(room_id, status).await?;
        self.mailbox(room_id).await.broadcast(RoomEvent::RoomStatusChanged {
            room_version: next_room_version(),
            old_status,
            new_status: status,
            is_automatic,
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Updates a member's lobby display-name override mid-session.
    pub async fn update_custom_lobby_name(&self, room_id: Uuid, user_id: Uuid, custom_lobby_name: &str) -> Result<(), AppError> {
        let sanitized = sanitize_name(custom_lobby_name).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        self.rooms.set_custom_lobby_name(room_id, user_id, &sanitized).await?;
        let players = self.snapshot(room_id).await?;
        self.mailbox(room_id).await.broadcast(RoomEvent::PlayersUpdated {
            room_version: next_room_version(),
            players,
        });
        Ok(())
    }

    /// `sendMessage` (spec §4.D/§4.G): sanitized, broadcast, logged.
    /// Callers must have already confirmed the sender is bound to a
    /// lobby room — chat from a socket with no room binding is dropped
    /// before it ever reaches this method.
    pub async fn send_chat_message(&self, room_id: Uuid, user_id: Uuid, display_name: &str, message: &str) -> Result<(), AppError> {
        let sanitized = sanitize_chat_message(message).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        self.mailbox(room_id).await.broadcast(RoomEvent::ChatMessage {
            room_version: next_room_version(),
            id: Uuid::new_v4(),
            player_name: display_name.to_string(),
            message: sanitized,
            ts: chrono::Utc::now().timestamp_millis(),
        });
        let _ = self.room_events.log(room_id, Some(user_id), "chat_message", serde_json::json!({})).await;
        Ok(())
    }

    /// `getActiveRooms` (spec §4.B), exposed at the engine layer so the
    /// WS handler never touches `RoomRepository` directly.
    pub async fn get_public_rooms(&self, game_type: Option<&str>) -> Result<Vec<Room>, AppError> {
        self.rooms.get_active_rooms(game_type).await
    }

    /// Smart room-status reconciliation (spec §4.D): after any join,
    /// leave, disconnect, or return-to-lobby, checks whether the
    /// aggregate member state now disagrees with `status` and flips it
    /// automatically. A no-op once the room is `abandoned` — only a
    /// join can revive one of those.
    async fn reconcile_status(&self, room_id: Uuid) -> Result<(), AppError> {
        let room = match self.rooms.find_by_id(room_id).await {
            Ok(room) => room,
            Err(AppError::RoomNotFound) => return Ok(()),
            Err(err) => return Err(err),
        };
        if matches!(room.status, RoomStatus::Abandoned) {
            return Ok(());
        }

        let members = self.rooms.members_with_users(room_id).await?;
        let total = members.len();
        if total == 0 {
            return Ok(());
        }
        let in_game_count = members.iter().filter(|(m, _)| m.current_location == crate::models::Location::Game).count();
        let in_lobby_count = members.iter().filter(|(m, _)| m.current_location == crate::models::Location::Lobby).count();

        let transition = status_transition(room.status, total, in_game_count, in_lobby_count);

        if let Some((new_status, reason)) = transition {
            let old_status = room.status;
            self.rooms.set_status(room_id, new_status).await?;
            self.mailbox(room_id).await.broadcast(RoomEvent::RoomStatusChanged {
                room_version: next_room_version(),
                old_status,
                new_status,
                is_automatic: true,
                reason: reason.to_string(),
            });
        }
        Ok(())
    }
}

/// spec §3: a room's connected-member count must never exceed
/// `max_players`. Split out from `join_room` so capacity enforcement has
/// coverage that doesn't need a database.
fn is_room_full(connected_count: i32, max_players: i32) -> bool {
    connected_count >= max_players
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraceDecision {
    HostTransfer,
    Abandonment,
}

/// Which grace timer a disconnect should arm, if any (spec §4.F). The
/// host disconnecting with others still around needs a hand-off window;
/// everyone disconnecting needs an abandonment window; anything else
/// (a non-host disconnecting while others remain) needs neither.
fn grace_decision(was_host: bool, other_connected: usize) -> Option<GraceDecision> {
    if was_host && other_connected > 0 {
        Some(GraceDecision::HostTransfer)
    } else if other_connected == 0 {
        Some(GraceDecision::Abandonment)
    } else {
        None
    }
}

/// Smart room-status reconciliation's transition table (spec §4.D),
/// split out from `reconcile_status` so it's testable without a pool.
fn status_transition(
    current: RoomStatus,
    total: usize,
    in_game_count: usize,
    in_lobby_count: usize,
) -> Option<(RoomStatus, &'static str)> {
    match current {
        RoomStatus::InGame if in_game_count == 0 => Some((RoomStatus::Lobby, "no_active_players")),
        RoomStatus::InGame if in_lobby_count >= (total + 1) / 2 => Some((RoomStatus::Lobby, "majority_in_lobby")),
        RoomStatus::Lobby if in_game_count >= 2 => Some((RoomStatus::InGame, "majority_in_game")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_full_at_capacity_not_over() {
        assert!(!is_room_full(1, 2));
        assert!(is_room_full(2, 2));
        assert!(is_room_full(3, 2));
    }

    #[test]
    fn grace_decision_host_disconnect_with_others_arms_transfer() {
        assert_eq!(grace_decision(true, 1), Some(GraceDecision::HostTransfer));
    }

    #[test]
    fn grace_decision_last_member_leaving_arms_abandonment() {
        assert_eq!(grace_decision(true, 0), Some(GraceDecision::Abandonment));
        assert_eq!(grace_decision(false, 0), Some(GraceDecision::Abandonment));
    }

    #[test]
    fn grace_decision_non_host_disconnect_with_others_arms_nothing() {
        assert_eq!(grace_decision(false, 1), None);
    }

    #[test]
    fn status_transition_in_game_with_no_active_players_reverts_to_lobby() {
        let transition = status_transition(RoomStatus::InGame, 3, 0, 2);
        assert_eq!(transition, Some((RoomStatus::Lobby, "no_active_players")));
    }

    #[test]
    fn status_transition_in_game_majority_back_in_lobby_reverts() {
        // 4 members, 2 in lobby is a majority of (4+1)/2 = 2.
        let transition = status_transition(RoomStatus::InGame, 4, 2, 2);
        assert_eq!(transition, Some((RoomStatus::Lobby, "majority_in_lobby")));
    }

    #[test]
    fn status_transition_in_game_minority_in_lobby_stays() {
        let transition = status_transition(RoomStatus::InGame, 4, 3, 1);
        assert_eq!(transition, None);
    }

    #[test]
    fn status_transition_lobby_with_two_in_game_flips_to_in_game() {
        let transition = status_transition(RoomStatus::Lobby, 3, 2, 1);
        assert_eq!(transition, Some((RoomStatus::InGame, "majority_in_game")));
    }

    #[test]
    fn status_transition_lobby_with_one_in_game_stays() {
        let transition = status_transition(RoomStatus::Lobby, 3, 1, 2);
        assert_eq!(transition, None);
    }

    #[test]
    fn status_transition_abandoned_room_never_transitions() {
        assert_eq!(status_transition(RoomStatus::Abandoned, 2, 2, 0), None);
        assert_eq!(status_transition(RoomStatus::Returning, 2, 2, 0), None);
    }
}
