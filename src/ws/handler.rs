//! The single WebSocket upgrade route and its per-socket read/write
//! loop (spec §5/§6). Grounded on the teacher's `ws::handler::ws_handler`
//! split-socket, mpsc-relayed-writer shape; the inbound dispatch switch
//! is new, since the event catalogue itself is new.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::extractors::WsAuth;
use crate::auth::jwt::Claims;
use crate::errors::AppError;
use crate::events::DirectEvent;
use crate::registry::RateLimitedAction;
use crate::room::engine::{CreateRoomRequest, JoinRoomRequest};
use crate::sanitize::{sanitize_name, sanitize_room_code};
use crate::state::AppState;
use crate::ws::messages::ClientMessage;

const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SOCKET_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const SERVER_PING_INTERVAL: Duration = Duration::from_secs(25);
const CREATE_LOCK_SLOT: &str = "__create__";
const MINIGAME_SCORE_MAX: i64 = 10_000;
const MINIGAME_TIME_MAX: i64 = 60_000;

pub async fn ws_handler(
    State(state): State<AppState>,
    WsAuth(claims): WsAuth,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, claims))
}

async fn handle_socket(socket: WebSocket, state: AppState, claims: Option<Claims>) {
    let socket_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.registry.register(socket_id, tx.clone()).await;

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let pinger = {
        let ping_tx = tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SERVER_PING_INTERVAL);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                if ping_tx.send(Message::Ping(Vec::new().into())).is_err() {
                    break;
                }
            }
        })
    };

    if let Some(claims) = &claims {
        if let Ok(user_id) = claims.user_id() {
            state.registry.bind_identity(socket_id, user_id).await;
        }
    }

    loop {
        let next = tokio::time::timeout(SOCKET_IDLE_TIMEOUT, stream.next()).await;
        let frame = match next {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(err))) => {
                tracing::debug!(%socket_id, error = %err, "websocket read error");
                break;
            }
            Ok(None) | Err(_) => break,
        };

        state.registry.touch(socket_id).await;
        match frame {
            Message::Text(text) => dispatch(&state, socket_id, &claims, text.as_str()).await,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    pinger.abort();
    let conn = state.registry.unregister(socket_id).await;
    writer.abort();

    if let Some(conn) = conn {
        if let (Some(room_id), Some(user_id)) = (conn.room_id, conn.user_id) {
            if let Err(err) = state.room_engine.handle_disconnect(room_id, user_id).await {
                tracing::warn!(%socket_id, error = %err, "disconnect handling failed");
            }
        }
        if let Some(user_id) = conn.user_id {
            if let Err(err) = state.friends.announce_offline(user_id).await {
                tracing::warn!(%socket_id, error = %err, "friend offline announce failed");
            }
        }
    }
}

/// A parse failure — whether the `type` tag itself is unrecognized or a
/// known tag is missing/malformed required fields — reports
/// `INVALID_INPUT` to the caller (spec §9's design notes: "unknown
/// events produce `INVALID_INPUT` rather than silent acceptance").
async fn dispatch(state: &AppState, socket_id: Uuid, claims: &Option<Claims>, text: &str) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(err) => {
            tracing::debug!(%socket_id, error = %err, "rejecting unparseable/unknown client message");
            send_error(state, socket_id, AppError::InvalidInput("unrecognized or malformed message".to_string())).await;
            return;
        }
    };

    let action = rate_limit_action(&msg);
    if state.registry.is_rate_limited(socket_id, action).await {
        send_error(state, socket_id, AppError::RateLimited).await;
        return;
    }
    state.registry.track_attempt(socket_id, action).await;

    match msg {
        ClientMessage::CreateRoom {
            player_name,
            game_type,
            max_players,
            is_public,
            custom_lobby_name,
            streamer_mode,
            supabase_user_id,
        } => {
            let supabase_user_id = resolve_caller_id(supabase_user_id, claims);
            if !state.registry.acquire_lock(&player_name, CREATE_LOCK_SLOT, socket_id).await {
                send_error(state, socket_id, AppError::ConnectionInProgress).await;
                return;
            }
            let req = CreateRoomRequest {
                socket_id,
                player_name: player_name.clone(),
                supabase_user_id,
                game_type,
                max_players,
                is_public,
                custom_lobby_name,
                streamer_mode,
            };
            let result = tokio::time::timeout(JOIN_HANDSHAKE_TIMEOUT, state.room_engine.create_room(req)).await;
            state.registry.release_lock(&player_name, CREATE_LOCK_SLOT, socket_id).await;
            handle_handshake_result(state, socket_id, result).await;
        }

        ClientMessage::JoinRoom {
            player_name,
            room_code,
            custom_lobby_name,
            is_host_hint,
            supabase_user_id,
        } => {
            let supabase_user_id = resolve_caller_id(supabase_user_id, claims);
            if !state.registry.acquire_lock(&player_name, &room_code, socket_id).await {
                send_error(state, socket_id, AppError::ConnectionInProgress).await;
                return;
            }
            let req = JoinRoomRequest {
                socket_id,
                player_name: player_name.clone(),
                room_code: room_code.clone(),
                supabase_user_id,
                custom_lobby_name,
                is_host_hint,
            };
            let result = tokio::time::timeout(JOIN_HANDSHAKE_TIMEOUT, state.room_engine.join_room(req)).await;
            state.registry.release_lock(&player_name, &room_code, socket_id).await;
            handle_handshake_result(state, socket_id, result).await;
        }

        ClientMessage::LeaveRoom { room_code } => {
            let Some((_, user_id)) = current(state, socket_id).await else {
                return;
            };
            let Ok(room_id) = room_id_for_code(state, socket_id, &room_code).await else {
                return;
            };
            if let Err(err) = state.room_engine.leave_room(room_id, user_id, socket_id).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::GetPublicRooms { game_type } => {
            match state.room_engine.get_public_rooms(game_type.as_deref()).await {
                Ok(rooms) => {
                    let payload = serde_json::json!({ "type": "publicRooms", "rooms": rooms });
                    send_json(state, socket_id, &payload).await;
                }
                Err(err) => send_error(state, socket_id, err).await,
            }
        }

        ClientMessage::JoinSocketRoom { room_code } => {
            let Some(user_id) = state.registry.get(socket_id).await.and_then(|c| c.user_id) else {
                send_error(state, socket_id, AppError::NotInRoom).await;
                return;
            };
            if let Err(err) = state.room_engine.join_socket_room(socket_id, user_id, &room_code).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::SelectGame { room_code: _, game_type } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            if let Err(err) = state.room_engine.select_game(room_id, user_id, game_type).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::StartGame { room_code: _ } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            if let Err(err) = state.launch.start_game(room_id, user_id).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::PlayerReturnToLobby { room_code: _, player_name: _ } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            if let Err(err) = state.room_engine.player_return_to_lobby(room_id, user_id).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::TransferHost { room_code: _, target_user_id } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            if let Err(err) = state.room_engine.transfer_host(room_id, user_id, target_user_id).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::KickPlayer { room_code: _, target_user_id } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            if let Err(err) = state.room_engine.kick_player(room_id, user_id, target_user_id).await {
                // S6: a self-kick attempt (CANNOT_KICK_HOST) is reported
                // as `kickFailed`, distinct from the generic `error` event.
                if matches!(err, AppError::CannotKickHost) {
                    send_kick_failed(state, socket_id, err).await;
                } else {
                    send_error(state, socket_id, err).await;
                }
            }
        }

        ClientMessage::ChangeRoomStatus { room_code, new_status } => {
            let Ok(room_id) = room_id_for_code(state, socket_id, &room_code).await else {
                return;
            };
            if let Err(err) = state.room_engine.change_room_status(room_id, &new_status).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::AutoUpdateRoomStatus { room_code: _, new_status, reason } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            if let Err(err) = state
                .room_engine
                .auto_update_room_status(room_id, user_id, &new_status, &reason)
                .await
            {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::ProfileUpdated { room_code, user_id, custom_lobby_name } => {
            let Ok(room_id) = room_id_for_code(state, socket_id, &room_code).await else {
                return;
            };
            let Some(name) = custom_lobby_name else {
                return;
            };
            if let Err(err) = state.room_engine.update_custom_lobby_name(room_id, user_id, &name).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::Heartbeat => {
            if let Some(conn) = state.registry.get(socket_id).await {
                if let (Some(room_id), Some(user_id)) = (conn.room_id, conn.user_id) {
                    if let Err(err) = state.presence.heartbeat(socket_id, room_id, user_id).await {
                        tracing::warn!(%socket_id, error = %err, "heartbeat db write failed");
                    }
                }
            }
        }

        ClientMessage::ChatMessage { message } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                // §4.D: chat from a socket with no room binding is
                // dropped silently, never reported as an error.
                return;
            };
            let display_name = match state.users.find_by_id(user_id).await {
                Ok(user) => user.display_name,
                Err(_) => return,
            };
            if let Err(err) = state
                .room_engine
                .send_chat_message(room_id, user_id, &display_name, &message)
                .await
            {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::MinigameClick { score, time } => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            if score.is_some_and(|s| s > MINIGAME_SCORE_MAX) || time.is_some_and(|t| t > MINIGAME_TIME_MAX) {
                send_error(state, socket_id, AppError::InvalidInput("minigame score/time out of bounds".to_string())).await;
                return;
            }
            let _ = state
                .room_events
                .log(room_id, Some(user_id), "minigame_click", serde_json::json!({ "score": score, "time": time }))
                .await;
        }

        ClientMessage::TugOfWarPull => {
            let Some((room_id, user_id)) = current(state, socket_id).await else {
                return;
            };
            let _ = state
                .room_events
                .log(room_id, Some(user_id), "tug_of_war_pull", serde_json::json!({}))
                .await;
        }

        ClientMessage::UserIdentify { user_id } => {
            if let Err(err) = state.friends.identify(socket_id, user_id).await {
                send_error(state, socket_id, err).await;
            }
        }

        ClientMessage::GameInvite { target_user_id, room_code, game_name } => {
            let Some(caller_id) = state.registry.get(socket_id).await.and_then(|c| c.user_id) else {
                send_error(state, socket_id, AppError::NotInRoom).await;
                return;
            };
            let Ok(room_id) = room_id_for_code(state, socket_id, &room_code).await else {
                return;
            };
            // spec §4.J: "forwarded ... with sanitized fields."
            let Ok(game_name) = sanitize_name(&game_name) else {
                send_error(state, socket_id, AppError::InvalidInput("invalid game name".to_string())).await;
                return;
            };
            let host_name = match state.users.find_by_id(caller_id).await {
                Ok(user) => user.display_name,
                Err(_) => return,
            };
            state
                .friends
                .forward_invite(target_user_id, room_id, game_name, host_name, caller_id)
                .await;
        }
    }
}

fn rate_limit_action(msg: &ClientMessage) -> RateLimitedAction {
    match msg {
        ClientMessage::CreateRoom { .. } => RateLimitedAction::CreateRoom,
        ClientMessage::JoinRoom { .. } => RateLimitedAction::JoinRoom,
        ClientMessage::ChatMessage { .. } => RateLimitedAction::SendMessage,
        ClientMessage::StartGame { .. } => RateLimitedAction::StartGame,
        _ => RateLimitedAction::Default,
    }
}

fn resolve_caller_id(explicit: Option<Uuid>, claims: &Option<Claims>) -> Option<Uuid> {
    explicit.or_else(|| claims.as_ref().and_then(|c| c.user_id().ok()))
}

async fn handle_handshake_result(
    state: &AppState,
    socket_id: Uuid,
    result: Result<Result<crate::models::Room, AppError>, tokio::time::error::Elapsed>,
) {
    match result {
        Ok(Ok(_room)) => {}
        Ok(Err(err)) => send_error(state, socket_id, err).await,
        Err(_) => send_error(state, socket_id, AppError::JoinTimeout).await,
    }
}

/// Resolves `(roomId, userId)` for the socket's currently bound room;
/// `None` (no error sent) when the socket hasn't joined anything yet —
/// the caller decides whether that's worth reporting.
async fn current(state: &AppState, socket_id: Uuid) -> Option<(Uuid, Uuid)> {
    let conn = state.registry.get(socket_id).await?;
    Some((conn.room_id?, conn.user_id?))
}

async fn room_id_for_code(state: &AppState, socket_id: Uuid, room_code: &str) -> Result<Uuid, ()> {
    let Ok(code) = sanitize_room_code(room_code) else {
        send_error(state, socket_id, AppError::InvalidInput("invalid room code".to_string())).await;
        return Err(());
    };
    match state.rooms.get_room_by_code(&code).await {
        Ok(with_members) => Ok(with_members.room.id),
        Err(err) => {
            send_error(state, socket_id, err).await;
            Err(())
        }
    }
}

async fn send_error(state: &AppState, socket_id: Uuid, err: AppError) {
    send_direct(state, socket_id, DirectEvent::Error {
        message: err.client_message(),
        code: err.code().to_string(),
    })
    .await;
}

async fn send_kick_failed(state: &AppState, socket_id: Uuid, err: AppError) {
    send_direct(state, socket_id, DirectEvent::KickFailed {
        message: err.client_message(),
        code: err.code().to_string(),
    })
    .await;
}

async fn send_direct(state: &AppState, socket_id: Uuid, event: DirectEvent) {
    let Ok(json) = serde_json::to_string(&event) else {
        tracing::error!("failed to serialize direct event");
        return;
    };
    state.registry.send_to(socket_id, Message::Text(json.into())).await;
}

async fn send_json(state: &AppState, socket_id: Uuid, value: &serde_json::Value) {
    let Ok(json) = serde_json::to_string(value) else {
        tracing::error!("failed to serialize direct payload");
        return;
    };
    state.registry.send_to(socket_id, Message::Text(json.into())).await;
}
