//! Black-box coverage of spec.md's concrete scenarios: create/join,
//! host-transfer on disconnect, kicking, and the full game-launch
//! protocol. Grounded on the teacher's `tests/ws/lobby.rs` shape: spin
//! up a real Postgres-backed server and drive it exactly like a client
//! would, asserting on the wire JSON.

use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use crate::common::ws_helper::WsConnection;
use crate::common::{spawn_app_with_containers, spawn_app_with_grace};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Drains `conn` until `window` elapses, failing if any frame of type
/// `event_type` shows up. Used to assert a cancelled grace timer stayed
/// cancelled rather than firing late.
async fn assert_no_event_of_type(conn: &mut WsConnection, event_type: &str, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return;
        }
        match conn.recv_json_timeout(remaining).await {
            Ok(value) => {
                assert_ne!(
                    value.get("type").and_then(|t| t.as_str()),
                    Some(event_type),
                    "unexpected {event_type} event"
                );
            }
            Err(_) => return,
        }
    }
}

#[tokio::test]
async fn create_then_join_happy_path() {
    let app = spawn_app_with_containers().await;

    let mut host = app.connect().await;
    host.send_json(&json!({
        "type": "createRoom",
        "playerName": "Alice",
        "isPublic": true,
    }))
    .await
    .unwrap();

    let created = host.recv_json_of_type("roomCreated", RECV_TIMEOUT).await.unwrap();
    assert_eq!(created["isHost"], true);
    let room_code = created["room"]["roomCode"].as_str().unwrap().to_string();
    assert_eq!(created["players"].as_array().unwrap().len(), 1);

    let mut guest = app.connect().await;
    guest
        .send_json(&json!({
            "type": "joinRoom",
            "playerName": "Bob",
            "roomCode": room_code,
        }))
        .await
        .unwrap();

    let joined = guest.recv_json_of_type("roomJoined", RECV_TIMEOUT).await.unwrap();
    assert_eq!(joined["isHost"], false);
    assert_eq!(joined["players"].as_array().unwrap().len(), 2);

    // The host's mailbox also sees the join broadcast.
    let player_joined = host.recv_json_of_type("playerJoined", RECV_TIMEOUT).await.unwrap();
    assert_eq!(player_joined["player"]["displayName"], "Bob");

    app.stop().await;
}

#[tokio::test]
async fn join_rejects_unknown_room_code() {
    let app = spawn_app_with_containers().await;

    let mut guest = app.connect().await;
    guest
        .send_json(&json!({
            "type": "joinRoom",
            "playerName": "Nobody",
            "roomCode": "ZZZZZZ",
        }))
        .await
        .unwrap();

    let err = guest.recv_json_of_type("error", RECV_TIMEOUT).await.unwrap();
    assert_eq!(err["code"], "ROOM_NOT_FOUND");

    app.stop().await;
}

#[tokio::test]
async fn host_kicking_self_fails_with_cannot_kick_host() {
    let app = spawn_app_with_containers().await;

    let mut host = app.connect().await;
    host.send_json(&json!({ "type": "createRoom", "playerName": "Carol" }))
        .await
        .unwrap();
    let created = host.recv_json_of_type("roomCreated", RECV_TIMEOUT).await.unwrap();
    let host_id = created["room"]["hostId"].as_str().unwrap().to_string();

    host.send_json(&json!({
        "type": "kickPlayer",
        "roomCode": created["room"]["roomCode"],
        "targetUserId": host_id,
    }))
    .await
    .unwrap();

    let failed = host.recv_json_of_type("kickFailed", RECV_TIMEOUT).await.unwrap();
    assert_eq!(failed["code"], "CANNOT_KICK_HOST");

    app.stop().await;
}

#[tokio::test]
async fn host_kicks_a_player_and_both_sides_are_notified() {
    let app = spawn_app_with_containers().await;

    let mut host = app.connect().await;
    host.send_json(&json!({ "type": "createRoom", "playerName": "Dana" }))
        .await
        .unwrap();
    let created = host.recv_json_of_type("roomCreated", RECV_TIMEOUT).await.unwrap();
    let room_code = created["room"]["roomCode"].as_str().unwrap().to_string();

    let mut guest = app.connect().await;
    guest
        .send_json(&json!({ "type": "joinRoom", "playerName": "Eve", "roomCode": room_code }))
        .await
        .unwrap();
    let joined = guest.recv_json_of_type("roomJoined", RECV_TIMEOUT).await.unwrap();
    let guest_id = joined["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["displayName"] == "Eve")
        .unwrap()["userId"]
        .as_str()
        .unwrap()
        .to_string();
    host.recv_json_of_type("playerJoined", RECV_TIMEOUT).await.unwrap();

    host.send_json(&json!({
        "type": "kickPlayer",
        "roomCode": room_code,
        "targetUserId": guest_id,
    }))
    .await
    .unwrap();

    let kicked = host.recv_json_of_type("playerKicked", RECV_TIMEOUT).await.unwrap();
    assert_eq!(kicked["targetUserId"], guest_id);
    assert_eq!(kicked["players"].as_array().unwrap().len(), 1);

    app.stop().await;
}

#[tokio::test]
async fn starting_game_dispatches_host_first_then_delayed_others() {
    let app = spawn_app_with_containers().await;
    app.factory().create_game("arena", false, None).await;

    let mut host = app.connect().await;
    host.send_json(&json!({ "type": "createRoom", "playerName": "Finn" }))
        .await
        .unwrap();
    let created = host.recv_json_of_type("roomCreated", RECV_TIMEOUT).await.unwrap();
    let room_code = created["room"]["roomCode"].as_str().unwrap().to_string();

    let mut guest = app.connect().await;
    guest
        .send_json(&json!({ "type": "joinRoom", "playerName": "Gwen", "roomCode": room_code }))
        .await
        .unwrap();
    guest.recv_json_of_type("roomJoined", RECV_TIMEOUT).await.unwrap();
    host.recv_json_of_type("playerJoined", RECV_TIMEOUT).await.unwrap();

    host.send_json(&json!({
        "type": "selectGame",
        "roomCode": room_code,
        "gameType": "arena",
    }))
    .await
    .unwrap();
    host.recv_json_of_type("gameSelected", RECV_TIMEOUT).await.unwrap();
    guest.recv_json_of_type("gameSelected", RECV_TIMEOUT).await.unwrap();

    host.send_json(&json!({ "type": "startGame", "roomCode": room_code }))
        .await
        .unwrap();

    // Host receives its launch URL immediately (0ms delay, role=gm).
    let host_started = host.recv_json_of_type("gameStarted", RECV_TIMEOUT).await.unwrap();
    assert!(host_started["gameUrl"].as_str().unwrap().contains("role=gm"));

    // Non-host dispatch is delayed ~2s; give it generous slack.
    let guest_started = guest
        .recv_json_of_type("gameStarted", Duration::from_secs(4))
        .await
        .unwrap();
    assert!(!guest_started["gameUrl"].as_str().unwrap().contains("role=gm"));

    app.stop().await;
}

#[tokio::test]
async fn join_rejects_a_third_player_over_capacity() {
    let app = spawn_app_with_containers().await;

    let mut host = app.connect().await;
    host.send_json(&json!({
        "type": "createRoom",
        "playerName": "Hank",
        "maxPlayers": 2,
    }))
    .await
    .unwrap();
    let created = host.recv_json_of_type("roomCreated", RECV_TIMEOUT).await.unwrap();
    let room_code = created["room"]["roomCode"].as_str().unwrap().to_string();

    let mut guest = app.connect().await;
    guest
        .send_json(&json!({ "type": "joinRoom", "playerName": "Ivy", "roomCode": room_code }))
        .await
        .unwrap();
    guest.recv_json_of_type("roomJoined", RECV_TIMEOUT).await.unwrap();
    host.recv_json_of_type("playerJoined", RECV_TIMEOUT).await.unwrap();

    let mut third = app.connect().await;
    third
        .send_json(&json!({ "type": "joinRoom", "playerName": "Jack", "roomCode": room_code }))
        .await
        .unwrap();
    let err = third.recv_json_of_type("error", RECV_TIMEOUT).await.unwrap();
    assert_eq!(err["code"], "ROOM_FULL");

    app.stop().await;
}

#[tokio::test]
async fn host_reconnecting_within_grace_cancels_the_transfer_timer() {
    let app = spawn_app_with_grace(120, 1).await;
    let host_id = Uuid::new_v4();

    let mut host = app.connect_as(host_id).await;
    host.send_json(&json!({ "type": "createRoom", "playerName": "Kara" }))
        .await
        .unwrap();
    let created = host.recv_json_of_type("roomCreated", RECV_TIMEOUT).await.unwrap();
    let room_code = created["room"]["roomCode"].as_str().unwrap().to_string();
    assert_eq!(created["room"]["hostId"], host_id.to_string());

    let mut guest = app.connect().await;
    guest
        .send_json(&json!({ "type": "joinRoom", "playerName": "Liam", "roomCode": room_code }))
        .await
        .unwrap();
    guest.recv_json_of_type("roomJoined", RECV_TIMEOUT).await.unwrap();
    host.recv_json_of_type("playerJoined", RECV_TIMEOUT).await.unwrap();

    host.close().await.unwrap();
    guest.recv_json_of_type("playerDisconnected", RECV_TIMEOUT).await.unwrap();

    // Reconnect as the same user well inside the 1s host-transfer grace.
    let mut host_again = app.connect_as(host_id).await;
    host_again
        .send_json(&json!({ "type": "joinSocketRoom", "roomCode": room_code }))
        .await
        .unwrap();
    let rejoined = host_again.recv_json_of_type("roomJoined", RECV_TIMEOUT).await.unwrap();
    assert_eq!(rejoined["isHost"], true);

    assert_no_event_of_type(&mut guest, "hostTransferred", Duration::from_secs(2)).await;

    app.stop().await;
}

#[tokio::test]
async fn host_disconnect_past_grace_auto_transfers_host() {
    let app = spawn_app_with_grace(120, 1).await;
    let host_id = Uuid::new_v4();

    let mut host = app.connect_as(host_id).await;
    host.send_json(&json!({ "type": "createRoom", "playerName": "Mona" }))
        .await
        .unwrap();
    let created = host.recv_json_of_type("roomCreated", RECV_TIMEOUT).await.unwrap();
    let room_code = created["room"]["roomCode"].as_str().unwrap().to_string();

    let mut guest = app.connect().await;
    guest
        .send_json(&json!({ "type": "joinRoom", "playerName": "Noah", "roomCode": room_code }))
        .await
        .unwrap();
    let joined = guest.recv_json_of_type("roomJoined", RECV_TIMEOUT).await.unwrap();
    let guest_id = joined["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["displayName"] == "Noah")
        .unwrap()["userId"]
        .as_str()
        .unwrap()
        .to_string();
    host.recv_json_of_type("playerJoined", RECV_TIMEOUT).await.unwrap();

    host.close().await.unwrap();
    guest.recv_json_of_type("playerDisconnected", RECV_TIMEOUT).await.unwrap();

    // No reconnect this time; the 1s grace period should elapse and the
    // only other connected member (the guest) should become host.
    let transferred = guest
        .recv_json_of_type("hostTransferred", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(transferred["newHostId"], guest_id);
    assert_eq!(transferred["reason"], "host_disconnect_grace_period_expired");

    app.stop().await;
}
