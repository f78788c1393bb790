//! Friend Presence (spec §4.J). Grounded on the teacher's
//! `db::user::search` batch-query style and `ws::broadcast::broadcast_user`
//! send-to-many-sockets helper, adapted to the per-user reverse index
//! already held by `ConnectionRegistry` — joining `user:{userId}` is
//! simply registering the socket under that user id, so no separate
//! room concept is needed for it.

use axum::extract::ws::Message;
use uuid::Uuid;

use crate::db::friendship::FriendshipRepository;
use crate::errors::AppError;
use crate::events::DirectEvent;
use crate::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct FriendPresence {
    friendships: FriendshipRepository,
    registry: ConnectionRegistry,
}

impl FriendPresence {
    pub fn new(friendships: FriendshipRepository, registry: ConnectionRegistry) -> Self {
        Self {
            friendships,
            registry,
        }
    }

    /// `user:identify(userId)` (spec §4.J): binds the socket to the
    /// user's identity, announces `friend:online` to every accepted
    /// friend who already has a live socket, and replies with the
    /// aggregated online set.
    pub async fn identify(&self, socket_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.registry.bind_identity(socket_id, user_id).await;

        let friend_ids = self.friendships.accepted_friend_ids(user_id).await?;
        let mut online = Vec::new();
        for friend_id in friend_ids {
            if !self.registry.sockets_for_user(friend_id).await.is_empty() {
                online.push(friend_id);
                self.send_direct(friend_id, DirectEvent::FriendOnline { user_id }).await;
            }
        }

        self.send_to_socket(socket_id, DirectEvent::FriendListOnline { user_ids: online })
            .await;
        Ok(())
    }

    /// On disconnect: announces `friend:offline` to every accepted
    /// friend, but only once this was the user's last live socket —
    /// multi-tab users stay "online" while any tab remains connected.
    pub async fn announce_offline(&self, user_id: Uuid) -> Result<(), AppError> {
        if !self.registry.sockets_for_user(user_id).await.is_empty() {
            return Ok(());
        }

        let friend_ids = self.friendships.accepted_friend_ids(user_id).await?;
        for friend_id in friend_ids {
            self.send_direct(friend_id, DirectEvent::FriendOffline { user_id }).await;
        }
        Ok(())
    }

    /// `game:invite` (spec §4.J/§6): forwarded verbatim to
    /// `user:{targetUserId}` as `game:invite_received`.
    pub async fn forward_invite(
        &self,
        target_user_id: Uuid,
        room_id: Uuid,
        game_name: String,
        host_name: String,
        sender_id: Uuid,
    ) {
        self.send_direct(
            target_user_id,
            DirectEvent::GameInviteReceived {
                room_id,
                game_name,
                host_name,
                sender_id,
            },
        )
        .await;
    }

    async fn send_direct(&self, user_id: Uuid, event: DirectEvent) {
        let sockets = self.registry.sockets_for_user(user_id).await;
        for socket_id in sockets {
            self.send_to_socket(socket_id, event.clone()).await;
        }
    }

    async fn send_to_socket(&self, socket_id: Uuid, event: DirectEvent) {
        let Ok(json) = serde_json::to_string(&event) else {
            tracing::error!("failed to serialize direct event");
            return;
        };
        self.registry.send_to(socket_id, Message::Text(json.into())).await;
    }
}
