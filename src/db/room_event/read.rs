use uuid::Uuid;

use crate::db::room_event::RoomEventRepository;
use crate::errors::AppError;
use crate::models::RoomEvent;

impl RoomEventRepository {
    /// Most recent events for a room, newest first, capped at 200 per
    /// call so a chatty room can't blow up a single response.
    pub async fn recent_for_room(&self, room_id: Uuid) -> Result<Vec<RoomEvent>, AppError> {
        sqlx::query_as::<_, RoomEvent>(
            r#"SELECT id, room_id, user_id, event_type, event_data, created_at
               FROM room_events WHERE room_id = $1
               ORDER BY created_at DESC LIMIT 200"#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
