use chrono::Utc;
use uuid::Uuid;

use crate::db::room_event::RoomEventRepository;
use crate::errors::AppError;
use crate::models::RoomEvent;

impl RoomEventRepository {
    /// `logEvent(roomId, userId, eventType, eventData)` (spec §4.B).
    /// Fire-and-forget from the caller's perspective: a failure here is
    /// logged by the caller but never rolls back the state change it
    /// describes, since the audit trail is diagnostic, not authoritative.
    pub async fn log(
        &self,
        room_id: Uuid,
        user_id: Option<Uuid>,
        event_type: &str,
        event_data: serde_json::Value,
    ) -> Result<RoomEvent, AppError> {
        sqlx::query_as::<_, RoomEvent>(
            r#"INSERT INTO room_events (id, room_id, user_id, event_type, event_data, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, room_id, user_id, event_type, event_data, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(room_id)
        .bind(user_id)
        .bind(event_type)
        .bind(event_data)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
