use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `users` row (spec §3/§6). Created on first authenticated or guest
/// join; mutated only by the external account subsystem; never deleted
/// by this core.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub is_guest: bool,
    pub premium_tier: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub email: Option<String>,
    pub oauth_provider: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Moderator,
}
