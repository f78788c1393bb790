//! Short-lived session JWTs for socket authentication. Grounded on the
//! teacher's `auth::jwt` (HS256, `sub`/`iat`/`exp`/`jti` claims); the
//! wallet-address claim is dropped since this core has no wallet concept.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Standard claims plus a `jti` used only for log correlation — this
/// core never revokes tokens, since sessions are short-lived socket
/// credentials, not the 256-bit game-launch tokens of spec §4.H.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::InvalidInput("invalid user id in token".to_string()))
    }
}

pub fn generate_jwt(user_id: Uuid, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(7)).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AppError::from)
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-at-least-32-characters-long";

    #[test]
    fn round_trips_the_user_id() {
        let user_id = Uuid::new_v4();
        let token = generate_jwt(user_id, SECRET).unwrap();
        let claims = decode_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let token = generate_jwt(Uuid::new_v4(), SECRET).unwrap();
        assert!(decode_jwt(&token, "a-completely-different-secret-32ch").is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(decode_jwt("not.a.jwt", SECRET).is_err());
    }
}
