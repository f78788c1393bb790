use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error taxonomy for the lobby socket protocol and the
/// thin HTTP surface, per spec §7.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limited")]
    RateLimited,

    #[error("not in room")]
    NotInRoom,

    #[error("room not found")]
    RoomNotFound,

    #[error("room full")]
    RoomFull,

    #[error("room not accepting joins")]
    RoomNotAccepting,

    #[error("duplicate player")]
    DuplicatePlayer,

    #[error("connection in progress")]
    ConnectionInProgress,

    #[error("user not found")]
    UserNotFound,

    #[error("cannot kick host")]
    CannotKickHost,

    #[error("not host")]
    NotHost,

    #[error("player not found")]
    PlayerNotFound,

    #[error("join failed: {0}")]
    JoinFailed(String),

    #[error("room creation failed: {0}")]
    RoomCreationFailed(String),

    #[error("room code collision")]
    RoomCodeCollision,

    #[error("join handshake timed out")]
    JoinTimeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("config error: {0}")]
    Env(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Machine-readable code, matching spec §7's taxonomy exactly.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::NotInRoom => "NOT_IN_ROOM",
            AppError::RoomNotFound => "ROOM_NOT_FOUND",
            AppError::RoomFull => "ROOM_FULL",
            AppError::RoomNotAccepting => "ROOM_NOT_ACCEPTING",
            AppError::DuplicatePlayer => "DUPLICATE_PLAYER",
            AppError::ConnectionInProgress => "CONNECTION_IN_PROGRESS",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::CannotKickHost => "CANNOT_KICK_HOST",
            AppError::NotHost => "NOT_HOST",
            AppError::PlayerNotFound => "PLAYER_NOT_FOUND",
            AppError::JoinFailed(_) => "JOIN_FAILED",
            AppError::RoomCreationFailed(_) => "ROOM_CREATION_FAILED",
            AppError::RoomCodeCollision => "ROOM_CODE_COLLISION",
            AppError::JoinTimeout => "JOIN_TIMEOUT",
            AppError::Database(_) | AppError::Jwt(_) | AppError::Env(_) | AppError::Internal => {
                "SERVER_ERROR"
            }
        }
    }

    /// Client-facing message. Internal faults never leak their `Display`
    /// text; everything else is safe to surface as written.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Jwt(_) | AppError::Env(_) | AppError::Internal => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotInRoom
            | AppError::RoomNotFound
            | AppError::PlayerNotFound
            | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::RoomFull | AppError::RoomNotAccepting | AppError::DuplicatePlayer => {
                StatusCode::CONFLICT
            }
            AppError::ConnectionInProgress => StatusCode::CONFLICT,
            AppError::CannotKickHost | AppError::NotHost => StatusCode::FORBIDDEN,
            AppError::JoinFailed(_) | AppError::RoomCreationFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::RoomCodeCollision => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::JoinTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Database(_) | AppError::Jwt(_) | AppError::Env(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if matches!(
            self,
            AppError::Database(_) | AppError::Jwt(_) | AppError::Env(_) | AppError::Internal
        ) {
            tracing::error!(error = %self, "internal fault");
        }

        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_spec_taxonomy_exactly() {
        assert_eq!(AppError::InvalidInput("x".into()).code(), "INVALID_INPUT");
        assert_eq!(AppError::RateLimited.code(), "RATE_LIMITED");
        assert_eq!(AppError::NotInRoom.code(), "NOT_IN_ROOM");
        assert_eq!(AppError::RoomNotFound.code(), "ROOM_NOT_FOUND");
        assert_eq!(AppError::RoomFull.code(), "ROOM_FULL");
        assert_eq!(AppError::RoomNotAccepting.code(), "ROOM_NOT_ACCEPTING");
        assert_eq!(AppError::DuplicatePlayer.code(), "DUPLICATE_PLAYER");
        assert_eq!(AppError::ConnectionInProgress.code(), "CONNECTION_IN_PROGRESS");
        assert_eq!(AppError::UserNotFound.code(), "USER_NOT_FOUND");
        assert_eq!(AppError::CannotKickHost.code(), "CANNOT_KICK_HOST");
        assert_eq!(AppError::NotHost.code(), "NOT_HOST");
        assert_eq!(AppError::PlayerNotFound.code(), "PLAYER_NOT_FOUND");
        assert_eq!(AppError::JoinFailed("x".into()).code(), "JOIN_FAILED");
        assert_eq!(AppError::RoomCreationFailed("x".into()).code(), "ROOM_CREATION_FAILED");
        assert_eq!(AppError::RoomCodeCollision.code(), "ROOM_CODE_COLLISION");
        assert_eq!(AppError::JoinTimeout.code(), "JOIN_TIMEOUT");
        assert_eq!(AppError::Internal.code(), "SERVER_ERROR");
    }

    #[test]
    fn internal_faults_never_leak_their_display_text() {
        let err = AppError::Env("DATABASE_URL missing".to_string());
        assert_eq!(err.client_message(), "internal server error");
        assert_eq!(err.code(), "SERVER_ERROR");
    }

    #[test]
    fn validation_errors_surface_their_own_message() {
        let err = AppError::InvalidInput("name too long".to_string());
        assert_eq!(err.client_message(), "invalid input: name too long");
    }

    #[test]
    fn cannot_kick_host_is_a_forbidden_style_error_not_a_server_fault() {
        let err = AppError::CannotKickHost;
        assert_eq!(err.code(), "CANNOT_KICK_HOST");
        assert_eq!(err.client_message(), "cannot kick host");
    }
}
