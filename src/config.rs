use crate::errors::AppError;

/// Process-wide configuration, loaded once from the environment at
/// startup. Fails fast so a misconfigured deploy never binds a socket.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// Abandonment grace period, spec §4.F / §9(b) — suggested 2 minutes,
    /// left configurable.
    pub room_abandon_grace_secs: u64,
    /// Host-transfer grace period, fixed by spec §4.F at 30s but exposed
    /// for test harnesses that want to shrink it.
    pub host_transfer_grace_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = required_env("DATABASE_URL")?;
        let jwt_secret = required_env("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(AppError::Env(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let room_abandon_grace_secs = std::env::var("ROOM_ABANDON_GRACE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let host_transfer_grace_secs = std::env::var("HOST_TRANSFER_GRACE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            allowed_origins,
            room_abandon_grace_secs,
            host_transfer_grace_secs,
        })
    }
}

fn required_env(key: &str) -> Result<String, AppError> {
    std::env::var(key).map_err(|_| AppError::Env(format!("{key} is required")))
}
