//! HTTP-layer middleware. Grounded on the teacher's `middleware.rs`
//! (`RateLimitConfig` trait + `governor::RateLimiter::keyed` per-IP
//! limiter pattern), narrowed to the one thing this core still needs
//! at the HTTP layer: a coarse, IP-keyed throttle on the `/ws` upgrade
//! route itself (SPEC_FULL §2), distinct from the per-socket,
//! per-action limiter in `registry::ConnectionRegistry` (§4.C).

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

type IpRateLimiter = Arc<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>;

/// Coarse per-IP quota for the `/ws` upgrade route: 30 upgrade attempts
/// per minute. Finer, per-socket-per-action limits live in the
/// Connection Registry and are unaffected by this layer.
#[derive(Clone)]
pub struct WsUpgradeRateLimit {
    limiter: IpRateLimiter,
}

impl WsUpgradeRateLimit {
    pub fn new() -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(30).expect("30 is nonzero"));
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }
}

impl Default for WsUpgradeRateLimit {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn ws_upgrade_rate_limit(
    axum::extract::State(limiter): axum::extract::State<WsUpgradeRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let client_ip = if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        addr.ip().to_string()
    } else {
        "unknown".to_string()
    };

    match limiter.limiter.check_key(&client_ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(%client_ip, "ws upgrade rate limit exceeded");
            Err(StatusCode::TOO_MANY_REQUESTS)
        }
    }
}
