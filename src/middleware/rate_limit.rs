use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 120,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn read_heavy() -> Self {
        Self {
            limit: 300,
            window_secs: 60,
        }
    }

    pub fn write_heavy() -> Self {
        Self {
            limit: 30,
            window_secs: 60,
        }
    }

    pub fn expensive() -> Self {
        Self {
            limit: 60,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: u64,
    count: u32,
}

/// Fixed-window in-memory rate limiter, keyed by bearer token when present
/// and by forwarded client address otherwise.
pub struct RateLimitLayer {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    pub fn read_heavy() -> Self {
        Self::new(RateLimitConfig::read_heavy())
    }

    pub fn write_heavy() -> Self {
        Self::new(RateLimitConfig::write_heavy())
    }

    pub fn expensive() -> Self {
        Self::new(RateLimitConfig::expensive())
    }

    fn client_key(headers: &HeaderMap) -> String {
        if let Some(auth) = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            return format!("token:{}", auth);
        }
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|ip| format!("ip:{}", ip))
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn check(&self, key: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.saturating_sub(window.started_at) >= self.config.window_secs {
            window.started_at = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= self.config.limit
    }

    pub async fn middleware(&self, headers: HeaderMap, req: Request, next: Next) -> Response {
        let key = Self::client_key(&headers);

        if !self.check(&key) {
            warn!(key = %key, limit = self.config.limit, "Rate limit exceeded");
            let body = Json(json!({
                "error": "Too many requests",
                "message": format!(
                    "Rate limit of {} requests per {}s exceeded",
                    self.config.limit, self.config.window_secs
                ),
            }));
            return (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        }

        debug!(key = %key, "Rate limit check passed");
        next.run(req).await
    }
}
