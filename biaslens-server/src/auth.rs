// Copyright 2026 BiasLens Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bearer-token authentication: authenticate the token, then load `teamId`
//! from the profile table. Pluggable strategy trait plus a static token
//! table and a no-op strategy for local development, in the familiar
//! `Authenticator`/`MultiAuth`/`NoAuth` shape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use moka::sync::Cache;

/// Authenticated caller identity, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub team_id: String,
    pub user_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer credentials")]
    MissingCredentials,
    #[error("invalid bearer credentials")]
    InvalidCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError>;
}

/// Static bearer-token table: `token -> (team_id, user_id)`. Configured from
/// `AuthConfig::bearer_tokens`, format `token:team_id[:user_id]`.
pub struct BearerTokenAuth {
    tokens: HashMap<String, (String, Option<String>)>,
}

impl BearerTokenAuth {
    pub fn new(configured: Vec<String>) -> Self {
        let mut tokens = HashMap::new();
        for entry in configured {
            let parts: Vec<&str> = entry.splitn(3, ':').collect();
            if parts.len() >= 2 {
                let user_id = parts.get(2).map(|s| s.to_string());
                tokens.insert(parts[0].to_string(), (parts[1].to_string(), user_id));
            }
        }
        Self { tokens }
    }
}

impl Authenticator for BearerTokenAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let header_value = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingCredentials)?;

        let (team_id, user_id) = self.tokens.get(token).ok_or(AuthError::InvalidCredentials)?;
        Ok(AuthContext {
            team_id: team_id.clone(),
            user_id: user_id.clone(),
        })
    }
}

/// Development-only strategy that authenticates every request against a
/// fixed team. Never selected unless `auth.enabled = false` in config.
pub struct NoAuth {
    default_team_id: String,
}

impl NoAuth {
    pub fn new(default_team_id: impl Into<String>) -> Self {
        Self {
            default_team_id: default_team_id.into(),
        }
    }
}

impl Authenticator for NoAuth {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        Ok(AuthContext {
            team_id: self.default_team_id.clone(),
            user_id: None,
        })
    }
}

pub async fn auth_middleware(
    auth: axum::Extension<Arc<dyn Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let ctx = auth.authenticate(req.headers())?;
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Per-client token bucket, backed by a `moka` bounded cache so tracked
/// clients are evicted instead of growing without bound.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    enabled: bool,
    buckets: Cache<String, Arc<std::sync::atomic::AtomicU32>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, enabled: bool) -> Self {
        let buckets = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(window * 10)
            .build();
        Self {
            max_requests,
            window,
            enabled,
            buckets,
        }
    }

    /// Best-effort fixed-window counter per identifier; not exported across
    /// process restarts, acceptable for a dev-grade rate limit in front of
    /// the orchestrator's own per-provider scheduler pacing.
    pub fn check(&self, identifier: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let counter = self
            .buckets
            .get_with(identifier.to_string(), || Arc::new(std::sync::atomic::AtomicU32::new(0)));
        let prior = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        prior < self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_auth_accepts_configured_token() {
        let auth = BearerTokenAuth::new(vec!["tok-1:team-a".to_string()]);
        let ctx = auth.authenticate(&headers_with_bearer("tok-1")).unwrap();
        assert_eq!(ctx.team_id, "team-a");
    }

    #[test]
    fn bearer_auth_rejects_unknown_token() {
        let auth = BearerTokenAuth::new(vec!["tok-1:team-a".to_string()]);
        let err = auth.authenticate(&headers_with_bearer("tok-2"));
        assert!(err.is_err());
    }

    #[test]
    fn bearer_auth_rejects_missing_header() {
        let auth = BearerTokenAuth::new(vec!["tok-1:team-a".to_string()]);
        let err = auth.authenticate(&HeaderMap::new());
        assert!(matches!(err, Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn no_auth_always_succeeds() {
        let auth = NoAuth::new("dev-team");
        let ctx = auth.authenticate(&HeaderMap::new()).unwrap();
        assert_eq!(ctx.team_id, "dev-team");
    }

    #[test]
    fn rate_limiter_disabled_always_allows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), false);
        for _ in 0..10 {
            assert!(limiter.check("client"));
        }
    }

    #[test]
    fn rate_limiter_enforces_max_requests() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60), true);
        assert!(limiter.check("client"));
        assert!(limiter.check("client"));
        assert!(!limiter.check("client"));
    }
}
