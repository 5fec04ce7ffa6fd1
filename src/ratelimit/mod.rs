//! Per-client request ceiling.
//!
//! Fixed windows: the first request from a client opens a window of
//! `window` length; at most `max_requests` are admitted until it closes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::errors::{AppError, ErrorReply};
use crate::AppState;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Client identity used when no address is known.
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of admitting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the client's window closes
    pub reset_after_secs: u64,
}

pub struct RateLimiter {
    windows: DashMap<String, Window>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Check if a request is allowed and record it.
    pub fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> Decision {
        let mut entry = self.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = entry.count < self.max_requests;
        if allowed {
            entry.count += 1;
        }

        let elapsed = now.saturating_duration_since(entry.started);
        let reset = self.window.saturating_sub(elapsed);

        Decision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after_secs: reset.as_secs_f64().ceil() as u64,
        }
    }

    /// Drop windows that have closed.
    pub fn purge_expired(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Periodically purge closed windows in the background.
    pub fn spawn_purge(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        let every = limiter.window.max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                limiter.purge_expired(Instant::now());
                tracing::debug!(clients = limiter.tracked_clients(), "Purged rate limit windows");
            }
        })
    }
}

/// Client identity: the first `X-Forwarded-For` hop when trusted, else the
/// peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

/// Middleware enforcing the limit on every request it wraps.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer, state.config.trust_forwarded_for);

    let decision = state.limiter.check(&client);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        ErrorReply {
            error: AppError::RateLimited {
                retry_after_secs: decision.reset_after_secs,
            },
            verbose: state.config.is_development(),
        }
        .into_response()
    };

    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(LIMIT_HEADER),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static(REMAINING_HEADER),
        HeaderValue::from(decision.remaining),
    );

    response
}
