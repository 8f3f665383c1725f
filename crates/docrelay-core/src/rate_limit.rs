use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::access::{ClientAddr, UNKNOWN_CLIENT};
use crate::config::RateLimitConfig;
use crate::core::CoreState;
use crate::error::RelayError;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    hits: u32,
    reset_at: Instant,
}

/// Outcome of counting one request against a caller's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl Decision {
    pub fn reset_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(
            RATELIMIT_RESET,
            HeaderValue::from(self.reset_after_secs()),
        );
    }
}

/// Per-caller fixed-window counter.
///
/// A window opens at the caller's first hit and closes `window` later; the
/// next hit after that opens a fresh one. Rejected hits still count.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    entries: DashMap<String, WindowEntry>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn hit(&self, key: &str) -> Decision {
        self.hit_at(key, Instant::now())
    }

    pub fn hit_at(&self, key: &str, now: Instant) -> Decision {
        let window = self.config.window;
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                hits: 0,
                reset_at: now + window,
            });
        if now >= entry.reset_at {
            *entry = WindowEntry {
                hits: 0,
                reset_at: now + window,
            };
        }
        entry.hits = entry.hits.saturating_add(1);

        Decision {
            allowed: entry.hits <= self.config.max,
            limit: self.config.max,
            remaining: self.config.max.saturating_sub(entry.hits),
            reset_after: entry.reset_at.saturating_duration_since(now),
        }
    }

    /// Drops every window that has closed by `now`; returns how many went.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    /// Evicts closed windows once per window length until the runtime stops.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let period = limiter.config.window.max(MIN_SWEEP_PERIOD);
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = limiter.purge_expired(Instant::now());
                debug!(
                    event = "rate_limit_sweep",
                    purged = purged,
                    tracked = limiter.tracked()
                );
            }
        })
    }
}

pub fn is_limited_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

pub async fn rate_limit(
    State(state): State<Arc<CoreState>>,
    request: Request,
    next: Next,
) -> Response {
    if !is_limited_path(request.uri().path()) {
        return next.run(request).await;
    }

    let client = request
        .extensions()
        .get::<ClientAddr>()
        .map(|client| client.0.clone())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    let decision = state.limiter.hit(&client);

    if !decision.allowed {
        warn!(
            event = "rate_limited",
            client = %client,
            path = %request.uri().path(),
            limit = decision.limit
        );
        let mut response = RelayError::RateLimited {
            retry_after_secs: decision.reset_after_secs(),
            window_minutes: state.limiter.config().window_minutes(),
        }
        .into_response();
        decision.apply_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window_secs: u64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(RateLimitConfig {
            max,
            window: Duration::from_secs(window_secs),
        })
    }

    #[test]
    fn fiftieth_allowed_fifty_first_rejected() {
        let limiter = limiter(50, 900);
        let now = Instant::now();
        for hit in 1..=50 {
            let decision = limiter.hit_at("10.0.0.1", now);
            assert!(decision.allowed, "hit {hit} should pass");
        }
        let decision = limiter.hit_at("10.0.0.1", now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn callers_are_counted_separately() {
        let limiter = limiter(1, 900);
        let now = Instant::now();
        assert!(limiter.hit_at("a", now).allowed);
        assert!(!limiter.hit_at("a", now).allowed);
        assert!(limiter.hit_at("b", now).allowed);
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = limiter(2, 60);
        let start = Instant::now();
        limiter.hit_at("a", start);
        limiter.hit_at("a", start);
        assert!(!limiter.hit_at("a", start + Duration::from_secs(59)).allowed);

        let decision = limiter.hit_at("a", start + Duration::from_secs(60));
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.reset_after, Duration::from_secs(60));
    }

    #[test]
    fn window_is_fixed_from_first_hit() {
        let limiter = limiter(5, 60);
        let start = Instant::now();
        limiter.hit_at("a", start);
        let decision = limiter.hit_at("a", start + Duration::from_secs(45));
        assert_eq!(decision.reset_after, Duration::from_secs(15));
    }

    #[test]
    fn purge_drops_only_closed_windows() {
        let limiter = limiter(5, 60);
        let start = Instant::now();
        limiter.hit_at("old", start);
        limiter.hit_at("new", start + Duration::from_secs(30));

        assert_eq!(limiter.purge_expired(start + Duration::from_secs(60)), 1);
        assert_eq!(limiter.tracked(), 1);
    }

    #[tokio::test]
    async fn sweeper_survives_a_zero_window() {
        let limiter = Arc::new(limiter(1, 0));
        let sweeper = limiter.spawn_sweeper();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sweeper.is_finished());
        sweeper.abort();
    }

    #[test]
    fn reset_seconds_round_up() {
        let decision = Decision {
            allowed: true,
            limit: 1,
            remaining: 0,
            reset_after: Duration::from_millis(1500),
        };
        assert_eq!(decision.reset_after_secs(), 2);
    }

    #[test]
    fn only_api_paths_are_limited() {
        assert!(is_limited_path("/api"));
        assert!(is_limited_path("/api/health"));
        assert!(is_limited_path("/api/unknown"));
        assert!(!is_limited_path("/apis"));
        assert!(!is_limited_path("/favicon.ico"));
    }
}
