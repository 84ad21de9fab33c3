use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_MAX_REQUESTS: usize = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Entries older than this are dropped by the periodic sweep, independent
/// of any admission window still in use.
const CLEANUP_RETENTION: Duration = Duration::from_secs(300);

/// Sliding-window admission guard keyed by source address. Each key's
/// prune-check-record sequence runs under that key's exclusive map entry,
/// so concurrent callers cannot jointly exceed the limit; different keys
/// do not serialize against each other.
pub struct RateLimiter {
    windows: DashMap<String, Vec<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Admission check with the default policy (100 requests / 60 s).
    pub fn check(&self, key: &str) -> bool {
        self.is_allowed(key, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }

    /// Prunes entries older than `window`, rejects without recording when
    /// the key is at capacity, records and admits otherwise.
    pub fn is_allowed(&self, key: &str, max_requests: usize, window: Duration) -> bool {
        let now = Instant::now();
        let mut admitted = self.windows.entry(key.to_string()).or_default();

        admitted.retain(|t| now.duration_since(*t) < window);

        if admitted.len() >= max_requests {
            debug!(key = %key, count = admitted.len(), "rate limit exceeded");
            return false;
        }

        admitted.push(now);
        true
    }

    /// Housekeeping sweep: drops stale entries across all keys and removes
    /// keys whose windows emptied, bounding memory independently of
    /// admission traffic. Runs on its own schedule, off the request path.
    pub fn cleanup(&self) {
        self.cleanup_older_than(CLEANUP_RETENTION);
    }

    fn cleanup_older_than(&self, retention: Duration) {
        let now = Instant::now();
        self.windows.retain(|_, times| {
            times.retain(|t| now.duration_since(*t) < retention);
            !times.is_empty()
        });
    }

    pub fn tracked_sources(&self) -> usize {
        self.windows.len()
    }
}
