//! Per-tool denial backoff.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Fixed backoff schedule indexed by `min(count, len) - 1`: counts 1-2 are
/// free, then 5s/15s/60s/300s.
const BACKOFF_SCHEDULE_SECONDS: [u64; 6] = [0, 0, 5, 15, 60, 300];

struct DenialTracker {
    count: u32,
    backoff_until: Instant,
}

/// Per-tool-name denial counters with exponential backoff. Reset on any
/// approval outcome.
#[derive(Default)]
pub struct RateLimiter {
    trackers: HashMap<String, DenialTracker>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a denial for `tool`, advancing its backoff window.
    pub fn track_denial(&mut self, tool: &str) {
        let now = Instant::now();
        let tracker = self
            .trackers
            .entry(tool.to_string())
            .or_insert_with(|| DenialTracker { count: 0, backoff_until: now });
        tracker.count += 1;
        let index = (tracker.count as usize).min(BACKOFF_SCHEDULE_SECONDS.len()) - 1;
        let delay = Duration::from_secs(BACKOFF_SCHEDULE_SECONDS[index]);
        tracker.backoff_until = now + delay;
        tracing::debug!(tool, count = tracker.count, delay_secs = delay.as_secs(), "denial tracked");
    }

    /// Resets `tool`'s tracker on `Allowed`, `AllowedAlways`, or explicit
    /// user override.
    pub fn reset(&mut self, tool: &str) {
        self.trackers.remove(tool);
    }

    pub fn is_rate_limited(&self, tool: &str) -> bool {
        self.remaining(tool) > Duration::ZERO
    }

    /// Time remaining in `tool`'s backoff window, or zero if none.
    pub fn remaining(&self, tool: &str) -> Duration {
        match self.trackers.get(tool) {
            Some(tracker) => tracker.backoff_until.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_two_denials_have_no_backoff() {
        let mut limiter = RateLimiter::new();
        limiter.track_denial("shell");
        assert!(!limiter.is_rate_limited("shell"));
        limiter.track_denial("shell");
        assert!(!limiter.is_rate_limited("shell"));
    }

    #[test]
    fn third_denial_backs_off_five_seconds() {
        let mut limiter = RateLimiter::new();
        limiter.track_denial("shell");
        limiter.track_denial("shell");
        limiter.track_denial("shell");
        assert!(limiter.is_rate_limited("shell"));
        let remaining = limiter.remaining("shell");
        assert!(remaining <= Duration::from_secs(5));
        assert!(remaining > Duration::from_secs(4));
    }

    #[test]
    fn sixth_and_later_denials_cap_at_three_hundred_seconds() {
        let mut limiter = RateLimiter::new();
        for _ in 0..8 {
            limiter.track_denial("shell");
        }
        let remaining = limiter.remaining("shell");
        assert!(remaining <= Duration::from_secs(300));
        assert!(remaining > Duration::from_secs(299));
    }

    #[test]
    fn reset_clears_tracker() {
        let mut limiter = RateLimiter::new();
        limiter.track_denial("shell");
        limiter.track_denial("shell");
        limiter.track_denial("shell");
        limiter.reset("shell");
        assert!(!limiter.is_rate_limited("shell"));
    }

    #[test]
    fn independent_tools_have_independent_trackers() {
        let mut limiter = RateLimiter::new();
        limiter.track_denial("shell");
        limiter.track_denial("shell");
        limiter.track_denial("shell");
        assert!(!limiter.is_rate_limited("web_fetch"));
    }
}
