use std::collections::VecDeque;

const WINDOW_MS: i64 = 60_000;

/// Sliding-window admission control over outbound broadcasts. One timestamp
/// is recorded per broadcast pass, not per recipient.
pub struct RateLimiter {
    max_per_minute: usize,
    window: VecDeque<i64>,
}

impl RateLimiter {
    pub fn new(max_per_minute: usize) -> Self {
        Self { max_per_minute, window: VecDeque::new() }
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn prune(&mut self, now_ms: i64) {
        while let Some(&ts) = self.window.front() {
            if now_ms - ts >= WINDOW_MS {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Prune then check. Pruning happens even when admission is denied.
    pub fn admit_at(&mut self, now_ms: i64) -> bool {
        self.prune(now_ms);
        self.window.len() < self.max_per_minute
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(Self::now_ms())
    }

    pub fn record_at(&mut self, now_ms: i64) {
        self.window.push_back(now_ms);
    }

    pub fn record(&mut self) {
        self.record_at(Self::now_ms());
    }

    #[cfg(test)]
    fn window_len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_after_max_within_window() {
        let mut limiter = RateLimiter::new(3);
        let t0 = 1_000_000;
        for i in 0..3 {
            assert!(limiter.admit_at(t0 + i));
            limiter.record_at(t0 + i);
        }
        // Fourth request inside the same minute is denied.
        assert!(!limiter.admit_at(t0 + 1_000));
    }

    #[test]
    fn admission_reopens_when_earliest_entry_ages_out() {
        let mut limiter = RateLimiter::new(2);
        let t0 = 0;
        limiter.record_at(t0);
        limiter.record_at(t0 + 10_000);
        assert!(!limiter.admit_at(t0 + 59_999));
        // 60s after the earliest entry, one slot frees up.
        assert!(limiter.admit_at(t0 + 60_000));
    }

    #[test]
    fn prune_happens_even_on_denied_checks() {
        let mut limiter = RateLimiter::new(1);
        limiter.record_at(0);
        limiter.record_at(1);
        assert!(!limiter.admit_at(30_000));
        // Both entries expired; the denied check above still pruned nothing
        // (entries were in-window), this one drops them.
        assert!(limiter.admit_at(61_000));
        assert_eq!(limiter.window_len(), 0);
    }
}
