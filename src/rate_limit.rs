//! Per-(user, slot) cooldown between wire operations, so a single connection
//! can't spam `place_bet`/`cashout` faster than the configured cooldown
//! allows on any one slot. A bet on another slot is unaffected: dual-curve
//! mode lets a user act on both curves independently. The timestamp updates
//! on every attempt, successful or rejected, matching the teacher's own rate
//! limiting convention in the sibling backends.

use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    last_attempt: DashMap<(String, u8), Instant>,
    cooldown: Duration,
}

impl RateLimiter {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            last_attempt: DashMap::new(),
            cooldown: Duration::from_millis(cooldown_ms),
        }
    }

    /// Returns true (and records `now`) if the user is outside their
    /// cooldown window for this slot; false if they're still inside it.
    pub fn check_and_record(&self, user_id: &str, slot: u8) -> bool {
        let now = Instant::now();
        let mut entry = self.last_attempt.entry((user_id.to_string(), slot)).or_insert(now - self.cooldown);
        let allowed = now.duration_since(*entry) >= self.cooldown;
        *entry = now;
        allowed
    }
}
