// In-memory failed login tracking

use super::rate_limit::{AttemptPolicy, LoginAttemptTracker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::storage::StorageError;

/// Keys tracked before expired entries are swept
pub const DEFAULT_MAX_TRACKED_KEYS: usize = 100_000;

/// Failed attempt tracking
#[derive(Debug, Clone)]
struct FailedAttempts {
    /// Number of failed attempts in the current window
    count: u32,
    /// When the current window started
    first_attempt: DateTime<Utc>,
    /// When the lock ends, once the key is locked
    locked_until: Option<DateTime<Utc>>,
    /// After this instant the entry carries no information
    expires_at: DateTime<Utc>,
}

/// In-memory tracker
pub struct MemoryLoginAttemptTracker {
    attempts: Arc<RwLock<HashMap<String, FailedAttempts>>>,
    max_tracked_keys: usize,
}

impl Default for MemoryLoginAttemptTracker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_TRACKED_KEYS)
    }
}

impl MemoryLoginAttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_tracked_keys: usize) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    pub async fn tracked_keys(&self) -> usize {
        self.attempts.read().await.len()
    }

    fn make_room(&self, attempts: &mut HashMap<String, FailedAttempts>, now: DateTime<Utc>) {
        attempts.retain(|_, entry| entry.expires_at > now);

        // still full: evict whatever would expire first
        while attempts.len() >= self.max_tracked_keys {
            let Some(oldest) = attempts
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            attempts.remove(&oldest);
        }
    }
}

#[async_trait]
impl LoginAttemptTracker for MemoryLoginAttemptTracker {
    async fn locked_until(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let mut attempts = self.attempts.write().await;

        if let Some(locked_until) = attempts.get(key).and_then(|entry| entry.locked_until) {
            if now < locked_until {
                return Ok(Some(locked_until));
            }
            // Unblock and reset
            attempts.remove(key);
        }

        Ok(None)
    }

    async fn record_failed_attempt(
        &self,
        key: &str,
        policy: &AttemptPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let mut attempts = self.attempts.write().await;

        if !attempts.contains_key(key) && attempts.len() >= self.max_tracked_keys {
            self.make_room(&mut attempts, now);
        }

        let entry = attempts.entry(key.to_string()).or_insert(FailedAttempts {
            count: 0,
            first_attempt: now,
            locked_until: None,
            expires_at: now + policy.window,
        });

        let locked = entry.locked_until.is_some_and(|until| now < until);

        // Start a new window once the previous one has passed
        if !locked && now - entry.first_attempt > policy.window {
            entry.count = 0;
            entry.first_attempt = now;
            entry.locked_until = None;
            entry.expires_at = now + policy.window;
        }

        entry.count += 1;

        if !locked && entry.count >= policy.max_failed_attempts {
            let until = now + policy.lockout;
            entry.locked_until = Some(until);
            entry.expires_at = entry.expires_at.max(until);
            debug!("Locking {} after {} failed attempts", key, entry.count);
        }

        Ok(entry.locked_until.filter(|until| now < *until))
    }

    async fn reset(&self, key: &str) -> Result<(), StorageError> {
        let mut attempts = self.attempts.write().await;
        attempts.remove(key);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy(max_failed_attempts: u32) -> AttemptPolicy {
        AttemptPolicy {
            max_failed_attempts,
            window: Duration::minutes(15),
            lockout: Duration::minutes(15),
        }
    }

    #[tokio::test]
    async fn test_failed_attempts_lock_after_threshold() {
        let tracker = MemoryLoginAttemptTracker::new();
        let now = Utc::now();

        for _ in 0..2 {
            let locked = tracker.record_failed_attempt("key", &policy(3), now).await.unwrap();
            assert_eq!(locked, None);
        }
        let locked = tracker.record_failed_attempt("key", &policy(3), now).await.unwrap();
        assert_eq!(locked, Some(now + Duration::minutes(15)));
        assert_eq!(
            tracker.locked_until("key", now).await.unwrap(),
            Some(now + Duration::minutes(15))
        );
    }

    #[tokio::test]
    async fn test_window_restarts_after_it_passes() {
        let tracker = MemoryLoginAttemptTracker::new();
        let start = Utc::now();

        for _ in 0..2 {
            tracker.record_failed_attempt("key", &policy(3), start).await.unwrap();
        }

        let later = start + Duration::minutes(16);
        let locked = tracker.record_failed_attempt("key", &policy(3), later).await.unwrap();
        assert_eq!(locked, None);
        assert_eq!(tracker.locked_until("key", later).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failures_while_locked_do_not_extend_the_lock() {
        let tracker = MemoryLoginAttemptTracker::new();
        let now = Utc::now();

        for _ in 0..3 {
            tracker.record_failed_attempt("key", &policy(3), now).await.unwrap();
        }
        let later = now + Duration::minutes(5);
        let locked = tracker.record_failed_attempt("key", &policy(3), later).await.unwrap();
        assert_eq!(locked, Some(now + Duration::minutes(15)));
    }

    #[tokio::test]
    async fn test_tracked_keys_stay_bounded() {
        let tracker = MemoryLoginAttemptTracker::with_capacity(10);
        let now = Utc::now();

        for n in 0..50 {
            tracker
                .record_failed_attempt(&format!("account:{}", n), &policy(5), now)
                .await
                .unwrap();
        }
        assert!(tracker.tracked_keys().await <= 10);

        // expired entries are the first to go
        let later = now + Duration::minutes(20);
        tracker.record_failed_attempt("fresh", &policy(5), later).await.unwrap();
        assert_eq!(tracker.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_reset_clears_failures() {
        let tracker = MemoryLoginAttemptTracker::new();
        let now = Utc::now();

        for _ in 0..3 {
            tracker.record_failed_attempt("key", &policy(3), now).await.unwrap();
        }
        tracker.reset("key").await.unwrap();
        assert_eq!(tracker.locked_until("key", now).await.unwrap(), None);
    }
}
