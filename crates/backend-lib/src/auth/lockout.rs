// ============================
// crates/backend-lib/src/auth/lockout.rs
// ============================
//! Account lockout after repeated failed logins.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::LockoutSettings;

/// Entry in the lockout map
#[derive(Debug, Clone)]
struct LockoutEntry {
    /// Number of failed attempts
    failed_attempts: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the lockout expires, if locked
    lockout_expiry: Option<Instant>,
}

/// Failed-login tracker keyed by normalized account name
#[derive(Debug, Clone)]
pub struct LockoutTracker {
    attempts: Arc<DashMap<String, LockoutEntry>>,
    /// Maximum number of failed attempts before lockout
    max_attempts: u32,
    /// Duration of lockout period
    lockout_duration: Duration,
}

impl LockoutTracker {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &LockoutSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    /// Record a failed attempt. Returns `true` when the account is now locked.
    pub fn record_failed_attempt(&self, account: &str) -> bool {
        let now = Instant::now();

        let mut entry = self
            .attempts
            .entry(account.to_string())
            .or_insert_with(|| LockoutEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // An expired lockout starts a fresh count
        if let Some(expiry) = entry.lockout_expiry {
            if now >= expiry {
                entry.failed_attempts = 0;
                entry.lockout_expiry = None;
            }
        }

        // Failures only accumulate within the lockout window
        if entry.lockout_expiry.is_none()
            && now.duration_since(entry.last_failure) > self.lockout_duration
        {
            entry.failed_attempts = 0;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            tracing::warn!(
                account,
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "account locked out"
            );
            return true;
        }

        false
    }

    /// Record a successful login, clearing any history
    pub fn record_success(&self, account: &str) {
        self.attempts.remove(account);
    }

    /// Whether the account is currently locked
    pub fn is_locked_out(&self, account: &str) -> bool {
        self.attempts
            .get(account)
            .and_then(|entry| entry.lockout_expiry)
            .is_some_and(|expiry| Instant::now() < expiry)
    }

    /// Failed attempts counted so far
    pub fn failed_attempts(&self, account: &str) -> u32 {
        self.attempts
            .get(account)
            .map_or(0, |entry| entry.failed_attempts)
    }

    /// Clean up expired lockouts and stale counters
    pub fn cleanup(&self) {
        let now = Instant::now();

        self.attempts.retain(|_, entry| {
            if let Some(expiry) = entry.lockout_expiry {
                return now < expiry;
            }

            // Otherwise, keep entries for a day
            now.duration_since(entry.last_failure) < Duration::from_secs(24 * 60 * 60)
        });
    }

    /// Spawn the periodic cleanup task. Must be called inside a Tokio runtime.
    pub fn spawn_cleanup_task(&self, interval: Duration) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                tracker.cleanup();
            }
        })
    }
}
