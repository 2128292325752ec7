// Brute-force protection for the login endpoint
// Failed attempts are counted per account and per client address

use async_trait::async_trait;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::rate_limit_memory::MemoryLoginAttemptTracker;
use crate::models::LoginProtectionConfig;
use crate::storage::StorageError;

/// How many failures a key may collect within a window before it is locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    pub max_failed_attempts: u32,
    pub window: Duration,
    pub lockout: Duration,
}

/// Failed attempt tracking for different backend implementations
#[async_trait]
pub trait LoginAttemptTracker: Send + Sync {
    /// End of the current lock for `key`, if it is locked at `now`
    async fn locked_until(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Record a failed attempt. Returns the lock end once the key is locked.
    async fn record_failed_attempt(
        &self,
        key: &str,
        policy: &AttemptPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Forget every failure recorded for a key
    async fn reset(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    Account,
    Client,
}

/// A login refused before any credential check ran.
///
/// The client sees the same body whichever scope is locked, so a lock does
/// not reveal whether the account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginBlocked {
    pub scope: LockScope,
    pub retry_after_secs: i64,
}

impl IntoResponse for LoginBlocked {
    fn into_response(self) -> Response {
        let retry_after = self.retry_after_secs.max(1);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many failed login attempts. Please try again later.",
                "retry_after": retry_after,
            })),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        response
    }
}

/// Lockout policy applied by the login handler
#[derive(Clone)]
pub struct LoginGuard {
    tracker: Arc<dyn LoginAttemptTracker>,
    account: AttemptPolicy,
    client: AttemptPolicy,
}

impl LoginGuard {
    pub fn new(tracker: Arc<dyn LoginAttemptTracker>, config: &LoginProtectionConfig) -> Self {
        let window = Duration::seconds(config.window_secs);
        let lockout = Duration::seconds(config.lockout_secs);

        Self {
            tracker,
            account: AttemptPolicy {
                max_failed_attempts: config.max_failed_attempts_per_account,
                window,
                lockout,
            },
            client: AttemptPolicy {
                max_failed_attempts: config.max_failed_attempts_per_ip,
                window,
                lockout,
            },
        }
    }

    pub fn in_memory(config: &LoginProtectionConfig) -> Self {
        Self::new(Arc::new(MemoryLoginAttemptTracker::new()), config)
    }

    fn account_key(email: &str) -> String {
        format!("account:{}", email.trim().to_ascii_lowercase())
    }

    fn client_key(ip: &str) -> String {
        format!("ip:{}", ip)
    }

    /// Refuse the attempt when the client address or the account is locked.
    ///
    /// Keys are tracked whether or not the account exists.
    pub async fn check(
        &self,
        email: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<LoginBlocked>, StorageError> {
        for (scope, key) in [
            (LockScope::Client, Self::client_key(ip)),
            (LockScope::Account, Self::account_key(email)),
        ] {
            if let Some(until) = self.tracker.locked_until(&key, now).await? {
                return Ok(Some(LoginBlocked {
                    scope,
                    retry_after_secs: (until - now).num_seconds(),
                }));
            }
        }

        Ok(None)
    }

    pub async fn record_failure(
        &self,
        email: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let account = Self::account_key(email);
        if let Some(until) = self
            .tracker
            .record_failed_attempt(&account, &self.account, now)
            .await?
        {
            warn!(%until, "Account locked after repeated failed logins");
        }

        let client = Self::client_key(ip);
        if let Some(until) = self
            .tracker
            .record_failed_attempt(&client, &self.client, now)
            .await?
        {
            warn!(ip = %ip, %until, "Client address blocked after repeated failed logins");
        }

        Ok(())
    }

    /// Clear the account's failures. The client address keeps its count.
    pub async fn record_success(&self, email: &str) -> Result<(), StorageError> {
        debug!("Resetting failed login attempts for account");
        self.tracker.reset(&Self::account_key(email)).await
    }
}
