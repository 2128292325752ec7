// Audit log storage backends

use super::types::{AuditEntry, AuditQuery};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::AuditConfig;

/// Trait for audit log storage backends
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit entry
    async fn store(&self, entry: AuditEntry) -> Result<(), String>;

    /// Query audit entries, most recent first
    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, String>;

    /// Delete audit entries older than the specified timestamp
    /// Used for data retention policies
    async fn cleanup_old_entries(&self, before: DateTime<Utc>) -> Result<usize, String>;
}

/// In-memory audit storage implementation
/// Suitable for development and testing
///
/// Bounded: entries older than the retention window are dropped on write,
/// and beyond `max_entries` the oldest entries go first.
pub struct MemoryAuditStorage {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
    max_entries: usize,
    retention: Duration,
}

impl Default for MemoryAuditStorage {
    fn default() -> Self {
        Self::from_config(&AuditConfig::default())
    }
}

impl MemoryAuditStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(max_entries: usize, retention: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            max_entries: max_entries.max(1),
            retention,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::with_retention(config.max_entries, Duration::days(config.retention_days))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn remove_before(entries: &mut Vec<AuditEntry>, before: DateTime<Utc>) -> usize {
    let original_count = entries.len();
    entries.retain(|entry| entry.timestamp >= before);
    original_count - entries.len()
}

#[async_trait]
impl AuditStorage for MemoryAuditStorage {
    async fn store(&self, entry: AuditEntry) -> Result<(), String> {
        let mut entries = self.entries.write().await;
        debug!("Storing audit entry: {:?}", entry.action);
        entries.push(entry);

        let cutoff = Utc::now() - self.retention;
        if entries.first().is_some_and(|oldest| oldest.timestamp < cutoff) {
            remove_before(&mut entries, cutoff);
        }

        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }

        Ok(())
    }

    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, String> {
        let entries = self.entries.read().await;

        let mut results: Vec<AuditEntry> = entries
            .iter()
            .filter(|entry| {
                if let Some(tenant_id) = query.tenant_id
                    && entry.tenant_id != Some(tenant_id)
                {
                    return false;
                }

                if let Some(user_id) = query.user_id
                    && entry.user_id != Some(user_id)
                {
                    return false;
                }

                if let Some(action) = query.action
                    && entry.action != action
                {
                    return false;
                }

                if let Some(success) = query.success
                    && entry.success != success
                {
                    return false;
                }

                if let Some(min_level) = query.min_level
                    && entry.level < min_level
                {
                    return false;
                }

                true
            })
            .cloned()
            .collect();

        // Sort by timestamp (most recent first)
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        results.truncate(query.limit.unwrap_or(100));

        Ok(results)
    }

    async fn cleanup_old_entries(&self, before: DateTime<Utc>) -> Result<usize, String> {
        let mut entries = self.entries.write().await;
        let removed = remove_before(&mut entries, before);
        debug!("Cleaned up {} old audit entries", removed);

        Ok(removed)
    }
}
