// In-memory collaborator backends
// Uses HashMap with Mutex for thread-safe access

use super::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory user directory, seeded from configuration
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    /// Insert or replace a user, returning the previous record.
    pub fn upsert(&self, user: User) -> Result<Option<User>, StorageError> {
        let mut users = self
            .users
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))?;

        Ok(users.insert(user.id, user))
    }

    pub fn remove(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let mut users = self
            .users
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))?;

        Ok(users.remove(&id))
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let users = self
            .users
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))?;

        Ok(users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let users = self
            .users
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))?;

        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

/// In-memory subscription store, keyed by church
#[derive(Clone, Default)]
pub struct MemorySubscriptionStore {
    subscriptions: Arc<Mutex<HashMap<TenantId, Subscription>>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let subscriptions = subscriptions
            .into_iter()
            .map(|s| (s.church_id, s))
            .collect();
        Self {
            subscriptions: Arc::new(Mutex::new(subscriptions)),
        }
    }

    pub fn upsert(&self, subscription: Subscription) -> Result<(), StorageError> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))?;

        subscriptions.insert(subscription.church_id, subscription);
        Ok(())
    }

    pub fn remove(&self, tenant_id: TenantId) -> Result<Option<Subscription>, StorageError> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))?;

        Ok(subscriptions.remove(&tenant_id))
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn find_by_tenant_id(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Subscription>, StorageError> {
        let subscriptions = self
            .subscriptions
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))?;

        Ok(subscriptions.get(&tenant_id).cloned())
    }
}
