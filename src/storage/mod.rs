// Collaborator interfaces for the system of record.
// The pipeline only reads through these traits; persistence lives elsewhere.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Subscription, TenantId, User, UserId};

pub use memory::{MemorySubscriptionStore, MemoryUserDirectory};

/// Storage errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// User lookups against the system of record.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StorageError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;
}

/// Read access to tenant billing state.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_by_tenant_id(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Subscription>, StorageError>;
}
