// Request-scoped tenant context.
//
// A fresh [`TenantContext`] is created for every request by the tenant
// validation stage. Writing to it is only possible through a
// [`TenantScope`], whose `Drop` clears the slot again, so the context is
// torn down on every exit path: normal return, error response, panic
// unwind and cancellation of the request future.

use async_trait::async_trait;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde_json::{Value, json};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{error, trace};

use crate::models::{TenantId, UserId, UserRole};

/// The verified tenant of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTenant {
    /// `None` only for platform roles.
    pub tenant_id: Option<TenantId>,
    pub user_id: UserId,
    pub role: UserRole,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TenantContextError {
    #[error("no tenant context established for this request")]
    NotEstablished,

    #[error("request is not scoped to a tenant")]
    NoTenant,
}

/// Handle to one request's tenant slot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    slot: Arc<RwLock<Option<ActiveTenant>>>,
}

impl TenantContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ActiveTenant> {
        self.slot.read().ok().and_then(|guard| guard.clone())
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.current().and_then(|active| active.tenant_id)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.current().map(|active| active.user_id)
    }

    pub fn role(&self) -> Option<UserRole> {
        self.current().map(|active| active.role)
    }

    /// Tenant id for scoping repository queries.
    pub fn require_tenant(&self) -> Result<TenantId, TenantContextError> {
        let active = self.current().ok_or(TenantContextError::NotEstablished)?;
        active.tenant_id.ok_or(TenantContextError::NoTenant)
    }

    pub fn is_superadmin(&self) -> bool {
        self.role().is_some_and(|role| role.is_platform_role())
    }

    pub fn is_established(&self) -> bool {
        self.current().is_some()
    }

    /// Clear the slot. Safe to call any number of times.
    pub fn end(&self) {
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            trace!("Tenant context cleared");
        }
    }

    /// Open the scope that owns this context's lifetime.
    pub fn open_scope(&self) -> TenantScope {
        TenantScope {
            context: self.clone(),
        }
    }
}

/// Guard that may publish a tenant and always clears it on drop.
#[derive(Debug)]
pub struct TenantScope {
    context: TenantContext,
}

impl TenantScope {
    pub fn begin(&self, tenant_id: Option<TenantId>, user_id: UserId, role: UserRole) {
        let mut guard = self
            .context
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(ActiveTenant {
            tenant_id,
            user_id,
            role,
        });
    }

    pub fn context(&self) -> &TenantContext {
        &self.context
    }
}

impl Drop for TenantScope {
    fn drop(&mut self) {
        self.context.end();
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<TenantContext>().cloned().ok_or_else(|| {
            error!(path = %parts.uri.path(), "Tenant context requested outside the tenancy pipeline");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_scope_publishes_and_clears() {
        let context = TenantContext::new();
        assert_eq!(context.current(), None);

        {
            let scope = context.open_scope();
            scope.begin(Some(5), 42, UserRole::Pastor);
            assert_eq!(context.tenant_id(), Some(5));
            assert_eq!(context.user_id(), Some(42));
            assert_eq!(context.require_tenant(), Ok(5));
            assert!(!context.is_superadmin());
        }

        assert_eq!(context.current(), None);
        assert_eq!(
            context.require_tenant(),
            Err(TenantContextError::NotEstablished)
        );
    }

    #[test]
    fn test_end_is_idempotent() {
        let context = TenantContext::new();
        let scope = context.open_scope();
        scope.begin(Some(1), 1, UserRole::Member);

        context.end();
        context.end();
        drop(scope);

        assert!(!context.is_established());
    }

    #[test]
    fn test_superadmin_has_no_tenant() {
        let context = TenantContext::new();
        let scope = context.open_scope();
        scope.begin(None, 1, UserRole::Superadmin);

        assert!(context.is_superadmin());
        assert_eq!(context.tenant_id(), None);
        assert_eq!(context.require_tenant(), Err(TenantContextError::NoTenant));
    }

    #[test]
    fn test_scope_clears_on_panic() {
        let context = TenantContext::new();
        let inner = context.clone();

        let result = std::panic::catch_unwind(move || {
            let scope = inner.open_scope();
            scope.begin(Some(9), 3, UserRole::Admin);
            panic!("handler blew up");
        });

        assert!(result.is_err());
        assert_eq!(context.current(), None);
    }

    #[test]
    fn test_distinct_contexts_do_not_share() {
        let a = TenantContext::new();
        let b = TenantContext::new();
        let scope_a = a.open_scope();
        let scope_b = b.open_scope();
        scope_a.begin(Some(1), 10, UserRole::Admin);
        scope_b.begin(Some(2), 20, UserRole::Member);

        assert_eq!(a.tenant_id(), Some(1));
        assert_eq!(b.tenant_id(), Some(2));

        drop(scope_a);
        assert_eq!(a.tenant_id(), None);
        assert_eq!(b.tenant_id(), Some(2));
    }

    #[tokio::test]
    async fn test_extractor_fails_closed_without_pipeline() {
        let (mut parts, _) = Request::new(()).into_parts();
        let (status, _) = TenantContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
