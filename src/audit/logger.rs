// Audit logger implementation

use super::storage::AuditStorage;
use super::types::{AuditAction, AuditEntry, AuditLevel, ResourceType};
use axum::http::HeaderMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::models::{TenantId, UserId};

/// Details of a rejected tenant cross-check, kept server-side only.
#[derive(Debug, Clone)]
pub struct TenantViolationEvent<'a> {
    pub reason: &'a str,
    pub user_id: UserId,
    pub claimed_tenant_id: Option<TenantId>,
    pub actual_tenant_id: Option<TenantId>,
    pub ip_address: &'a str,
    pub path: &'a str,
}

/// Audit logger for recording security and compliance events
#[derive(Clone)]
pub struct AuditLogger {
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Create a new audit logger with the specified storage backend
    pub fn new(storage: Arc<dyn AuditStorage>) -> Self {
        Self { storage }
    }

    /// Log an audit event
    pub async fn log(&self, entry: AuditEntry) {
        info!(
            action = entry.action.as_str(),
            tenant_id = ?entry.tenant_id,
            user_id = ?entry.user_id,
            success = entry.success,
            "Audit event"
        );

        if let Err(e) = self.storage.store(entry).await {
            error!("Failed to store audit entry: {}", e);
        }
    }

    /// Log a successful authentication event
    pub async fn log_login(
        &self,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        ip_address: &str,
        user_agent: Option<&str>,
    ) {
        let entry = AuditEntry::builder(AuditAction::Login)
            .tenant_id(tenant_id)
            .user_id(Some(user_id))
            .ip_address(ip_address)
            .user_agent(user_agent.unwrap_or("unknown"))
            .resource_type(ResourceType::User)
            .level(AuditLevel::Info)
            .success(true)
            .build();

        self.log(entry).await;
    }

    /// Log a failed authentication event
    pub async fn log_login_failed(
        &self,
        email: &str,
        ip_address: &str,
        user_agent: Option<&str>,
        reason: &str,
    ) {
        let entry = AuditEntry::builder(AuditAction::LoginFailed)
            .ip_address(ip_address)
            .user_agent(user_agent.unwrap_or("unknown"))
            .resource_type(ResourceType::User)
            .resource_id(email)
            .level(AuditLevel::Security)
            .error(reason)
            .build();

        self.log(entry).await;
    }

    pub async fn log_logout(&self, tenant_id: Option<TenantId>, user_id: UserId, ip_address: &str) {
        let entry = AuditEntry::builder(AuditAction::Logout)
            .tenant_id(tenant_id)
            .user_id(Some(user_id))
            .ip_address(ip_address)
            .resource_type(ResourceType::User)
            .level(AuditLevel::Info)
            .success(true)
            .build();

        self.log(entry).await;
    }

    pub async fn log_token_refreshed(
        &self,
        tenant_id: Option<TenantId>,
        user_id: UserId,
        ip_address: &str,
    ) {
        let entry = AuditEntry::builder(AuditAction::TokenRefreshed)
            .tenant_id(tenant_id)
            .user_id(Some(user_id))
            .ip_address(ip_address)
            .resource_type(ResourceType::Token)
            .level(AuditLevel::Info)
            .success(true)
            .build();

        self.log(entry).await;
    }

    /// Record a cross-tenant access attempt with full detail.
    pub async fn log_tenant_violation(&self, event: TenantViolationEvent<'_>) {
        let mut builder = AuditEntry::builder(AuditAction::TenantViolation)
            .tenant_id(event.actual_tenant_id)
            .user_id(Some(event.user_id))
            .ip_address(event.ip_address)
            .path(event.path)
            .resource_type(ResourceType::Tenant)
            .level(AuditLevel::Security)
            .error(event.reason);

        if let Some(claimed) = event.claimed_tenant_id {
            builder = builder.metadata("claimed_tenant_id", claimed.to_string());
        }
        if let Some(actual) = event.actual_tenant_id {
            builder = builder.metadata("actual_tenant_id", actual.to_string());
        }

        self.log(builder.build()).await;
    }

    pub async fn log_subscription_blocked(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
        ip_address: &str,
        path: &str,
        status: &str,
    ) {
        let entry = AuditEntry::builder(AuditAction::SubscriptionBlocked)
            .tenant_id(Some(tenant_id))
            .user_id(user_id)
            .ip_address(ip_address)
            .path(path)
            .resource_type(ResourceType::Subscription)
            .resource_id(tenant_id.to_string())
            .level(AuditLevel::Warning)
            .success(false)
            .metadata("status", status)
            .build();

        self.log(entry).await;
    }

    /// Client address: forwarding headers first, then the socket peer.
    pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|h| h.to_str().ok())
                    .map(|s| s.to_string())
            })
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Extract user agent from request headers
    pub fn user_agent(headers: &HeaderMap) -> Option<&str> {
        headers.get("user-agent").and_then(|h| h.to_str().ok())
    }
}
